//! Concrete scenarios from the wire-format and schema-evolution spec,
//! exercised end to end through the public API.

use avrokit::codec::{fixed, int, long, record, string, Codec};
use avrokit::io::Sink;
use avrokit::ocf::{ContainerReader, ContainerWriterBuilder};
use avrokit::resolve::decode::decode_with_schemas;
use avrokit::resolve::ReadPlan;
use avrokit::schema::{Default as SchemaDefault, Enum, Name, Node, SchemaBuilder, Type};
use avrokit::value::Value;

#[test]
fn string_round_trip_matches_known_bytes() {
	let codec = string();
	let bytes = codec.encode_to_vec(&"Alice".to_owned()).unwrap();
	assert_eq!(bytes, vec![0x0A, 0x41, 0x6C, 0x69, 0x63, 0x65]);
	assert_eq!(codec.decode_from_slice(&bytes).unwrap(), "Alice");
}

#[test]
fn zig_zag_int_samples() {
	let codec = int();
	let cases: &[(i32, &[u8])] = &[
		(0, &[0x00]),
		(-1, &[0x01]),
		(1, &[0x02]),
		(-2, &[0x03]),
		(2, &[0x04]),
		(-64, &[0x7F]),
		(64, &[0x80, 0x01]),
	];
	for (value, expected) in cases {
		let bytes = codec.encode_to_vec(value).unwrap();
		assert_eq!(&bytes, expected, "value {value}");
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), *value);
	}
}

#[test]
fn optional_field_evolution_applies_reader_default() {
	let writer = record::<String, _>("Person", |name| name)
		.field("name", string(), |n: &String| n.clone())
		.finish();

	let mut reader_arena = SchemaBuilder::new();
	let name_key = reader_arena.push(Node::new(Type::String));
	let age_key = reader_arena.push(Node::new(Type::Int));
	reader_arena.push(Node::new(Type::Record(avrokit::schema::Record {
		name: Name::from_fully_qualified_name("Person"),
		fields: vec![
			avrokit::schema::Field {
				name: "name".into(),
				schema: name_key,
				doc: None,
				default: None,
				aliases: vec![],
			},
			avrokit::schema::Field {
				name: "age".into(),
				schema: age_key,
				doc: None,
				default: Some(SchemaDefault::Int(0)),
				aliases: vec![],
			},
		],
		doc: None,
		aliases: vec![],
	})));
	let reader_schema = reader_arena.build().unwrap();

	let bytes = writer.encode_to_vec(&"Alice".to_owned()).unwrap();
	let value = decode_with_schemas(&reader_schema, writer.schema(), &bytes).unwrap();
	assert_eq!(
		value,
		Value::Record(vec![
			("name".into(), Value::String("Alice".into())),
			("age".into(), Value::Int(0)),
		])
	);
}

#[test]
fn int_promotes_to_long_under_a_union_reader() {
	let writer_codec = int();

	let mut reader_arena = SchemaBuilder::new();
	let null_key = reader_arena.push(Node::new(Type::Null));
	let long_key = reader_arena.push(Node::new(Type::Long));
	reader_arena.push(Node::new(Type::Union(avrokit::schema::Union {
		branches: vec![null_key, long_key],
	})));
	let reader_schema = reader_arena.build().unwrap();

	let bytes = writer_codec.encode_to_vec(&42).unwrap();
	let value = decode_with_schemas(&reader_schema, writer_codec.schema(), &bytes).unwrap();
	assert_eq!(value, Value::Union(1, Box::new(Value::Long(42))));
}

#[test]
fn enum_reorder_resolves_writer_index_to_reader_index() {
	let mut writer_arena = SchemaBuilder::new();
	writer_arena.push(Node::new(Type::Enum(Enum {
		name: Name::from_fully_qualified_name("Color"),
		symbols: vec!["GREEN".into(), "BLUE".into(), "RED".into()],
		default_symbol: None,
		doc: None,
		aliases: vec![],
	})));
	let writer_schema = writer_arena.build().unwrap();

	let mut reader_arena = SchemaBuilder::new();
	reader_arena.push(Node::new(Type::Enum(Enum {
		name: Name::from_fully_qualified_name("Color"),
		symbols: vec!["RED".into(), "GREEN".into(), "BLUE".into()],
		default_symbol: None,
		doc: None,
		aliases: vec![],
	})));
	let reader_schema = reader_arena.build().unwrap();

	let plan = avrokit::resolve::resolve(&reader_schema, &writer_schema).unwrap();
	match &plan {
		ReadPlan::Enum(enum_plan) => assert_eq!(enum_plan.symbol_map, vec![1, 2, 0]),
		other => panic!("expected an enum plan, got {other:?}"),
	}

	let mut sink = Sink::new();
	sink.write_long(0); // writer index 0 == GREEN
	let value = decode_with_schemas(&reader_schema, &writer_schema, sink.as_slice()).unwrap();
	assert_eq!(value, Value::Enum(1, "GREEN".into()));
}

#[test]
fn missing_field_enum_default_resolves_to_the_readers_own_symbol_index() {
	let writer = record::<String, _>("Shirt", |size| size)
		.field("size", string(), |s: &String| s.clone())
		.finish();

	let mut reader_arena = SchemaBuilder::new();
	let size_key = reader_arena.push(Node::new(Type::String));
	let color_key = reader_arena.push(Node::new(Type::Enum(Enum {
		name: Name::from_fully_qualified_name("Color"),
		symbols: vec!["RED".into(), "GREEN".into(), "BLUE".into()],
		default_symbol: None,
		doc: None,
		aliases: vec![],
	})));
	reader_arena.push(Node::new(Type::Record(avrokit::schema::Record {
		name: Name::from_fully_qualified_name("Shirt"),
		fields: vec![
			avrokit::schema::Field {
				name: "size".into(),
				schema: size_key,
				doc: None,
				default: None,
				aliases: vec![],
			},
			avrokit::schema::Field {
				name: "color".into(),
				schema: color_key,
				doc: None,
				default: Some(SchemaDefault::Enum("BLUE".into())),
				aliases: vec![],
			},
		],
		doc: None,
		aliases: vec![],
	})));
	let reader_schema = reader_arena.build().unwrap();

	let bytes = writer.encode_to_vec(&"M".to_owned()).unwrap();
	let value = decode_with_schemas(&reader_schema, writer.schema(), &bytes).unwrap();
	assert_eq!(
		value,
		Value::Record(vec![
			("size".into(), Value::String("M".into())),
			("color".into(), Value::Enum(2, "BLUE".into())),
		])
	);
}

#[derive(Debug, Clone, PartialEq)]
struct Event {
	id: i64,
	tag: Vec<u8>,
}

fn event_codec() -> Codec<Event> {
	record::<Event, _>("Event", |id| move |tag| Event { id, tag })
		.field("id", long(), |e: &Event| e.id)
		.field("tag", fixed(Name::from_fully_qualified_name("Tag"), 4), |e: &Event| e.tag.clone())
		.finish()
}

#[test]
fn ocf_sync_mismatch_is_reported_and_does_not_hang() {
	let mut writer = ContainerWriterBuilder::new(event_codec())
		.sync_interval(100)
		.build(Vec::new())
		.unwrap();
	writer.write(Event { id: 1, tag: vec![1, 2, 3, 4] }).unwrap();
	let mut bytes = writer.close().unwrap();

	let last = bytes.len() - 1;
	bytes[last] ^= 0xFF;

	let mut reader = ContainerReader::from_bytes(bytes, event_codec()).unwrap();
	let result = reader.read_block();
	assert!(matches!(result, Err(avrokit::ocf::ContainerError::SyncMismatch)));
}

#[test]
fn ocf_round_trips_many_records_across_blocks() {
	let events: Vec<Event> = (0..50)
		.map(|i| Event {
			id: i,
			tag: vec![i as u8, 0, 0, 1],
		})
		.collect();

	let mut writer = ContainerWriterBuilder::new(event_codec())
		.sync_interval(7)
		.build(Vec::new())
		.unwrap();
	for event in &events {
		writer.write(event.clone()).unwrap();
	}
	let bytes = writer.close().unwrap();

	let reader = ContainerReader::from_bytes(bytes, event_codec()).unwrap();
	let read_back: Vec<Event> = reader.to_sequence().map(Result::unwrap).collect();
	assert_eq!(read_back, events);
}

#[test]
fn option_round_trips_through_record_field() {
	#[derive(Debug, Clone, PartialEq)]
	struct Note {
		body: String,
		parent: Option<i64>,
	}

	let codec = record::<Note, _>("Note", |body| move |parent| Note { body, parent })
		.field("body", string(), |n: &Note| n.body.clone())
		.field_opt("parent", long(), |n: &Note| n.parent)
		.finish();

	let with_parent = Note { body: "hi".into(), parent: Some(7) };
	let bytes = codec.encode_to_vec(&with_parent).unwrap();
	assert_eq!(codec.decode_from_slice(&bytes).unwrap(), with_parent);

	let without_parent = Note { body: "root".into(), parent: None };
	let bytes = codec.encode_to_vec(&without_parent).unwrap();
	assert_eq!(codec.decode_from_slice(&bytes).unwrap(), without_parent);
}

#[test]
fn identity_resolution_round_trips_through_the_dynamic_value_path() {
	let codec = record::<Event, _>("Event", |id| move |tag| Event { id, tag })
		.field("id", long(), |e: &Event| e.id)
		.field("tag", fixed(Name::from_fully_qualified_name("Tag"), 4), |e: &Event| e.tag.clone())
		.finish();

	let event = Event { id: 9, tag: vec![9, 9, 9, 9] };
	let bytes = codec.encode_to_vec(&event).unwrap();
	let value = decode_with_schemas(codec.schema(), codec.schema(), &bytes).unwrap();
	assert_eq!(
		value,
		Value::Record(vec![
			("id".into(), Value::Long(9)),
			("tag".into(), Value::Fixed(vec![9, 9, 9, 9])),
		])
	);
}
