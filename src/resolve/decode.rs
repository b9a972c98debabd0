//! The generic decoder (§4.5): interprets a [`ReadPlan`] against a [`Source`],
//! producing a [`Value`] rather than a statically typed Rust value. This is
//! the path taken whenever a reader and writer schema differ; a matching
//! `Codec<T>` never goes through here.

use super::{EnumPlan, FieldPlan, ReadPlan, RecordPlan, ResolutionError};
use crate::io::{IoError, Source};
use crate::schema::Schema;
use crate::value::Value;

/// Failure decoding through a [`ReadPlan`].
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
	#[error(transparent)]
	Io(#[from] IoError),
	#[error("schema resolution failed: {0}")]
	Resolution(#[from] ResolutionError),
	/// A [`ReadPlan::NamedRef`] reached decode without ever being replaced —
	/// an internal bug in the resolver, not a data error.
	#[error("internal error: unresolved named reference to `{name}` reached decode")]
	UnresolvedNamedRef { name: String },
}

/// Decode a single value through `plan`.
pub fn decode(plan: &ReadPlan, source: &mut Source) -> Result<Value, DecodeError> {
	match plan {
		ReadPlan::Null => {
			source.read_null()?;
			Ok(Value::Null)
		}
		ReadPlan::Bool => Ok(Value::Bool(source.read_bool()?)),
		ReadPlan::Int => Ok(Value::Int(source.read_int()?)),
		ReadPlan::IntAsLong => Ok(Value::Long(source.read_int()? as i64)),
		ReadPlan::IntAsFloat => Ok(Value::Float(source.read_int()? as f32)),
		ReadPlan::IntAsDouble => Ok(Value::Double(source.read_int()? as f64)),
		ReadPlan::Long => Ok(Value::Long(source.read_long()?)),
		ReadPlan::LongAsFloat => Ok(Value::Float(source.read_long()? as f32)),
		ReadPlan::LongAsDouble => Ok(Value::Double(source.read_long()? as f64)),
		ReadPlan::Float => Ok(Value::Float(source.read_float()?)),
		ReadPlan::FloatAsDouble => Ok(Value::Double(source.read_float()? as f64)),
		ReadPlan::Double => Ok(Value::Double(source.read_double()?)),
		ReadPlan::Bytes => Ok(Value::Bytes(source.read_bytes()?.to_vec())),
		ReadPlan::String => {
			let bytes = source.read_string_bytes()?;
			Ok(Value::String(String::from_utf8_lossy(bytes).into_owned()))
		}
		ReadPlan::Fixed { size, .. } => Ok(Value::Fixed(source.read_fixed(*size)?.to_vec())),

		ReadPlan::Array(elem) => {
			let mut items = Vec::new();
			decode_blocks(source, |source| {
				items.push(decode(elem, source)?);
				Ok(())
			})?;
			Ok(Value::Array(items))
		}
		ReadPlan::Map(elem) => {
			let mut pairs = Vec::new();
			decode_blocks(source, |source| {
				let key_bytes = source.read_string_bytes()?;
				let key = String::from_utf8_lossy(key_bytes).into_owned();
				let value = decode(elem, source)?;
				pairs.push((key, value));
				Ok(())
			})?;
			Ok(Value::Map(pairs))
		}

		ReadPlan::Record(record_plan) => decode_record(record_plan, source),
		ReadPlan::Enum(enum_plan) => decode_enum(enum_plan, source),

		ReadPlan::Union(branches) => {
			let widx = source.read_long()? as usize;
			let (ridx, sub) = branches
				.get(widx)
				.ok_or_else(|| DecodeError::Io(IoError::InvalidLength {
					length: widx as i64,
					offset: source.position(),
				}))?;
			let value = decode(sub, source)?;
			Ok(Value::Union(*ridx, Box::new(value)))
		}
		ReadPlan::UnionUnwrap(branches) => {
			let widx = source.read_long()? as usize;
			let sub = branches
				.get(widx)
				.ok_or_else(|| DecodeError::Io(IoError::InvalidLength {
					length: widx as i64,
					offset: source.position(),
				}))?;
			decode(sub, source)
		}
		ReadPlan::AsUnion(ridx, sub) => {
			let value = decode(sub, source)?;
			Ok(Value::Union(*ridx, Box::new(value)))
		}

		ReadPlan::NamedRef(name) => Err(DecodeError::UnresolvedNamedRef {
			name: name.fully_qualified_name().to_owned(),
		}),
	}
}

/// Shared array/map block-framing loop (§4.3 `array`): a sequence of blocks,
/// each `(count, items...)`, terminated by a zero-length block. A negative
/// count is followed by a byte-size hint, read and discarded here exactly as
/// the codec combinators do.
fn decode_blocks(
	source: &mut Source,
	mut read_item: impl FnMut(&mut Source) -> Result<(), DecodeError>,
) -> Result<(), DecodeError> {
	loop {
		let count = source.read_long()?;
		if count == 0 {
			return Ok(());
		}
		let item_count = if count < 0 {
			source.read_long()?;
			(-count) as usize
		} else {
			count as usize
		};
		for _ in 0..item_count {
			read_item(source)?;
		}
	}
}

fn decode_record(plan: &RecordPlan, source: &mut Source) -> Result<Value, DecodeError> {
	let mut by_position: Vec<Option<Value>> = (0..plan.reader_field_names.len()).map(|_| None).collect();

	for FieldPlan {
		plan: field_plan,
		reader_position,
		..
	} in &plan.fields
	{
		let value = decode(field_plan, source)?;
		if let Some(pos) = reader_position {
			by_position[*pos] = Some(value);
		}
	}
	for default in &plan.defaults {
		by_position[default.reader_position] = Some(default.value.clone());
	}

	let fields = plan
		.reader_field_names
		.iter()
		.zip(by_position.into_iter())
		.map(|(name, value)| {
			(
				name.clone(),
				value.expect("resolver guarantees every reader field is filled by the writer or a default"),
			)
		})
		.collect();
	Ok(Value::Record(fields))
}

fn decode_enum(plan: &EnumPlan, source: &mut Source) -> Result<Value, DecodeError> {
	let widx = source.read_long()? as usize;
	let ridx = *plan
		.symbol_map
		.get(widx)
		.ok_or_else(|| DecodeError::Io(IoError::InvalidLength {
			length: widx as i64,
			offset: source.position(),
		}))?;
	Ok(Value::Enum(ridx, plan.reader_symbols[ridx].clone()))
}

/// Resolve `reader` against `writer`, then decode a single value out of
/// `bytes` (§4.5 `decode_with_schemas`).
pub fn decode_with_schemas(reader: &Schema, writer: &Schema, bytes: &[u8]) -> Result<Value, DecodeError> {
	let plan = super::resolve(reader, writer)?;
	let mut source = Source::new(bytes);
	decode(&plan, &mut source)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{Node, SchemaBuilder, Type};
	use crate::io::Sink;

	#[test]
	fn int_writer_decodes_as_long_under_long_reader() {
		let mut b = SchemaBuilder::new();
		b.push(Node::new(Type::Int));
		let writer = b.build().unwrap();

		let mut rb = SchemaBuilder::new();
		rb.push(Node::new(Type::Long));
		let reader = rb.build().unwrap();

		let mut sink = Sink::new();
		sink.write_int(42);

		let value = decode_with_schemas(&reader, &writer, sink.as_slice()).unwrap();
		assert_eq!(value, Value::Long(42));
	}

	#[test]
	fn identical_schemas_round_trip_a_record() {
		use crate::schema::{Field, Record};

		let mut b = SchemaBuilder::new();
		let name_key = b.push(Node::new(Type::String));
		let age_key = b.push(Node::new(Type::Int));
		b.push(Node::new(Type::Record(Record {
			name: crate::schema::Name::from_fully_qualified_name("Person"),
			fields: vec![
				Field {
					name: "name".into(),
					schema: name_key,
					doc: None,
					default: None,
					aliases: vec![],
				},
				Field {
					name: "age".into(),
					schema: age_key,
					doc: None,
					default: None,
					aliases: vec![],
				},
			],
			doc: None,
			aliases: vec![],
		})));
		let schema = b.build().unwrap();

		let mut sink = Sink::new();
		sink.write_string("Alice");
		sink.write_int(30);

		let value = decode_with_schemas(&schema, &schema, sink.as_slice()).unwrap();
		assert_eq!(
			value,
			Value::Record(vec![
				("name".into(), Value::String("Alice".into())),
				("age".into(), Value::Int(30)),
			])
		);
	}

	#[test]
	fn array_decodes_multi_block_sequences() {
		let mut b = SchemaBuilder::new();
		let items = b.push(Node::new(Type::Int));
		b.push(Node::new(Type::Array(crate::schema::Array { items })));
		let schema = b.build().unwrap();

		let mut sink = Sink::new();
		sink.write_long(2);
		sink.write_int(1);
		sink.write_int(2);
		sink.write_long(1);
		sink.write_int(3);
		sink.write_long(0);

		let value = decode_with_schemas(&schema, &schema, sink.as_slice()).unwrap();
		assert_eq!(
			value,
			Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
		);
	}
}
