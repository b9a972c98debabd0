//! Combinator-based typed codecs (§4.3).
//!
//! A [`Codec<T>`] bundles a [`Schema`] with an encode and a decode function.
//! Primitive codecs correspond 1:1 to [`crate::io`] operations; containers
//! and [`record`] compose smaller codecs into larger ones. The schema side
//! of composition goes through [`SchemaBuilder::import`], which copies a
//! sub-codec's arena into the parent, keeping every `Codec<T>` self-
//! contained and immutable once built.

mod record;

pub use record::{record, RecordBuilder};

use crate::io::{IoError, Sink, Source};
use crate::schema::{
	Array, Fixed as FixedType, Map as MapType, Name, Node, RecursiveId, Schema, SchemaBuilder,
	Type, Union as UnionType,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Failure encoding a value with a [`Codec`].
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
	/// A `fixed` codec was given a byte slice of the wrong length.
	#[error("fixed `{name}` expects exactly {expected} bytes, got {got}")]
	FixedSizeMismatch {
		name: String,
		expected: usize,
		got: usize,
	},
	/// No branch of a [`union`] codec matched the value being encoded.
	#[error("value matched no union branch")]
	NoMatchingUnionBranch,
	/// Caller-supplied encode failure (e.g. a custom codec).
	#[error("{0}")]
	Custom(String),
}

/// Failure decoding a value with a [`Codec`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error(transparent)]
	Io(#[from] IoError),
	/// A union's branch index was negative or beyond its branch count.
	#[error("union branch index {0} is out of range")]
	UnknownUnionBranch(i64),
	/// A `fixed` codec read the wrong number of bytes (should be unreachable
	/// given `Source::read_fixed`'s contract, kept for completeness).
	#[error("fixed `{name}` expects exactly {expected} bytes, got {got}")]
	FixedSizeMismatch {
		name: String,
		expected: usize,
		got: usize,
	},
	/// Caller-supplied decode failure (e.g. a custom codec).
	#[error("{0}")]
	Custom(String),
}

type EncodeFn<T> = Rc<dyn Fn(&T, &mut Sink) -> Result<(), EncodeError>>;
type DecodeFn<T> = Rc<dyn Fn(&mut Source) -> Result<T, DecodeError>>;

/// A bundled schema plus an encode/decode pair, opaque to callers and
/// composed exclusively through the free functions and [`record`] in this
/// module.
pub struct Codec<T> {
	schema: Schema,
	encode: EncodeFn<T>,
	decode: DecodeFn<T>,
}

impl<T> Clone for Codec<T> {
	fn clone(&self) -> Self {
		Self {
			schema: self.schema.clone(),
			encode: self.encode.clone(),
			decode: self.decode.clone(),
		}
	}
}

impl<T> Codec<T> {
	fn new(schema: Schema, encode: EncodeFn<T>, decode: DecodeFn<T>) -> Self {
		Self {
			schema,
			encode,
			decode,
		}
	}

	/// The schema this codec reads and writes.
	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	/// Encode `value` onto `sink`.
	pub fn encode(&self, value: &T, sink: &mut Sink) -> Result<(), EncodeError> {
		(self.encode)(value, sink)
	}

	/// Encode `value` into a freshly allocated buffer.
	pub fn encode_to_vec(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
		let mut sink = Sink::new();
		self.encode(value, &mut sink)?;
		Ok(sink.into_vec())
	}

	/// Decode a value from `source`.
	pub fn decode(&self, source: &mut Source) -> Result<T, DecodeError> {
		(self.decode)(source)
	}

	/// Decode a value from a complete byte slice.
	pub fn decode_from_slice(&self, bytes: &[u8]) -> Result<T, DecodeError> {
		let mut source = Source::new(bytes);
		self.decode(&mut source)
	}

	pub(crate) fn encode_rc(&self) -> EncodeFn<T> {
		self.encode.clone()
	}

	pub(crate) fn decode_rc(&self) -> DecodeFn<T> {
		self.decode.clone()
	}
}

fn primitive_schema(type_: Type) -> Schema {
	let mut builder = SchemaBuilder::new();
	builder.push(Node::new(type_));
	builder.build().expect("a bare primitive schema always validates")
}

/// `null`: zero bytes on the wire.
pub fn null() -> Codec<()> {
	Codec::new(
		primitive_schema(Type::Null),
		Rc::new(|_: &(), sink: &mut Sink| {
			sink.write_null();
			Ok(())
		}),
		Rc::new(|src: &mut Source| {
			src.read_null()?;
			Ok(())
		}),
	)
}

/// `boolean`.
pub fn bool_() -> Codec<bool> {
	Codec::new(
		primitive_schema(Type::Boolean),
		Rc::new(|v: &bool, sink: &mut Sink| {
			sink.write_bool(*v);
			Ok(())
		}),
		Rc::new(|src: &mut Source| Ok(src.read_bool()?)),
	)
}

/// `int`.
pub fn int() -> Codec<i32> {
	Codec::new(
		primitive_schema(Type::Int),
		Rc::new(|v: &i32, sink: &mut Sink| {
			sink.write_int(*v);
			Ok(())
		}),
		Rc::new(|src: &mut Source| Ok(src.read_int()?)),
	)
}

/// `long`.
pub fn long() -> Codec<i64> {
	Codec::new(
		primitive_schema(Type::Long),
		Rc::new(|v: &i64, sink: &mut Sink| {
			sink.write_long(*v);
			Ok(())
		}),
		Rc::new(|src: &mut Source| Ok(src.read_long()?)),
	)
}

/// `float`.
pub fn float() -> Codec<f32> {
	Codec::new(
		primitive_schema(Type::Float),
		Rc::new(|v: &f32, sink: &mut Sink| {
			sink.write_float(*v);
			Ok(())
		}),
		Rc::new(|src: &mut Source| Ok(src.read_float()?)),
	)
}

/// `double`.
pub fn double() -> Codec<f64> {
	Codec::new(
		primitive_schema(Type::Double),
		Rc::new(|v: &f64, sink: &mut Sink| {
			sink.write_double(*v);
			Ok(())
		}),
		Rc::new(|src: &mut Source| Ok(src.read_double()?)),
	)
}

/// `bytes`.
pub fn bytes() -> Codec<Vec<u8>> {
	Codec::new(
		primitive_schema(Type::Bytes),
		Rc::new(|v: &Vec<u8>, sink: &mut Sink| {
			sink.write_bytes(v);
			Ok(())
		}),
		Rc::new(|src: &mut Source| Ok(src.read_bytes()?.to_vec())),
	)
}

/// `string`.
pub fn string() -> Codec<String> {
	Codec::new(
		primitive_schema(Type::String),
		Rc::new(|v: &String, sink: &mut Sink| {
			sink.write_string(v);
			Ok(())
		}),
		Rc::new(|src: &mut Source| {
			let bytes = src.read_string_bytes()?;
			Ok(String::from_utf8_lossy(bytes).into_owned())
		}),
	)
}

/// `fixed(name, size)`: an exact-size byte payload. Encoding a slice whose
/// length differs from `size` is rejected with [`EncodeError::FixedSizeMismatch`].
pub fn fixed(name: impl Into<Name>, size: usize) -> Codec<Vec<u8>> {
	let name = name.into();
	let schema = {
		let mut builder = SchemaBuilder::new();
		builder.push(Node::new(Type::Fixed(FixedType {
			name: name.clone(),
			size,
			doc: None,
			aliases: vec![],
		})));
		builder.build().expect("a bare fixed schema always validates")
	};
	let encode_name = name.fully_qualified_name().to_owned();
	Codec::new(
		schema,
		Rc::new(move |v: &Vec<u8>, sink: &mut Sink| {
			if v.len() != size {
				return Err(EncodeError::FixedSizeMismatch {
					name: encode_name.clone(),
					expected: size,
					got: v.len(),
				});
			}
			sink.write_fixed(v);
			Ok(())
		}),
		Rc::new(move |src: &mut Source| Ok(src.read_fixed(size)?.to_vec())),
	)
}

/// `array(elem)`: encodes as one non-empty `(count, items…)` block followed
/// by a zero terminator (§4.3). Decoding also accepts the negative-count
/// block-with-size-hint form emitted by other Avro implementations (§6).
pub fn array<T: 'static>(elem: Codec<T>) -> Codec<Vec<T>> {
	let mut builder = SchemaBuilder::new();
	let items = builder.import(elem.schema());
	builder.push(Node::new(Type::Array(Array { items })));
	let schema = builder.build().expect("an array schema over a valid element always validates");

	let elem_encode = elem.encode_rc();
	let elem_decode = elem.decode_rc();
	let decode_elem = elem_decode.clone();

	Codec::new(
		schema,
		Rc::new(move |items: &Vec<T>, sink: &mut Sink| {
			if !items.is_empty() {
				sink.write_long(items.len() as i64);
				for item in items {
					elem_encode(item, sink)?;
				}
				sink.write_long(0);
			} else {
				sink.write_long(0);
			}
			Ok(())
		}),
		Rc::new(move |src: &mut Source| {
			let mut out = Vec::new();
			loop {
				let raw_count = src.read_long()?;
				if raw_count == 0 {
					break;
				}
				let count = if raw_count < 0 {
					let _byte_size = src.read_long()?;
					-raw_count
				} else {
					raw_count
				};
				out.reserve(count as usize);
				for _ in 0..count {
					out.push(decode_elem(src)?);
				}
			}
			Ok(out)
		}),
	)
}

/// `map(elem)`: like [`array`], but each item is prefixed by its string key.
/// Order of entries is preserved (Avro does not mandate map ordering, but a
/// deterministic `Vec` avoids an unnecessary `Hash` bound on `T`).
pub fn map<T: 'static>(elem: Codec<T>) -> Codec<Vec<(String, T)>> {
	let mut builder = SchemaBuilder::new();
	let values = builder.import(elem.schema());
	builder.push(Node::new(Type::Map(MapType { values })));
	let schema = builder.build().expect("a map schema over a valid value type always validates");

	let elem_encode = elem.encode_rc();
	let elem_decode = elem.decode_rc();

	Codec::new(
		schema,
		Rc::new(move |pairs: &Vec<(String, T)>, sink: &mut Sink| {
			if !pairs.is_empty() {
				sink.write_long(pairs.len() as i64);
				for (key, value) in pairs {
					sink.write_string(key);
					elem_encode(value, sink)?;
				}
				sink.write_long(0);
			} else {
				sink.write_long(0);
			}
			Ok(())
		}),
		Rc::new(move |src: &mut Source| {
			let mut out = Vec::new();
			loop {
				let raw_count = src.read_long()?;
				if raw_count == 0 {
					break;
				}
				let count = if raw_count < 0 {
					let _byte_size = src.read_long()?;
					-raw_count
				} else {
					raw_count
				};
				out.reserve(count as usize);
				for _ in 0..count {
					let key = String::from_utf8_lossy(src.read_string_bytes()?).into_owned();
					let value = elem_decode(src)?;
					out.push((key, value));
				}
			}
			Ok(out)
		}),
	)
}

/// `option(T) ≡ union(null, T)`, with `None` as branch `0` and `Some` as
/// branch `1` (§4.3).
pub fn option<T: 'static>(inner: Codec<T>) -> Codec<Option<T>> {
	let mut builder = SchemaBuilder::new();
	let null_key = builder.push(Node::new(Type::Null));
	let inner_key = builder.import(inner.schema());
	builder.push(Node::new(Type::Union(UnionType {
		branches: vec![null_key, inner_key],
	})));
	let schema = builder.build().expect("an option schema always validates");

	let inner_encode = inner.encode_rc();
	let inner_decode = inner.decode_rc();

	Codec::new(
		schema,
		Rc::new(move |value: &Option<T>, sink: &mut Sink| match value {
			None => {
				sink.write_long(0);
				Ok(())
			}
			Some(v) => {
				sink.write_long(1);
				inner_encode(v, sink)
			}
		}),
		Rc::new(move |src: &mut Source| {
			let idx = src.read_long()?;
			match idx {
				0 => Ok(None),
				1 => Ok(Some(inner_decode(src)?)),
				other => Err(DecodeError::UnknownUnionBranch(other)),
			}
		}),
	)
}

/// One branch of a [`union`] codec.
pub struct UnionBranch<T> {
	schema: Schema,
	matches: Box<dyn Fn(&T) -> bool>,
	encode_payload: Box<dyn Fn(&T, &mut Sink) -> Result<(), EncodeError>>,
	decode: Box<dyn Fn(&mut Source) -> Result<T, DecodeError>>,
}

impl<T: 'static> UnionBranch<T> {
	/// Build a branch out of a sub-codec, a predicate recognizing which
	/// values of `T` belong to this branch, a projection down to the
	/// sub-codec's type for encoding, and a constructor back up to `T` for
	/// decoding.
	pub fn new<B: 'static>(
		codec: Codec<B>,
		matches: impl Fn(&T) -> bool + 'static,
		project: impl Fn(&T) -> B + 'static,
		inject: impl Fn(B) -> T + 'static,
	) -> Self {
		let encode_fn = codec.encode_rc();
		let decode_fn = codec.decode_rc();
		UnionBranch {
			schema: clone_schema(codec.schema()),
			matches: Box::new(matches),
			encode_payload: Box::new(move |t: &T, sink: &mut Sink| encode_fn(&project(t), sink)),
			decode: Box::new(move |src: &mut Source| Ok(inject(decode_fn(src)?))),
		}
	}
}

fn clone_schema(schema: &Schema) -> Schema {
	let mut builder = SchemaBuilder::new();
	builder.import(schema);
	builder.build_unchecked()
}

/// `union(branches)`: encodes as `(branch_index as long, payload)`, trying
/// branches in order on encode via each [`UnionBranch`]'s predicate (§4.3).
pub fn union<T: 'static>(branches: Vec<UnionBranch<T>>) -> Codec<T> {
	let mut builder = SchemaBuilder::new();
	let branch_keys: Vec<_> = branches.iter().map(|b| builder.import(&b.schema)).collect();
	builder.push(Node::new(Type::Union(UnionType {
		branches: branch_keys,
	})));
	let schema = builder.build().expect("a union of distinct branches always validates");

	let branches = Rc::new(branches);
	let encode_branches = branches.clone();
	let decode_branches = branches;

	Codec::new(
		schema,
		Rc::new(move |value: &T, sink: &mut Sink| {
			for (idx, branch) in encode_branches.iter().enumerate() {
				if (branch.matches)(value) {
					sink.write_long(idx as i64);
					return (branch.encode_payload)(value, sink);
				}
			}
			Err(EncodeError::NoMatchingUnionBranch)
		}),
		Rc::new(move |src: &mut Source| {
			let idx = src.read_long()?;
			let branch = usize::try_from(idx)
				.ok()
				.and_then(|i| decode_branches.get(i))
				.ok_or(DecodeError::UnknownUnionBranch(idx))?;
			(branch.decode)(src)
		}),
	)
}

static NEXT_RECURSIVE_ID: AtomicU64 = AtomicU64::new(0);

/// A fixpoint combinator for recursive types (§4.3, §9): allocates cells for
/// the eventual encode/decode functions, hands `f` a placeholder codec that
/// dereferences those cells lazily, then backfills them with whatever `f`
/// builds. The placeholder's schema is a unique marker node that gets
/// collapsed into a true self-reference to the real root once `f` returns,
/// so the result looks exactly like a schema built with direct recursion.
pub fn recursive<T: 'static>(f: impl FnOnce(Codec<T>) -> Codec<T>) -> Codec<T> {
	let id = RecursiveId(NEXT_RECURSIVE_ID.fetch_add(1, Ordering::Relaxed));

	let placeholder_schema = {
		let mut builder = SchemaBuilder::new();
		builder.push(Node::new(Type::RecursivePlaceholder(id)));
		builder.build().expect("a lone placeholder node always validates")
	};

	let encode_cell: Rc<RefCell<Option<EncodeFn<T>>>> = Rc::new(RefCell::new(None));
	let decode_cell: Rc<RefCell<Option<DecodeFn<T>>>> = Rc::new(RefCell::new(None));

	let placeholder = {
		let encode_cell = encode_cell.clone();
		let decode_cell = decode_cell.clone();
		Codec::new(
			placeholder_schema,
			Rc::new(move |value: &T, sink: &mut Sink| {
				let f = encode_cell
					.borrow()
					.clone()
					.expect("recursive codec invoked before its body finished building");
				f(value, sink)
			}),
			Rc::new(move |src: &mut Source| {
				let f = decode_cell
					.borrow()
					.clone()
					.expect("recursive codec invoked before its body finished building");
				f(src)
			}),
		)
	};

	let mut real = f(placeholder);
	let root = real.schema.root();
	for idx in find_placeholder_indices(&real.schema, id) {
		real.schema
			.collapse_placeholder(crate::schema::SchemaKey::from_idx(idx), root);
	}
	*encode_cell.borrow_mut() = Some(real.encode.clone());
	*decode_cell.borrow_mut() = Some(real.decode.clone());
	real
}

fn find_placeholder_indices(schema: &Schema, id: RecursiveId) -> Vec<usize> {
	schema
		.nodes()
		.iter()
		.enumerate()
		.filter(|(_, node)| matches!(&node.type_, Type::RecursivePlaceholder(found) if *found == id))
		.map(|(idx, _)| idx)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::Type as SchemaType;

	#[test]
	fn null_round_trips() {
		let codec = null();
		let bytes = codec.encode_to_vec(&()).unwrap();
		assert!(bytes.is_empty());
		codec.decode_from_slice(&bytes).unwrap();
	}

	#[test]
	fn int_round_trips_spec_example() {
		let codec = int();
		assert_eq!(codec.encode_to_vec(&0).unwrap(), vec![0x00]);
		assert_eq!(codec.encode_to_vec(&-64).unwrap(), vec![0x7F]);
		assert_eq!(codec.decode_from_slice(&[0x7F]).unwrap(), -64);
	}

	#[test]
	fn string_round_trips_spec_example() {
		let codec = string();
		let bytes = codec.encode_to_vec(&"Alice".to_owned()).unwrap();
		assert_eq!(bytes, vec![0x0A, 0x41, 0x6C, 0x69, 0x63, 0x65]);
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), "Alice");
	}

	#[test]
	fn fixed_rejects_wrong_length() {
		let codec = fixed(Name::from_fully_qualified_name("md5"), 16);
		let err = codec.encode_to_vec(&vec![0u8; 4]).unwrap_err();
		assert!(matches!(err, EncodeError::FixedSizeMismatch { expected: 16, got: 4, .. }));
	}

	#[test]
	fn array_round_trips_and_terminates_with_zero() {
		let codec = array(int());
		let bytes = codec.encode_to_vec(&vec![1, 2, 3]).unwrap();
		assert_eq!(bytes.last(), Some(&0x00));
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), vec![1, 2, 3]);
	}

	#[test]
	fn array_decodes_negative_count_block_with_size_hint() {
		let codec = array(int());
		let mut sink = Sink::new();
		sink.write_long(-2);
		sink.write_long(999); // byte-size hint, ignored
		sink.write_int(10);
		sink.write_int(20);
		sink.write_long(0);
		assert_eq!(codec.decode_from_slice(sink.as_slice()).unwrap(), vec![10, 20]);
	}

	#[test]
	fn empty_array_is_a_lone_zero() {
		let codec = array(int());
		assert_eq!(codec.encode_to_vec(&Vec::<i32>::new()).unwrap(), vec![0x00]);
	}

	#[test]
	fn map_round_trips_with_string_keys() {
		let codec = map(long());
		let pairs = vec![("a".to_owned(), 1i64), ("b".to_owned(), 2i64)];
		let bytes = codec.encode_to_vec(&pairs).unwrap();
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), pairs);
	}

	#[test]
	fn option_none_is_branch_zero() {
		let codec = option(string());
		let bytes = codec.encode_to_vec(&None).unwrap();
		assert_eq!(bytes, vec![0x00]);
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), None);
	}

	#[test]
	fn option_some_is_branch_one() {
		let codec = option(string());
		let bytes = codec.encode_to_vec(&Some("hi".to_owned())).unwrap();
		assert_eq!(bytes[0], 0x02); // zig-zag(1)
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), Some("hi".to_owned()));
	}

	#[derive(Debug, Clone, PartialEq)]
	enum IntOrString {
		I(i32),
		S(String),
	}

	fn int_or_string_codec() -> Codec<IntOrString> {
		union(vec![
			UnionBranch::new(
				int(),
				|v: &IntOrString| matches!(v, IntOrString::I(_)),
				|v: &IntOrString| match v {
					IntOrString::I(i) => *i,
					_ => unreachable!(),
				},
				IntOrString::I,
			),
			UnionBranch::new(
				string(),
				|v: &IntOrString| matches!(v, IntOrString::S(_)),
				|v: &IntOrString| match v {
					IntOrString::S(s) => s.clone(),
					_ => unreachable!(),
				},
				IntOrString::S,
			),
		])
	}

	#[test]
	fn union_dispatches_to_matching_branch() {
		let codec = int_or_string_codec();
		let bytes = codec.encode_to_vec(&IntOrString::S("hi".into())).unwrap();
		assert_eq!(bytes[0], 0x02); // branch index 1, zig-zagged
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), IntOrString::S("hi".into()));
	}

	#[test]
	fn union_unknown_branch_index_is_an_error() {
		let codec = int_or_string_codec();
		let mut sink = Sink::new();
		sink.write_long(5);
		assert!(matches!(
			codec.decode_from_slice(sink.as_slice()),
			Err(DecodeError::UnknownUnionBranch(5))
		));
	}

	#[derive(Debug, Clone, PartialEq)]
	struct IntList {
		head: i32,
		tail: Option<Box<IntList>>,
	}

	fn int_list_codec() -> Codec<IntList> {
		recursive(|self_codec: Codec<IntList>| {
			record::<IntList, _>(Name::from_fully_qualified_name("IntList"), |head| {
				move |tail: Option<IntList>| IntList {
					head,
					tail: tail.map(Box::new),
				}
			})
			.field("head", int(), |v: &IntList| v.head)
			.field_opt(
				"tail",
				self_codec,
				|v: &IntList| v.tail.as_ref().map(|b| (**b).clone()),
			)
			.finish()
		})
	}

	#[test]
	fn recursive_schema_self_references_its_own_root() {
		let codec = int_list_codec();
		let schema = codec.schema();
		assert!(matches!(&schema.node(schema.root()).type_, SchemaType::Record(_)));
		for node in schema.nodes() {
			assert!(!matches!(&node.type_, SchemaType::RecursivePlaceholder(_)));
		}
	}

	#[test]
	fn recursive_codec_round_trips_nested_values() {
		let codec = int_list_codec();
		let value = IntList {
			head: 1,
			tail: Some(Box::new(IntList {
				head: 2,
				tail: Some(Box::new(IntList { head: 3, tail: None })),
			})),
		};
		let bytes = codec.encode_to_vec(&value).unwrap();
		assert_eq!(codec.decode_from_slice(&bytes).unwrap(), value);
	}

	proptest::proptest! {
		#[test]
		fn array_of_longs_round_trips(values: Vec<i64>) {
			let codec = array(long());
			let bytes = codec.encode_to_vec(&values).unwrap();
			proptest::prop_assert_eq!(codec.decode_from_slice(&bytes).unwrap(), values);
		}
	}
}
