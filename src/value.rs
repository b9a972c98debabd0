//! The dynamic `Value` sum used by the schema-evolution decode path (§3,
//! §4.5). The typed `Codec<T>` path never materializes this; it exists
//! purely so a (reader, writer) pair that doesn't correspond to any single
//! Rust type can still be decoded into something concrete.

use crate::schema::{Default as SchemaDefault, Schema, SchemaKey, Type};

/// A decoded Avro value, shaped by a [`crate::resolve::ReadPlan`] rather
/// than a static Rust type.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	Bytes(Vec<u8>),
	String(String),
	Array(Vec<Value>),
	Map(Vec<(String, Value)>),
	/// Fields in reader order.
	Record(Vec<(String, Value)>),
	/// `(reader_symbol_index, symbol_name)`.
	Enum(usize, String),
	/// `(reader_branch_index, value)`.
	Union(usize, Box<Value>),
	Fixed(Vec<u8>),
}

impl Value {
	/// Lift a schema-level [`SchemaDefault`] literal into a `Value`, e.g. to
	/// materialize a reader field missing from the writer. `schema_key` is
	/// the reader's schema node the default is attached to, so an `enum`
	/// default can be resolved to the reader's own symbol index rather than
	/// assumed to be the enum's first symbol.
	pub fn lift_default(reader: &Schema, schema_key: SchemaKey, default: &SchemaDefault) -> Value {
		match default {
			SchemaDefault::Null => Value::Null,
			SchemaDefault::Bool(b) => Value::Bool(*b),
			SchemaDefault::Int(i) => Value::Int(*i),
			SchemaDefault::Long(l) => Value::Long(*l),
			SchemaDefault::Float(f) => Value::Float(*f),
			SchemaDefault::Double(d) => Value::Double(*d),
			SchemaDefault::Bytes(b) => Value::Bytes(b.clone()),
			SchemaDefault::String(s) => Value::String(s.clone()),
			SchemaDefault::Enum(s) => {
				let index = match &reader.node(schema_key).type_ {
					Type::Enum(e) => e.symbols.iter().position(|sym| sym == s).unwrap_or(0),
					_ => 0,
				};
				Value::Enum(index, s.clone())
			}
			SchemaDefault::Array(items) => {
				let item_key = match &reader.node(schema_key).type_ {
					Type::Array(a) => a.items,
					_ => schema_key,
				};
				Value::Array(
					items
						.iter()
						.map(|item| Value::lift_default(reader, item_key, item))
						.collect(),
				)
			}
			SchemaDefault::Map(pairs) => {
				let value_key = match &reader.node(schema_key).type_ {
					Type::Map(m) => m.values,
					_ => schema_key,
				};
				Value::Map(
					pairs
						.iter()
						.map(|(k, v)| (k.clone(), Value::lift_default(reader, value_key, v)))
						.collect(),
				)
			}
			SchemaDefault::Union(branch, inner) => {
				let branch_key = match &reader.node(schema_key).type_ {
					Type::Union(u) => u.branches.get(*branch).copied().unwrap_or(schema_key),
					_ => schema_key,
				};
				Value::Union(*branch, Box::new(Value::lift_default(reader, branch_key, inner)))
			}
		}
	}

	/// The record fields, if this is a [`Value::Record`].
	pub fn as_record(&self) -> Option<&[(String, Value)]> {
		match self {
			Value::Record(fields) => Some(fields),
			_ => None,
		}
	}

	/// Look up a field of a [`Value::Record`] by name.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.as_record()?
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, v)| v)
	}
}
