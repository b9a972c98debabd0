//! Parsing Canonical Form and the CRC-64-AVRO schema fingerprint.

use super::{Schema, SchemaKey, SchemaError, Type};
use std::fmt::Write as _;

impl Schema {
	/// The Parsing Canonical Form of this schema: docs, defaults, aliases,
	/// logical tags and namespaces-on-anonymous-types are stripped; key
	/// ordering is fixed (`name`, `type`, `fields`, `symbols`, `items`,
	/// `values`, `size`).
	///
	/// A named type is inlined in full on its first occurrence within this
	/// traversal and referred to by fullname-only thereafter, so that
	/// self-referential schemas terminate.
	pub fn canonical_json(&self) -> String {
		let mut state = CanonicalState {
			schema: self,
			out: String::new(),
			written: vec![false; self.nodes().len()],
		};
		state.write(self.root());
		state.out
	}

	/// CRC-64-AVRO of [`canonical_json`](Self::canonical_json): initial value
	/// all-ones, polynomial `0xC96C5795D7870F42` applied to the
	/// right-shifted state, no post-inversion. This is the fingerprint used
	/// for [single object encoding](https://avro.apache.org/docs/current/specification/#single-object-encoding).
	pub fn fingerprint(&self) -> u64 {
		crc64_avro(self.canonical_json().as_bytes())
	}
}

struct CanonicalState<'a> {
	schema: &'a Schema,
	out: String,
	written: Vec<bool>,
}

impl<'a> CanonicalState<'a> {
	fn write(&mut self, key: SchemaKey) {
		// Logical types are entirely ignored in PCF (AVRO-1721).
		let node = self.schema.node(key);
		match &node.type_ {
			Type::Null => self.out.push_str("\"null\""),
			Type::Boolean => self.out.push_str("\"boolean\""),
			Type::Int => self.out.push_str("\"int\""),
			Type::Long => self.out.push_str("\"long\""),
			Type::Float => self.out.push_str("\"float\""),
			Type::Double => self.out.push_str("\"double\""),
			Type::Bytes => self.out.push_str("\"bytes\""),
			Type::String => self.out.push_str("\"string\""),
			Type::Array(array) => {
				self.out.push_str("{\"type\":\"array\",\"items\":");
				self.write(array.items);
				self.out.push('}');
			}
			Type::Map(map) => {
				self.out.push_str("{\"type\":\"map\",\"values\":");
				self.write(map.values);
				self.out.push('}');
			}
			Type::Union(union) => {
				self.out.push('[');
				for (i, &branch) in union.branches.iter().enumerate() {
					if i > 0 {
						self.out.push(',');
					}
					self.write(branch);
				}
				self.out.push(']');
			}
			Type::Record(record) => {
				let idx = key.idx();
				if self.written[idx] {
					write!(self.out, "\"{}\"", record.name.fully_qualified_name()).unwrap();
					return;
				}
				self.written[idx] = true;
				write!(
					self.out,
					"{{\"name\":\"{}\",\"type\":\"record\",\"fields\":[",
					record.name.fully_qualified_name()
				)
				.unwrap();
				for (i, field) in record.fields.iter().enumerate() {
					if i > 0 {
						self.out.push(',');
					}
					write!(self.out, "{{\"name\":\"{}\",\"type\":", field.name).unwrap();
					self.write(field.schema);
					self.out.push('}');
				}
				self.out.push_str("]}");
			}
			Type::Enum(enum_) => {
				let idx = key.idx();
				if self.written[idx] {
					write!(self.out, "\"{}\"", enum_.name.fully_qualified_name()).unwrap();
					return;
				}
				self.written[idx] = true;
				write!(
					self.out,
					"{{\"name\":\"{}\",\"type\":\"enum\",\"symbols\":[",
					enum_.name.fully_qualified_name()
				)
				.unwrap();
				for (i, symbol) in enum_.symbols.iter().enumerate() {
					if i > 0 {
						self.out.push(',');
					}
					write!(self.out, "\"{symbol}\"").unwrap();
				}
				self.out.push_str("]}");
			}
			Type::Fixed(fixed) => {
				let idx = key.idx();
				if self.written[idx] {
					write!(self.out, "\"{}\"", fixed.name.fully_qualified_name()).unwrap();
					return;
				}
				self.written[idx] = true;
				write!(
					self.out,
					"{{\"name\":\"{}\",\"type\":\"fixed\",\"size\":{}}}",
					fixed.name.fully_qualified_name(),
					fixed.size
				)
				.unwrap();
			}
			Type::RecursivePlaceholder(_) => unreachable!(
				"recursive placeholder must be collapsed before a schema leaves codec::recursive"
			),
		}
	}
}

const CRC64_AVRO_POLY: u64 = 0xC96C_5795_D787_0F42;

fn crc64_table() -> &'static [u64; 256] {
	static TABLE: std::sync::OnceLock<[u64; 256]> = std::sync::OnceLock::new();
	TABLE.get_or_init(|| {
		let mut table = [0u64; 256];
		let mut i = 0;
		while i < 256 {
			let mut fp = i as u64;
			let mut j = 0;
			while j < 8 {
				fp = if fp & 1 == 1 {
					(fp >> 1) ^ CRC64_AVRO_POLY
				} else {
					fp >> 1
				};
				j += 1;
			}
			table[i] = fp;
			i += 1;
		}
		table
	})
}

fn crc64_avro(data: &[u8]) -> u64 {
	let table = crc64_table();
	let mut state = !0u64;
	for &byte in data {
		state = (state >> 8) ^ table[((state ^ byte as u64) & 0xFF) as usize];
	}
	state
}

/// Attach a logical type to the node at `key`, no-op unless the node is one
/// of the four annotatable primitives or a fixed. Convenience free function
/// mirroring [`super::Node::with_logical`] for callers that only hold a key.
pub fn with_logical(
	schema: &mut Schema,
	key: SchemaKey,
	logical: super::LogicalType,
) -> Result<(), SchemaError> {
	let idx = key.idx();
	let node = schema
		.nodes
		.get_mut(idx)
		.ok_or_else(|| SchemaError::new("SchemaKey refers to a non-existing node"))?;
	*node = node.clone().with_logical(logical);
	Ok(())
}
