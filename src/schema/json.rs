//! JSON ⇄ [`Schema`] conversion.
//!
//! The parser accepts a JSON string or a pre-parsed [`serde_json::Value`].
//! Dispatch follows §4.9: a JSON string is either a primitive keyword or a
//! reference to an already-defined named type; a JSON object carries a
//! `"type"`; a JSON array is a union.
//!
//! There is no separate cross-record symbol table exposed publicly — the
//! combinator codec API (see [`crate::codec`]) never produces schemas with
//! shared references that originate outside of a single parse, so resolving
//! references during this one parse is enough.

use super::{
	Array, Default as SchemaDefault, Enum, Field, Fixed, LogicalType, Map, Name, Node, Record,
	Schema, SchemaBuilder, SchemaKey, Type, Union,
};
use serde_json::Value;
use std::collections::HashMap;

/// Failure parsing a schema from JSON.
#[derive(Debug, thiserror::Error)]
pub enum JsonSchemaError {
	/// The text was not valid JSON at all.
	#[error("invalid schema JSON: {0}")]
	Json(#[from] serde_json::Error),
	/// A named type was referenced (by string) before it was defined, or was
	/// never defined.
	#[error("unknown schema reference `{0}` at {1}")]
	UnknownReference(String, JsonPath),
	/// The same fully-qualified name was defined twice.
	#[error("duplicate definition of `{0}` at {1}")]
	DuplicateName(String, JsonPath),
	/// A node was missing a field required for its declared `"type"`.
	#[error("missing `{field}` at {path}")]
	MissingField {
		/// The missing field's name.
		field: &'static str,
		/// Where in the document it was expected.
		path: JsonPath,
	},
	/// A field had the wrong JSON shape for its declared role.
	#[error("malformed schema node at {path}: {reason}")]
	Malformed {
		/// What went wrong.
		reason: String,
		/// Where in the document.
		path: JsonPath,
	},
	/// The overall schema failed a data-model invariant after parsing.
	#[error(transparent)]
	Invalid(#[from] super::SchemaError),
}

/// A breadcrumb trail identifying where in the source document a parse
/// failure occurred, since `serde_json::Value` does not retain byte offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(String);

impl std::fmt::Display for JsonPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.0.is_empty() {
			f.write_str("<root>")
		} else {
			f.write_str(&self.0)
		}
	}
}

impl JsonPath {
	fn child(&self, segment: impl std::fmt::Display) -> Self {
		if self.0.is_empty() {
			JsonPath(segment.to_string())
		} else {
			JsonPath(format!("{}.{}", self.0, segment))
		}
	}
}

/// Parse a schema from a JSON string.
pub fn parse(s: &str) -> Result<Schema, JsonSchemaError> {
	let value: Value = serde_json::from_str(s)?;
	parse_value(&value)
}

/// Parse a schema from a pre-parsed JSON tree.
pub fn parse_value(value: &Value) -> Result<Schema, JsonSchemaError> {
	let mut parser = Parser {
		builder: SchemaBuilder::new(),
		names: HashMap::new(),
	};
	parser.node(value, None, &JsonPath::default())?;
	Ok(parser.builder.build()?)
}

impl std::str::FromStr for Schema {
	type Err = JsonSchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		parse(s)
	}
}

struct Parser {
	builder: SchemaBuilder,
	names: HashMap<String, SchemaKey>,
}

fn qualify(raw_name: &str, namespace: Option<&str>, enclosing: Option<&str>) -> Name {
	if raw_name.contains('.') {
		Name::from_fully_qualified_name(raw_name)
	} else {
		Name::new(raw_name, namespace.or(enclosing))
	}
}

impl Parser {
	fn node(
		&mut self,
		value: &Value,
		enclosing_namespace: Option<&str>,
		path: &JsonPath,
	) -> Result<SchemaKey, JsonSchemaError> {
		match value {
			Value::String(s) => self.primitive_or_reference(s, path),
			Value::Array(branches) => {
				let mut keys = Vec::with_capacity(branches.len());
				for (i, branch) in branches.iter().enumerate() {
					keys.push(self.node(branch, enclosing_namespace, &path.child(i))?);
				}
				Ok(self.builder.push(Node::new(Type::Union(Union { branches: keys }))))
			}
			Value::Object(obj) => self.object(obj, enclosing_namespace, path),
			other => Err(JsonSchemaError::Malformed {
				reason: format!("expected a string, array or object, got {other}"),
				path: path.clone(),
			}),
		}
	}

	fn primitive_or_reference(
		&mut self,
		s: &str,
		path: &JsonPath,
	) -> Result<SchemaKey, JsonSchemaError> {
		if let Some(type_) = primitive_from_str(s) {
			return Ok(self.builder.push(Node::new(type_)));
		}
		self.names
			.get(s)
			.copied()
			.ok_or_else(|| JsonSchemaError::UnknownReference(s.to_owned(), path.clone()))
	}

	fn object(
		&mut self,
		obj: &serde_json::Map<String, Value>,
		enclosing_namespace: Option<&str>,
		path: &JsonPath,
	) -> Result<SchemaKey, JsonSchemaError> {
		let type_field = obj.get("type").ok_or_else(|| JsonSchemaError::MissingField {
			field: "type",
			path: path.clone(),
		})?;
		// `{"type": {"type": "..."}}` nesting is legal Avro (mostly seen for
		// arrays-of-arrays written inline); a bare string is the common case.
		let type_name = match type_field {
			Value::String(s) => s.as_str(),
			Value::Object(_) => return self.node(type_field, enclosing_namespace, path),
			other => {
				return Err(JsonSchemaError::Malformed {
					reason: format!("`type` must be a string, got {other}"),
					path: path.clone(),
				})
			}
		};

		let key = match type_name {
			"null" => self.builder.push(Node::new(Type::Null)),
			"boolean" => self.builder.push(Node::new(Type::Boolean)),
			"int" => self.builder.push(Node::new(Type::Int)),
			"long" => self.builder.push(Node::new(Type::Long)),
			"float" => self.builder.push(Node::new(Type::Float)),
			"double" => self.builder.push(Node::new(Type::Double)),
			"bytes" => self.builder.push(Node::new(Type::Bytes)),
			"string" => self.builder.push(Node::new(Type::String)),
			"array" => {
				let items = obj.get("items").ok_or_else(|| JsonSchemaError::MissingField {
					field: "items",
					path: path.clone(),
				})?;
				let items = self.node(items, enclosing_namespace, &path.child("items"))?;
				self.builder.push(Node::new(Type::Array(Array { items })))
			}
			"map" => {
				let values = obj.get("values").ok_or_else(|| JsonSchemaError::MissingField {
					field: "values",
					path: path.clone(),
				})?;
				let values = self.node(values, enclosing_namespace, &path.child("values"))?;
				self.builder.push(Node::new(Type::Map(Map { values })))
			}
			"record" | "error" => self.record(obj, enclosing_namespace, path)?,
			"enum" => self.enum_(obj, enclosing_namespace, path)?,
			"fixed" => self.fixed(obj, enclosing_namespace, path)?,
			other => {
				return Err(JsonSchemaError::Malformed {
					reason: format!("unknown type `{other}`"),
					path: path.clone(),
				})
			}
		};

		if let Some(logical) = obj.get("logicalType").and_then(Value::as_str) {
			let logical_type = logical_type_from_obj(logical, obj);
			let node = self.builder_node_mut(key);
			*node = node.clone().with_logical(logical_type);
		}

		Ok(key)
	}

	fn builder_node_mut(&mut self, key: SchemaKey) -> &mut Node {
		self.builder.node_mut(key)
	}

	fn name_of(
		&self,
		obj: &serde_json::Map<String, Value>,
		enclosing_namespace: Option<&str>,
		path: &JsonPath,
	) -> Result<Name, JsonSchemaError> {
		let raw_name = obj
			.get("name")
			.and_then(Value::as_str)
			.ok_or_else(|| JsonSchemaError::MissingField {
				field: "name",
				path: path.clone(),
			})?;
		let namespace = obj.get("namespace").and_then(Value::as_str);
		Ok(qualify(raw_name, namespace, enclosing_namespace))
	}

	fn aliases_of(&self, obj: &serde_json::Map<String, Value>, namespace: Option<&str>) -> Vec<Name> {
		obj.get("aliases")
			.and_then(Value::as_array)
			.map(|arr| {
				arr.iter()
					.filter_map(Value::as_str)
					.map(|a| qualify(a, None, namespace))
					.collect()
			})
			.unwrap_or_default()
	}

	fn register_name(&mut self, name: &Name, key: SchemaKey, path: &JsonPath) -> Result<(), JsonSchemaError> {
		if self
			.names
			.insert(name.fully_qualified_name().to_owned(), key)
			.is_some()
		{
			return Err(JsonSchemaError::DuplicateName(
				name.fully_qualified_name().to_owned(),
				path.clone(),
			));
		}
		Ok(())
	}

	fn record(
		&mut self,
		obj: &serde_json::Map<String, Value>,
		enclosing_namespace: Option<&str>,
		path: &JsonPath,
	) -> Result<SchemaKey, JsonSchemaError> {
		let name = self.name_of(obj, enclosing_namespace, path)?;
		let own_namespace = name.namespace().map(str::to_owned);
		let key = self.builder.reserve();
		self.register_name(&name, key, path)?;

		let fields_value = obj.get("fields").and_then(Value::as_array).ok_or_else(|| {
			JsonSchemaError::MissingField {
				field: "fields",
				path: path.clone(),
			}
		})?;
		let mut fields = Vec::with_capacity(fields_value.len());
		for (i, field_value) in fields_value.iter().enumerate() {
			let field_path = path.child(format_args!("fields[{i}]"));
			let field_obj = field_value.as_object().ok_or_else(|| JsonSchemaError::Malformed {
				reason: "field must be a JSON object".into(),
				path: field_path.clone(),
			})?;
			let field_name = field_obj
				.get("name")
				.and_then(Value::as_str)
				.ok_or_else(|| JsonSchemaError::MissingField {
					field: "name",
					path: field_path.clone(),
				})?
				.to_owned();
			let field_type = field_obj.get("type").ok_or_else(|| JsonSchemaError::MissingField {
				field: "type",
				path: field_path.clone(),
			})?;
			let schema_key = self.node(field_type, own_namespace.as_deref(), &field_path)?;
			let default = match field_obj.get("default") {
				Some(v) => Some(self.parse_default(v, schema_key, &field_path)?),
				None => None,
			};
			let aliases = field_obj
				.get("aliases")
				.and_then(Value::as_array)
				.map(|arr| arr.iter().filter_map(Value::as_str).map(str::to_owned).collect())
				.unwrap_or_default();
			fields.push(Field {
				name: field_name,
				schema: schema_key,
				doc: field_obj.get("doc").and_then(Value::as_str).map(str::to_owned),
				default,
				aliases,
			});
		}

		self.builder.fill(
			key,
			Node::new(Type::Record(Record {
				name,
				fields,
				doc: obj.get("doc").and_then(Value::as_str).map(str::to_owned),
				aliases: self.aliases_of(obj, own_namespace.as_deref()),
			})),
		);
		Ok(key)
	}

	fn enum_(
		&mut self,
		obj: &serde_json::Map<String, Value>,
		enclosing_namespace: Option<&str>,
		path: &JsonPath,
	) -> Result<SchemaKey, JsonSchemaError> {
		let name = self.name_of(obj, enclosing_namespace, path)?;
		let own_namespace = name.namespace().map(str::to_owned);
		let symbols = obj
			.get("symbols")
			.and_then(Value::as_array)
			.ok_or_else(|| JsonSchemaError::MissingField {
				field: "symbols",
				path: path.clone(),
			})?
			.iter()
			.filter_map(Value::as_str)
			.map(str::to_owned)
			.collect();
		let key = self.builder.push(Node::new(Type::Enum(Enum {
			default_symbol: obj.get("default").and_then(Value::as_str).map(str::to_owned),
			name: name.clone(),
			symbols,
			doc: obj.get("doc").and_then(Value::as_str).map(str::to_owned),
			aliases: self.aliases_of(obj, own_namespace.as_deref()),
		})));
		self.register_name(&name, key, path)?;
		Ok(key)
	}

	fn fixed(
		&mut self,
		obj: &serde_json::Map<String, Value>,
		enclosing_namespace: Option<&str>,
		path: &JsonPath,
	) -> Result<SchemaKey, JsonSchemaError> {
		let name = self.name_of(obj, enclosing_namespace, path)?;
		let own_namespace = name.namespace().map(str::to_owned);
		let size = obj
			.get("size")
			.and_then(Value::as_u64)
			.ok_or_else(|| JsonSchemaError::MissingField {
				field: "size",
				path: path.clone(),
			})? as usize;
		let key = self.builder.push(Node::new(Type::Fixed(Fixed {
			name: name.clone(),
			size,
			doc: obj.get("doc").and_then(Value::as_str).map(str::to_owned),
			aliases: self.aliases_of(obj, own_namespace.as_deref()),
		})));
		self.register_name(&name, key, path)?;
		Ok(key)
	}

	fn parse_default(
		&self,
		value: &Value,
		schema_key: SchemaKey,
		path: &JsonPath,
	) -> Result<SchemaDefault, JsonSchemaError> {
		let node = self.builder.peek(schema_key);
		match &node.type_ {
			Type::Null => Ok(SchemaDefault::Null),
			Type::Boolean => Ok(SchemaDefault::Bool(value.as_bool().ok_or_else(|| {
				malformed("expected a JSON bool default", path)
			})?)),
			Type::Int => Ok(SchemaDefault::Int(
				value
					.as_i64()
					.ok_or_else(|| malformed("expected a JSON number default", path))? as i32,
			)),
			Type::Long => Ok(SchemaDefault::Long(
				value
					.as_i64()
					.ok_or_else(|| malformed("expected a JSON number default", path))?,
			)),
			Type::Float => Ok(SchemaDefault::Float(
				value
					.as_f64()
					.ok_or_else(|| malformed("expected a JSON number default", path))? as f32,
			)),
			Type::Double => Ok(SchemaDefault::Double(
				value
					.as_f64()
					.ok_or_else(|| malformed("expected a JSON number default", path))?,
			)),
			Type::Bytes => Ok(SchemaDefault::Bytes(
				value
					.as_str()
					.ok_or_else(|| malformed("expected a JSON string default for bytes", path))?
					.chars()
					.map(|c| c as u8)
					.collect(),
			)),
			Type::String => Ok(SchemaDefault::String(
				value
					.as_str()
					.ok_or_else(|| malformed("expected a JSON string default", path))?
					.to_owned(),
			)),
			Type::Enum(_) => Ok(SchemaDefault::Enum(
				value
					.as_str()
					.ok_or_else(|| malformed("expected a JSON string default for an enum", path))?
					.to_owned(),
			)),
			Type::Array(array) => {
				let items = value
					.as_array()
					.ok_or_else(|| malformed("expected a JSON array default", path))?;
				let mut out = Vec::with_capacity(items.len());
				for (i, item) in items.iter().enumerate() {
					out.push(self.parse_default(item, array.items, &path.child(i))?);
				}
				Ok(SchemaDefault::Array(out))
			}
			Type::Map(map) => {
				let entries = value
					.as_object()
					.ok_or_else(|| malformed("expected a JSON object default for a map", path))?;
				let mut out = Vec::with_capacity(entries.len());
				for (k, v) in entries {
					out.push((k.clone(), self.parse_default(v, map.values, &path.child(k))?));
				}
				Ok(SchemaDefault::Map(out))
			}
			Type::Union(union) => {
				let first = *union
					.branches
					.first()
					.ok_or_else(|| malformed("union has no branches to default against", path))?;
				let inner = self.parse_default(value, first, path)?;
				Ok(SchemaDefault::Union(0, Box::new(inner)))
			}
			Type::Record(record) => {
				let obj = value
					.as_object()
					.ok_or_else(|| malformed("expected a JSON object default for a record", path))?;
				// Stored as a map default keyed by field name; record-shaped
				// defaults reuse the Map variant since §3 defines a closed
				// sum without a dedicated record-default variant.
				let fields = record.fields.clone();
				let mut out = Vec::with_capacity(fields.len());
				for field in &fields {
					if let Some(v) = obj.get(&field.name) {
						out.push((field.name.clone(), self.parse_default(v, field.schema, path)?));
					}
				}
				Ok(SchemaDefault::Map(out))
			}
			Type::Fixed(fixed) => {
				let s = value
					.as_str()
					.ok_or_else(|| malformed("expected a JSON string default for fixed", path))?;
				let bytes: Vec<u8> = s.chars().map(|c| c as u8).collect();
				if bytes.len() != fixed.size {
					return Err(malformed("fixed default length does not match size", path));
				}
				Ok(SchemaDefault::Bytes(bytes))
			}
			Type::RecursivePlaceholder(_) => unreachable!(
				"recursive placeholder must be collapsed before a schema reaches JSON parsing"
			),
		}
	}
}

fn malformed(reason: &str, path: &JsonPath) -> JsonSchemaError {
	JsonSchemaError::Malformed {
		reason: reason.to_owned(),
		path: path.clone(),
	}
}

fn primitive_from_str(s: &str) -> Option<Type> {
	Some(match s {
		"null" => Type::Null,
		"boolean" => Type::Boolean,
		"int" => Type::Int,
		"long" => Type::Long,
		"float" => Type::Float,
		"double" => Type::Double,
		"bytes" => Type::Bytes,
		"string" => Type::String,
		_ => return None,
	})
}

fn logical_type_from_obj(tag: &str, obj: &serde_json::Map<String, Value>) -> LogicalType {
	match tag {
		"date" => LogicalType::Date,
		"time-millis" => LogicalType::TimeMillis,
		"time-micros" => LogicalType::TimeMicros,
		"timestamp-millis" => LogicalType::TimestampMillis,
		"timestamp-micros" => LogicalType::TimestampMicros,
		"local-timestamp-millis" => LogicalType::LocalTimestampMillis,
		"local-timestamp-micros" => LogicalType::LocalTimestampMicros,
		"uuid" => LogicalType::Uuid,
		"duration" => LogicalType::Duration,
		"decimal" => LogicalType::Decimal {
			precision: obj.get("precision").and_then(Value::as_u64).unwrap_or(0) as usize,
			scale: obj.get("scale").and_then(Value::as_u64).unwrap_or(0) as u32,
		},
		other => LogicalType::Unknown(other.to_owned()),
	}
}

/// Render a schema to its *full* JSON form: docs, aliases, and logical types
/// are preserved (unlike [`Schema::canonical_json`]). Key ordering is fixed.
///
/// Per an open question inherited from the source design, field `default`
/// values are threaded through parsing but are not re-emitted here; schemas
/// round-tripped through `print_full` lose field defaults. Round-tripping
/// defaults would require a JSON encoder for every [`SchemaDefault`] shape,
/// which is not needed by anything in this crate today.
pub fn print_full(schema: &Schema) -> String {
	let mut out = String::new();
	let mut written = vec![false; schema.nodes().len()];
	write_full(schema, schema.root(), &mut out, &mut written);
	out
}

fn write_full(schema: &Schema, key: SchemaKey, out: &mut String, written: &mut [bool]) {
	use std::fmt::Write as _;
	let node = schema.node(key);
	let logical = node.logical_type.as_ref();

	macro_rules! primitive {
		($name:literal) => {{
			match logical {
				None => out.push_str(concat!("\"", $name, "\"")),
				Some(lt) => {
					write!(out, "{{\"type\":\"{}\",\"logicalType\":\"{}\"", $name, lt.as_str()).unwrap();
					if let LogicalType::Decimal { precision, scale } = lt {
						write!(out, ",\"precision\":{precision},\"scale\":{scale}").unwrap();
					}
					out.push('}');
				}
			}
		}};
	}

	match &node.type_ {
		Type::Null => primitive!("null"),
		Type::Boolean => primitive!("boolean"),
		Type::Int => primitive!("int"),
		Type::Long => primitive!("long"),
		Type::Float => primitive!("float"),
		Type::Double => primitive!("double"),
		Type::Bytes => primitive!("bytes"),
		Type::String => primitive!("string"),
		Type::Array(array) => {
			out.push_str("{\"type\":\"array\",\"items\":");
			write_full(schema, array.items, out, written);
			out.push('}');
		}
		Type::Map(map) => {
			out.push_str("{\"type\":\"map\",\"values\":");
			write_full(schema, map.values, out, written);
			out.push('}');
		}
		Type::Union(union) => {
			out.push('[');
			for (i, &branch) in union.branches.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write_full(schema, branch, out, written);
			}
			out.push(']');
		}
		Type::Record(record) => {
			let idx = key.idx();
			if written[idx] {
				write!(out, "\"{}\"", record.name.fully_qualified_name()).unwrap();
				return;
			}
			written[idx] = true;
			write!(out, "{{\"name\":\"{}\",\"type\":\"record\"", record.name.fully_qualified_name()).unwrap();
			if let Some(doc) = &record.doc {
				write!(out, ",\"doc\":{}", serde_json::Value::String(doc.clone())).unwrap();
			}
			if !record.aliases.is_empty() {
				write_names_array(out, "aliases", &record.aliases);
			}
			out.push_str(",\"fields\":[");
			for (i, field) in record.fields.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write!(out, "{{\"name\":\"{}\",\"type\":", field.name).unwrap();
				write_full(schema, field.schema, out, written);
				if let Some(doc) = &field.doc {
					write!(out, ",\"doc\":{}", serde_json::Value::String(doc.clone())).unwrap();
				}
				out.push('}');
			}
			out.push_str("]}");
		}
		Type::Enum(enum_) => {
			let idx = key.idx();
			if written[idx] {
				write!(out, "\"{}\"", enum_.name.fully_qualified_name()).unwrap();
				return;
			}
			written[idx] = true;
			write!(out, "{{\"name\":\"{}\",\"type\":\"enum\",\"symbols\":[", enum_.name.fully_qualified_name()).unwrap();
			for (i, symbol) in enum_.symbols.iter().enumerate() {
				if i > 0 {
					out.push(',');
				}
				write!(out, "\"{symbol}\"").unwrap();
			}
			out.push(']');
			if let Some(default) = &enum_.default_symbol {
				write!(out, ",\"default\":\"{default}\"").unwrap();
			}
			out.push('}');
		}
		Type::Fixed(fixed) => {
			let idx = key.idx();
			if written[idx] {
				write!(out, "\"{}\"", fixed.name.fully_qualified_name()).unwrap();
				return;
			}
			written[idx] = true;
			write!(
				out,
				"{{\"name\":\"{}\",\"type\":\"fixed\",\"size\":{}",
				fixed.name.fully_qualified_name(),
				fixed.size
			)
			.unwrap();
			if let Some(lt) = logical {
				write!(out, ",\"logicalType\":\"{}\"", lt.as_str()).unwrap();
			}
			out.push('}');
		}
		Type::RecursivePlaceholder(_) => unreachable!(
			"recursive placeholder must be collapsed before a schema reaches JSON printing"
		),
	}
}

fn write_names_array(out: &mut String, field: &str, names: &[Name]) {
	use std::fmt::Write as _;
	write!(out, ",\"{field}\":[").unwrap();
	for (i, name) in names.iter().enumerate() {
		if i > 0 {
			out.push(',');
		}
		write!(out, "\"{}\"", name.fully_qualified_name()).unwrap();
	}
	out.push(']');
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_simple_record() {
		let schema: Schema = r#"
		{
			"namespace": "test",
			"type": "record",
			"name": "Test",
			"fields": [
				{ "type": "string", "name": "field" }
			]
		}"#
		.parse()
		.unwrap();
		let record = match &schema.node(schema.root()).type_ {
			Type::Record(r) => r,
			_ => panic!("expected record"),
		};
		assert_eq!(record.name.fully_qualified_name(), "test.Test");
		assert_eq!(record.fields[0].name, "field");
	}

	#[test]
	fn parses_self_referential_record() {
		let schema: Schema = r#"
		{
			"type": "record",
			"name": "LinkedList",
			"fields": [
				{ "name": "value", "type": "int" },
				{ "name": "next", "type": ["null", "LinkedList"] }
			]
		}"#
		.parse()
		.unwrap();
		schema.validate().unwrap();
	}

	#[test]
	fn unknown_reference_is_an_error() {
		let result: Result<Schema, _> = r#"["null", "DoesNotExist"]"#.parse();
		assert!(matches!(result, Err(JsonSchemaError::UnknownReference(..))));
	}

	#[test]
	fn namespace_propagates_to_nested_anonymous_types_and_reverts_on_exit() {
		let schema: Schema = r#"
		{
			"type": "record",
			"name": "Outer",
			"namespace": "ns",
			"fields": [
				{ "name": "inner", "type": { "type": "record", "name": "Inner", "fields": [{"name": "x", "type": "int"}] } },
				{ "name": "tag", "type": { "type": "enum", "name": "Tag", "symbols": ["A"] } }
			]
		}"#
		.parse()
		.unwrap();
		let names: Vec<_> = schema
			.nodes()
			.iter()
			.filter_map(|n| n.name())
			.map(|n| n.fully_qualified_name().to_owned())
			.collect();
		assert!(names.contains(&"ns.Outer".to_owned()));
		assert!(names.contains(&"ns.Inner".to_owned()));
		assert!(names.contains(&"ns.Tag".to_owned()));
	}

	#[test]
	fn logical_type_on_long_round_trips_through_full_printer() {
		let schema: Schema = r#"{"type": "long", "logicalType": "timestamp-millis"}"#
			.parse()
			.unwrap();
		assert_eq!(
			schema.node(schema.root()).logical_type,
			Some(LogicalType::TimestampMillis)
		);
		let printed = print_full(&schema);
		let reparsed: Schema = printed.parse().unwrap();
		assert_eq!(
			reparsed.node(reparsed.root()).logical_type,
			Some(LogicalType::TimestampMillis)
		);
	}

	#[test]
	fn field_default_for_missing_writer_field() {
		let schema: Schema = r#"
		{
			"type": "record",
			"name": "Person",
			"fields": [
				{ "name": "name", "type": "string" },
				{ "name": "age", "type": "int", "default": 0 }
			]
		}"#
		.parse()
		.unwrap();
		let record = match &schema.node(schema.root()).type_ {
			Type::Record(r) => r,
			_ => panic!(),
		};
		assert_eq!(record.fields[1].default, Some(SchemaDefault::Int(0)));
	}
}
