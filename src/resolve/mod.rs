//! The schema resolver (§4.4 "Schema resolver (deconflict)").
//!
//! [`resolve`] takes a `(reader, writer)` schema pair and fuses them into a
//! [`ReadPlan`]: a parallel tree to [`Schema`] whose leaves already carry the
//! promotion (or lack of one) a decoder needs to apply, and whose records
//! already know which writer fields to keep, drop, or default-fill. The plan
//! is computed once per schema pair and can then decode any number of
//! records without repeating the compatibility analysis.

pub mod decode;

use crate::schema::{Name, Schema, SchemaKey, Type};
use crate::value::Value;
use std::collections::HashMap;

pub use decode::decode_with_schemas;

/// A read plan: parallel to [`Schema`], but every leaf already knows how the
/// writer's wire representation maps onto the reader's target type (§3 "Read
/// plan").
#[derive(Clone, Debug, PartialEq)]
pub enum ReadPlan {
	Null,
	Bool,
	Int,
	IntAsLong,
	IntAsFloat,
	IntAsDouble,
	Long,
	LongAsFloat,
	LongAsDouble,
	Float,
	FloatAsDouble,
	Double,
	Bytes,
	String,
	Fixed { name: Name, size: usize },
	Array(Box<ReadPlan>),
	Map(Box<ReadPlan>),
	Record(RecordPlan),
	Enum(EnumPlan),
	/// Writer and reader are both unions: per writer branch, the reader
	/// branch it resolves against plus the sub-plan.
	Union(Vec<(usize, ReadPlan)>),
	/// Writer is a union but the reader is not: every writer branch
	/// independently resolves to the reader's (single) type, so decode
	/// unwraps the branch rather than emitting a `Value::Union`.
	UnionUnwrap(Vec<ReadPlan>),
	/// Writer is not a union but the reader is: the decoded value is wrapped
	/// at the named reader branch.
	AsUnion(usize, Box<ReadPlan>),
	/// Placeholder for a recursive reference back to a named type already
	/// being resolved higher up the descent. Never seen by [`decode`] except
	/// as a genuine cycle — and even then only through a container, never
	/// directly, since a type cannot recurse through itself with no
	/// indirection.
	NamedRef(Name),
}

/// A single writer field's place in a [`RecordPlan`].
#[derive(Clone, Debug, PartialEq)]
pub struct FieldPlan {
	/// The writer's field name (decode walks writer fields in writer order).
	pub writer_name: String,
	/// How to decode the writer's wire representation of this field.
	pub plan: ReadPlan,
	/// Position of the corresponding field among the reader's fields, in the
	/// reader's declared order. `None` means this writer field has no reader
	/// counterpart: still decoded (to stay in sync with the wire), then
	/// discarded.
	pub reader_position: Option<usize>,
}

/// A reader field absent from the writer, filled from its default (§4.4,
/// §4.5 "Append default-lifted entries at the end").
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultPlan {
	pub reader_position: usize,
	pub name: String,
	pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordPlan {
	pub name: Name,
	/// Fields in writer order, interleaved with the reader positions they
	/// fill (or `None` for decode-and-discard).
	pub fields: Vec<FieldPlan>,
	/// Reader-only fields, each filled from its schema default.
	pub defaults: Vec<DefaultPlan>,
	/// Field names in reader declaration order, for assembling the final
	/// `Value::Record` in reader order.
	pub reader_field_names: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumPlan {
	pub name: Name,
	pub reader_symbols: Vec<String>,
	/// Indexed by writer symbol position; value is the reader symbol index.
	pub symbol_map: Vec<usize>,
}

/// A single resolution failure (§4.4 "Error taxonomy").
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
	#[error("reader `{reader}` cannot read writer `{writer}`")]
	TypeMismatch { reader: String, writer: String },
	#[error("record `{record}` field `{field}` is missing from the writer and has no default")]
	MissingField { record: String, field: String },
	#[error("record `{record}` field `{field}` schemas do not resolve")]
	FieldMismatch { record: String, field: String },
	#[error("no reader union branch resolves against writer union in `{name}`")]
	MissingUnionBranch { name: String },
	#[error("writer enum symbol `{symbol}` has no reader equivalent and no default symbol")]
	MissingSymbol { symbol: String },
	#[error("fixed `{name}` size mismatch: reader={reader_size}, writer={writer_size}")]
	FixedSizeMismatch {
		name: String,
		reader_size: usize,
		writer_size: usize,
	},
	#[error("named type `{name}` could not be resolved")]
	NamedTypeUnresolved { name: String },
}

/// Writer fullname → reader name, entered on first descent into a named
/// type's body so a recursive reference is resolved as a [`ReadPlan::NamedRef`]
/// rather than re-walked (and potentially looping forever).
type NamedEnv = HashMap<String, Name>;

/// Resolve a `(reader, writer)` schema pair into a [`ReadPlan`] (§4.4).
pub fn resolve(reader: &Schema, writer: &Schema) -> Result<ReadPlan, ResolutionError> {
	let mut env = NamedEnv::new();
	resolve_node(reader, reader.root(), writer, writer.root(), &mut env)
}

fn type_label(schema: &Schema, key: SchemaKey) -> String {
	match &schema.node(key).type_ {
		Type::Null => "null".to_owned(),
		Type::Boolean => "boolean".to_owned(),
		Type::Int => "int".to_owned(),
		Type::Long => "long".to_owned(),
		Type::Float => "float".to_owned(),
		Type::Double => "double".to_owned(),
		Type::Bytes => "bytes".to_owned(),
		Type::String => "string".to_owned(),
		Type::Array(_) => "array".to_owned(),
		Type::Map(_) => "map".to_owned(),
		Type::Union(_) => "union".to_owned(),
		Type::Record(r) => r.name.fully_qualified_name().to_owned(),
		Type::Enum(e) => e.name.fully_qualified_name().to_owned(),
		Type::Fixed(f) => f.name.fully_qualified_name().to_owned(),
		Type::RecursivePlaceholder(_) => {
			unreachable!("a schema handed to the resolver never carries a recursive placeholder")
		}
	}
}

fn name_compatible(reader_name: &Name, writer_name: &Name, reader_aliases: &[Name]) -> bool {
	if reader_name.name() == writer_name.name() {
		return true;
	}
	let writer_fullname = writer_name.fully_qualified_name();
	reader_aliases
		.iter()
		.any(|alias| alias.fully_qualified_name() == writer_fullname)
}

fn resolve_node(
	reader: &Schema,
	rk: SchemaKey,
	writer: &Schema,
	wk: SchemaKey,
	env: &mut NamedEnv,
) -> Result<ReadPlan, ResolutionError> {
	let reader_node = reader.node(rk);
	let writer_node = writer.node(wk);

	// Union handling takes priority over everything else, per §4.4's three
	// cases.
	if let Type::Union(writer_union) = &writer_node.type_ {
		if let Type::Union(reader_union) = &reader_node.type_ {
			let reader_branches = reader_union.branches.clone();
			let writer_branches = writer_union.branches.clone();
			let mut resolved = Vec::with_capacity(writer_branches.len());
			for &wb in &writer_branches {
				let mut found = None;
				for (ridx, &rb) in reader_branches.iter().enumerate() {
					let mut trial_env = env.clone();
					if let Ok(plan) = resolve_node(reader, rb, writer, wb, &mut trial_env) {
						found = Some((ridx, plan));
						*env = trial_env;
						break;
					}
				}
				match found {
					Some(entry) => resolved.push(entry),
					None => {
						return Err(ResolutionError::MissingUnionBranch {
							name: type_label(writer, wb),
						})
					}
				}
			}
			return Ok(ReadPlan::Union(resolved));
		}
		let writer_branches = writer_union.branches.clone();
		let mut resolved = Vec::with_capacity(writer_branches.len());
		for &wb in &writer_branches {
			resolved.push(resolve_node(reader, rk, writer, wb, env)?);
		}
		return Ok(ReadPlan::UnionUnwrap(resolved));
	}
	if let Type::Union(reader_union) = &reader_node.type_ {
		let reader_branches = reader_union.branches.clone();
		for (ridx, &rb) in reader_branches.iter().enumerate() {
			let mut trial_env = env.clone();
			if let Ok(plan) = resolve_node(reader, rb, writer, wk, &mut trial_env) {
				*env = trial_env;
				return Ok(ReadPlan::AsUnion(ridx, Box::new(plan)));
			}
		}
		return Err(ResolutionError::MissingUnionBranch {
			name: type_label(writer, wk),
		});
	}

	match (&reader_node.type_, &writer_node.type_) {
		(Type::Null, Type::Null) => Ok(ReadPlan::Null),
		(Type::Boolean, Type::Boolean) => Ok(ReadPlan::Bool),
		(Type::Int, Type::Int) => Ok(ReadPlan::Int),
		(Type::Long, Type::Int) => Ok(ReadPlan::IntAsLong),
		(Type::Float, Type::Int) => Ok(ReadPlan::IntAsFloat),
		(Type::Double, Type::Int) => Ok(ReadPlan::IntAsDouble),
		(Type::Long, Type::Long) => Ok(ReadPlan::Long),
		(Type::Float, Type::Long) => Ok(ReadPlan::LongAsFloat),
		(Type::Double, Type::Long) => Ok(ReadPlan::LongAsDouble),
		(Type::Float, Type::Float) => Ok(ReadPlan::Float),
		(Type::Double, Type::Float) => Ok(ReadPlan::FloatAsDouble),
		(Type::Double, Type::Double) => Ok(ReadPlan::Double),
		(Type::Bytes, Type::Bytes) | (Type::Bytes, Type::String) => Ok(ReadPlan::Bytes),
		(Type::String, Type::String) | (Type::String, Type::Bytes) => Ok(ReadPlan::String),

		(Type::Array(ra), Type::Array(wa)) => {
			let inner = resolve_node(reader, ra.items, writer, wa.items, env)?;
			Ok(ReadPlan::Array(Box::new(inner)))
		}
		(Type::Map(rm), Type::Map(wm)) => {
			let inner = resolve_node(reader, rm.values, writer, wm.values, env)?;
			Ok(ReadPlan::Map(Box::new(inner)))
		}

		(Type::Record(r), Type::Record(w)) => {
			let writer_fullname = w.name.fully_qualified_name().to_owned();
			if let Some(reader_name) = env.get(&writer_fullname) {
				return Ok(ReadPlan::NamedRef(reader_name.clone()));
			}
			if !name_compatible(&r.name, &w.name, &r.aliases) {
				return Err(ResolutionError::TypeMismatch {
					reader: type_label(reader, rk),
					writer: type_label(writer, wk),
				});
			}
			env.insert(writer_fullname, r.name.clone());

			let mut pending: Vec<usize> = (0..r.fields.len()).collect();
			let mut fields = Vec::with_capacity(w.fields.len());
			for wf in &w.fields {
				let match_idx = pending
					.iter()
					.position(|&ridx| field_name_compatible(&r.fields[ridx], &wf.name));
				match match_idx {
					Some(pos) => {
						let ridx = pending.remove(pos);
						let rf = &r.fields[ridx];
						let plan = resolve_node(reader, rf.schema, writer, wf.schema, env).map_err(|_| {
							ResolutionError::FieldMismatch {
								record: r.name.fully_qualified_name().to_owned(),
								field: rf.name.clone(),
							}
						})?;
						fields.push(FieldPlan {
							writer_name: wf.name.clone(),
							plan,
							reader_position: Some(ridx),
						});
					}
					None => {
						// Decode-and-discard: resolve the writer field
						// against itself so the wire bytes are still
						// consumed correctly. Scratch copy of `env` so a
						// self-referential discarded field can't shadow the
						// real reader's named-type mapping.
						let mut discard_env = env.clone();
						let plan = resolve_node(writer, wf.schema, writer, wf.schema, &mut discard_env)?;
						fields.push(FieldPlan {
							writer_name: wf.name.clone(),
							plan,
							reader_position: None,
						});
					}
				}
			}

			let mut defaults = Vec::with_capacity(pending.len());
			for ridx in pending {
				let rf = &r.fields[ridx];
				let default = rf.default.as_ref().ok_or_else(|| ResolutionError::MissingField {
					record: r.name.fully_qualified_name().to_owned(),
					field: rf.name.clone(),
				})?;
				defaults.push(DefaultPlan {
					reader_position: ridx,
					name: rf.name.clone(),
					value: Value::lift_default(reader, rf.schema, default),
				});
			}

			Ok(ReadPlan::Record(RecordPlan {
				name: r.name.clone(),
				fields,
				defaults,
				reader_field_names: r.fields.iter().map(|f| f.name.clone()).collect(),
			}))
		}

		(Type::Enum(r), Type::Enum(w)) => {
			if !name_compatible(&r.name, &w.name, &r.aliases) {
				return Err(ResolutionError::TypeMismatch {
					reader: type_label(reader, rk),
					writer: type_label(writer, wk),
				});
			}
			let mut symbol_map = Vec::with_capacity(w.symbols.len());
			for symbol in &w.symbols {
				let found = r.symbols.iter().position(|s| s == symbol);
				let idx = match found {
					Some(idx) => idx,
					None => {
						let default_idx = r
							.default_symbol
							.as_ref()
							.and_then(|d| r.symbols.iter().position(|s| s == d));
						default_idx.ok_or_else(|| ResolutionError::MissingSymbol {
							symbol: symbol.clone(),
						})?
					}
				};
				symbol_map.push(idx);
			}
			Ok(ReadPlan::Enum(EnumPlan {
				name: r.name.clone(),
				reader_symbols: r.symbols.clone(),
				symbol_map,
			}))
		}

		(Type::Fixed(r), Type::Fixed(w)) => {
			if !name_compatible(&r.name, &w.name, &r.aliases) {
				return Err(ResolutionError::TypeMismatch {
					reader: type_label(reader, rk),
					writer: type_label(writer, wk),
				});
			}
			if r.size != w.size {
				return Err(ResolutionError::FixedSizeMismatch {
					name: r.name.fully_qualified_name().to_owned(),
					reader_size: r.size,
					writer_size: w.size,
				});
			}
			Ok(ReadPlan::Fixed {
				name: r.name.clone(),
				size: r.size,
			})
		}

		_ => Err(ResolutionError::TypeMismatch {
			reader: type_label(reader, rk),
			writer: type_label(writer, wk),
		}),
	}
}

fn field_name_compatible(reader_field: &crate::schema::Field, writer_name: &str) -> bool {
	reader_field.name == writer_name
		|| reader_field.aliases.iter().any(|alias| alias == writer_name)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::{Array, Enum, Field, Fixed, Node, Record, SchemaBuilder, Type, Union};

	fn primitive(type_: Type) -> Schema {
		let mut b = SchemaBuilder::new();
		b.push(Node::new(type_));
		b.build().unwrap()
	}

	#[test]
	fn identical_primitives_resolve_to_identity() {
		let schema = primitive(Type::Int);
		assert_eq!(resolve(&schema, &schema), Ok(ReadPlan::Int));
	}

	#[test]
	fn int_promotes_to_long_float_double() {
		let int = primitive(Type::Int);
		assert_eq!(resolve(&primitive(Type::Long), &int), Ok(ReadPlan::IntAsLong));
		assert_eq!(resolve(&primitive(Type::Float), &int), Ok(ReadPlan::IntAsFloat));
		assert_eq!(resolve(&primitive(Type::Double), &int), Ok(ReadPlan::IntAsDouble));
	}

	#[test]
	fn long_does_not_demote_to_int() {
		let err = resolve(&primitive(Type::Int), &primitive(Type::Long)).unwrap_err();
		assert!(matches!(err, ResolutionError::TypeMismatch { .. }));
	}

	#[test]
	fn bytes_and_string_are_mutually_promotable() {
		assert_eq!(
			resolve(&primitive(Type::String), &primitive(Type::Bytes)),
			Ok(ReadPlan::String)
		);
		assert_eq!(
			resolve(&primitive(Type::Bytes), &primitive(Type::String)),
			Ok(ReadPlan::Bytes)
		);
	}

	#[test]
	fn array_resolves_element_recursively() {
		let mut rb = SchemaBuilder::new();
		let ritems = rb.push(Node::new(Type::Long));
		rb.push(Node::new(Type::Array(Array { items: ritems })));
		let reader = rb.build().unwrap();

		let mut wb = SchemaBuilder::new();
		let witems = wb.push(Node::new(Type::Int));
		wb.push(Node::new(Type::Array(Array { items: witems })));
		let writer = wb.build().unwrap();

		assert_eq!(
			resolve(&reader, &writer),
			Ok(ReadPlan::Array(Box::new(ReadPlan::IntAsLong)))
		);
	}

	#[test]
	fn missing_reader_field_uses_default() {
		let mut wb = SchemaBuilder::new();
		let wa = wb.push(Node::new(Type::Int));
		wb.push(Node::new(Type::Record(Record {
			name: Name::from_fully_qualified_name("R"),
			fields: vec![Field {
				name: "a".into(),
				schema: wa,
				doc: None,
				default: None,
				aliases: vec![],
			}],
			doc: None,
			aliases: vec![],
		})));
		let writer = wb.build().unwrap();

		let mut rb = SchemaBuilder::new();
		let ra = rb.push(Node::new(Type::Int));
		let rb_field = rb.push(Node::new(Type::Int));
		rb.push(Node::new(Type::Record(Record {
			name: Name::from_fully_qualified_name("R"),
			fields: vec![
				Field {
					name: "a".into(),
					schema: ra,
					doc: None,
					default: None,
					aliases: vec![],
				},
				Field {
					name: "b".into(),
					schema: rb_field,
					doc: None,
					default: Some(crate::schema::Default::Int(7)),
					aliases: vec![],
				},
			],
			doc: None,
			aliases: vec![],
		})));
		let reader = rb.build().unwrap();

		let plan = resolve(&reader, &writer).unwrap();
		match plan {
			ReadPlan::Record(record_plan) => {
				assert_eq!(record_plan.fields.len(), 1);
				assert_eq!(record_plan.fields[0].reader_position, Some(0));
				assert_eq!(record_plan.defaults.len(), 1);
				assert_eq!(record_plan.defaults[0].name, "b");
				assert_eq!(record_plan.defaults[0].value, Value::Int(7));
			}
			other => panic!("expected a record plan, got {other:?}"),
		}
	}

	#[test]
	fn missing_reader_field_without_default_is_an_error() {
		let mut wb = SchemaBuilder::new();
		wb.push(Node::new(Type::Record(Record {
			name: Name::from_fully_qualified_name("R"),
			fields: vec![],
			doc: None,
			aliases: vec![],
		})));
		// A record needs >=1 field to validate, so build unchecked here.
		let writer = wb.build_unchecked();

		let mut rb = SchemaBuilder::new();
		let ra = rb.push(Node::new(Type::Int));
		rb.push(Node::new(Type::Record(Record {
			name: Name::from_fully_qualified_name("R"),
			fields: vec![Field {
				name: "a".into(),
				schema: ra,
				doc: None,
				default: None,
				aliases: vec![],
			}],
			doc: None,
			aliases: vec![],
		})));
		let reader = rb.build().unwrap();

		let err = resolve(&reader, &writer).unwrap_err();
		assert_eq!(
			err,
			ResolutionError::MissingField {
				record: "R".into(),
				field: "a".into(),
			}
		);
	}

	#[test]
	fn enum_symbol_reorder_resolves_by_name() {
		let mut wb = SchemaBuilder::new();
		wb.push(Node::new(Type::Enum(Enum {
			name: Name::from_fully_qualified_name("Suit"),
			symbols: vec!["SPADES".into(), "HEARTS".into()],
			doc: None,
			default_symbol: None,
			aliases: vec![],
		})));
		let writer = wb.build().unwrap();

		let mut rb = SchemaBuilder::new();
		rb.push(Node::new(Type::Enum(Enum {
			name: Name::from_fully_qualified_name("Suit"),
			symbols: vec!["HEARTS".into(), "SPADES".into()],
			doc: None,
			default_symbol: None,
			aliases: vec![],
		})));
		let reader = rb.build().unwrap();

		let plan = resolve(&reader, &writer).unwrap();
		match plan {
			ReadPlan::Enum(enum_plan) => assert_eq!(enum_plan.symbol_map, vec![1, 0]),
			other => panic!("expected an enum plan, got {other:?}"),
		}
	}

	#[test]
	fn fixed_size_mismatch_is_a_distinct_error() {
		let mut wb = SchemaBuilder::new();
		wb.push(Node::new(Type::Fixed(Fixed {
			name: Name::from_fully_qualified_name("Md5"),
			size: 16,
			doc: None,
			aliases: vec![],
		})));
		let writer = wb.build().unwrap();

		let mut rb = SchemaBuilder::new();
		rb.push(Node::new(Type::Fixed(Fixed {
			name: Name::from_fully_qualified_name("Md5"),
			size: 8,
			doc: None,
			aliases: vec![],
		})));
		let reader = rb.build().unwrap();

		let err = resolve(&reader, &writer).unwrap_err();
		assert_eq!(
			err,
			ResolutionError::FixedSizeMismatch {
				name: "Md5".into(),
				reader_size: 8,
				writer_size: 16,
			}
		);
	}

	#[test]
	fn int_writer_promotes_into_long_reader_union() {
		let writer = primitive(Type::Int);

		let mut rb = SchemaBuilder::new();
		let null = rb.push(Node::new(Type::Null));
		let long = rb.push(Node::new(Type::Long));
		rb.push(Node::new(Type::Union(Union {
			branches: vec![null, long],
		})));
		let reader = rb.build().unwrap();

		assert_eq!(
			resolve(&reader, &writer),
			Ok(ReadPlan::AsUnion(1, Box::new(ReadPlan::IntAsLong)))
		);
	}
}
