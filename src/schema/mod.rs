//! The in-memory Avro schema tree: construction, validation, names, and
//! logical types.
//!
//! A [`Schema`] is an arena of [`Node`]s addressed by [`SchemaKey`], the same
//! representation the teacher crate uses for its `SchemaMut` (a possibly
//! cyclic directed graph is the only representation that can express Avro's
//! named-type back-references without duplicating subtrees). Index `0` is
//! always the root.

pub mod canonical;
pub mod json;

use std::fmt;

/// An Avro schema: an arena of [`Node`]s, rooted at index `0`.
///
/// Schemas are immutable once built; mutate via [`SchemaBuilder`] and then
/// [`SchemaBuilder::build`].
#[derive(Clone, Debug)]
pub struct Schema {
	nodes: Vec<Node>,
}

impl Schema {
	/// The root node of the schema.
	pub fn root(&self) -> SchemaKey {
		SchemaKey(0)
	}

	/// Look up a node by key.
	///
	/// # Panics
	/// If `key` does not belong to this schema.
	pub fn node(&self, key: SchemaKey) -> &Node {
		&self.nodes[key.0]
	}

	/// All nodes in arena order. Index `0` is the root.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Validate every invariant from the data model: record/enum arity,
	/// unique and valid names, fixed size, union distinctness and
	/// non-nesting, and named-type redefinition.
	///
	/// Returns the first violation found; this function does not collect
	/// multiple errors.
	pub fn validate(&self) -> Result<(), SchemaError> {
		let mut named_types: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
		for (idx, node) in self.nodes.iter().enumerate() {
			if let Some(name) = node.name() {
				let fqn = name.fully_qualified_name().to_owned();
				match named_types.get(&fqn) {
					Some(&existing) if existing != idx => {
						return Err(SchemaError::new(format!(
							"named type `{fqn}` is redefined at two different schema nodes"
						)))
					}
					_ => {
						named_types.insert(fqn, idx);
					}
				}
			}
			self.validate_node(node)?;
		}
		Ok(())
	}

	fn validate_node(&self, node: &Node) -> Result<(), SchemaError> {
		match &node.type_ {
			Type::Record(record) => {
				if record.fields.is_empty() {
					return Err(SchemaError::new(format!(
						"record `{}` must have at least one field",
						record.name.fully_qualified_name()
					)));
				}
				let mut seen = std::collections::HashSet::new();
				for field in &record.fields {
					if !is_valid_identifier(&field.name) {
						return Err(SchemaError::new(format!(
							"field name `{}` is not a valid Avro identifier",
							field.name
						)));
					}
					if !seen.insert(field.name.as_str()) {
						return Err(SchemaError::new(format!(
							"record `{}` has duplicate field name `{}`",
							record.name.fully_qualified_name(),
							field.name
						)));
					}
				}
				if !is_valid_identifier(record.name.name()) {
					return Err(SchemaError::new(format!(
						"record name `{}` is not a valid Avro identifier",
						record.name.name()
					)));
				}
			}
			Type::Enum(enum_) => {
				if enum_.symbols.is_empty() {
					return Err(SchemaError::new(format!(
						"enum `{}` must have at least one symbol",
						enum_.name.fully_qualified_name()
					)));
				}
				let mut seen = std::collections::HashSet::new();
				for symbol in &enum_.symbols {
					if !is_valid_identifier(symbol) {
						return Err(SchemaError::new(format!(
							"enum symbol `{symbol}` is not a valid Avro identifier"
						)));
					}
					if !seen.insert(symbol.as_str()) {
						return Err(SchemaError::new(format!(
							"enum `{}` has duplicate symbol `{symbol}`",
							enum_.name.fully_qualified_name()
						)));
					}
				}
			}
			Type::Fixed(fixed) => {
				if fixed.size == 0 {
					return Err(SchemaError::new(format!(
						"fixed `{}` must have a size greater than 0",
						fixed.name.fully_qualified_name()
					)));
				}
			}
			Type::Union(union) => {
				let mut seen_keys = std::collections::HashSet::new();
				for &branch in &union.branches {
					let branch_node = &self.nodes[branch.0];
					if matches!(branch_node.type_, Type::Union(_)) {
						return Err(SchemaError::new("unions may not directly nest unions"));
					}
					let type_key = branch_node.type_key();
					if !seen_keys.insert(type_key) {
						return Err(SchemaError::new(format!(
							"union has two branches of type key `{type_key}`"
						)));
					}
				}
			}
			_ => {}
		}
		Ok(())
	}

	/// Rewrite every direct reference to `from` into `to`, then reset the
	/// `from` node itself to `Null` (it becomes unreachable, and an
	/// unreachable node never affects `canonical_json`, `validate`, or
	/// decoding, all of which only walk from the root). Used by
	/// [`crate::codec::recursive`] once the real root of a recursive codec
	/// is known, to collapse its placeholder occurrences into a true
	/// self-reference.
	pub(crate) fn collapse_placeholder(&mut self, from: SchemaKey, to: SchemaKey) {
		for node in &mut self.nodes {
			match &mut node.type_ {
				Type::Array(a) => {
					if a.items == from {
						a.items = to;
					}
				}
				Type::Map(m) => {
					if m.values == from {
						m.values = to;
					}
				}
				Type::Union(u) => {
					for branch in &mut u.branches {
						if *branch == from {
							*branch = to;
						}
					}
				}
				Type::Record(r) => {
					for field in &mut r.fields {
						if field.schema == from {
							field.schema = to;
						}
					}
				}
				_ => {}
			}
		}
		self.nodes[from.idx()] = Node::new(Type::Null);
	}
}

/// A location of a [`Node`] inside a [`Schema`]'s arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaKey(usize);

impl SchemaKey {
	/// The root of any schema is always index `0`.
	pub const fn root() -> Self {
		Self(0)
	}

	/// Build a key from a raw arena index.
	pub const fn from_idx(idx: usize) -> Self {
		Self(idx)
	}

	/// The raw arena index this key refers to.
	pub const fn idx(self) -> usize {
		self.0
	}
}

impl fmt::Debug for SchemaKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SchemaKey({})", self.0)
	}
}

/// A node of the schema arena.
#[derive(Clone, Debug)]
pub struct Node {
	/// The underlying Avro type.
	pub type_: Type,
	/// Logical type tag, if any. Only meaningful on `int`, `long`, `bytes`,
	/// `string`, and `fixed`; a no-op elsewhere (see [`Schema`] builder
	/// helpers).
	pub logical_type: Option<LogicalType>,
}

impl Node {
	/// A node with no logical type.
	pub fn new(type_: Type) -> Self {
		Self {
			type_,
			logical_type: None,
		}
	}

	/// The fully qualified name, for named types.
	pub fn name(&self) -> Option<&Name> {
		match &self.type_ {
			Type::Record(r) => Some(&r.name),
			Type::Enum(e) => Some(&e.name),
			Type::Fixed(f) => Some(&f.name),
			_ => None,
		}
	}

	/// A discriminant used for union-branch distinctness: primitives and
	/// containers key on their tag, named types key on their fullname.
	pub(crate) fn type_key(&self) -> TypeKey {
		match &self.type_ {
			Type::Null => TypeKey::Primitive("null"),
			Type::Boolean => TypeKey::Primitive("boolean"),
			Type::Int => TypeKey::Primitive("int"),
			Type::Long => TypeKey::Primitive("long"),
			Type::Float => TypeKey::Primitive("float"),
			Type::Double => TypeKey::Primitive("double"),
			Type::Bytes => TypeKey::Primitive("bytes"),
			Type::String => TypeKey::Primitive("string"),
			Type::Array(_) => TypeKey::Primitive("array"),
			Type::Map(_) => TypeKey::Primitive("map"),
			Type::Union(_) => TypeKey::Primitive("union"),
			Type::Record(r) => TypeKey::Named(r.name.fully_qualified_name().to_owned()),
			Type::Enum(e) => TypeKey::Named(e.name.fully_qualified_name().to_owned()),
			Type::Fixed(f) => TypeKey::Named(f.name.fully_qualified_name().to_owned()),
			Type::RecursivePlaceholder(id) => TypeKey::Named(format!("$recursive{}", id.0)),
		}
	}

	/// Attach a logical type tag. No-op unless `type_` is one of the four
	/// annotatable primitives or a fixed.
	pub fn with_logical(mut self, logical: LogicalType) -> Self {
		if matches!(
			self.type_,
			Type::Int | Type::Long | Type::Bytes | Type::String | Type::Fixed(_)
		) {
			self.logical_type = Some(logical);
		}
		self
	}
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) enum TypeKey {
	Primitive(&'static str),
	Named(String),
}

impl fmt::Display for TypeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TypeKey::Primitive(p) => f.write_str(p),
			TypeKey::Named(n) => f.write_str(n),
		}
	}
}

/// The underlying Avro type of a [`Node`].
#[derive(Clone, Debug)]
pub enum Type {
	Null,
	Boolean,
	Int,
	Long,
	Float,
	Double,
	Bytes,
	String,
	Array(Array),
	Map(Map),
	Union(Union),
	Record(Record),
	Enum(Enum),
	Fixed(Fixed),
	/// Internal bookkeeping for [`crate::codec::recursive`]: a stand-in for
	/// "the schema currently under construction, at its own root". Always
	/// collapsed into a real reference before a [`Schema`] is handed back to
	/// a caller; never observed outside this crate.
	RecursivePlaceholder(RecursiveId),
}

/// Identity of a single [`crate::codec::recursive`] call, so that collapsing
/// one recursive codec's placeholder nodes can't accidentally catch another
/// nested recursive codec's placeholders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecursiveId(pub(crate) u64);

/// An `array` schema node: the key of the element schema.
#[derive(Clone, Debug)]
pub struct Array {
	pub items: SchemaKey,
}

/// A `map` schema node: the key of the value schema (keys are always
/// strings).
#[derive(Clone, Debug)]
pub struct Map {
	pub values: SchemaKey,
}

/// A `union` schema node: the ordered branch schemas.
#[derive(Clone, Debug)]
pub struct Union {
	pub branches: Vec<SchemaKey>,
}

/// A `record` schema node.
#[derive(Clone, Debug)]
pub struct Record {
	pub name: Name,
	pub fields: Vec<Field>,
	pub doc: Option<String>,
	pub aliases: Vec<Name>,
}

/// A field of a [`Record`].
#[derive(Clone, Debug)]
pub struct Field {
	pub name: String,
	pub schema: SchemaKey,
	pub doc: Option<String>,
	pub default: Option<Default>,
	pub aliases: Vec<String>,
}

/// An `enum` schema node.
#[derive(Clone, Debug)]
pub struct Enum {
	pub name: Name,
	pub symbols: Vec<String>,
	pub doc: Option<String>,
	pub default_symbol: Option<String>,
	pub aliases: Vec<Name>,
}

/// A `fixed` schema node.
#[derive(Clone, Debug)]
pub struct Fixed {
	pub name: Name,
	pub size: usize,
	pub doc: Option<String>,
	pub aliases: Vec<Name>,
}

/// A schema-level default literal (§3 "Default").
#[derive(Clone, Debug, PartialEq)]
pub enum Default {
	Null,
	Bool(bool),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	Bytes(Vec<u8>),
	String(String),
	Enum(String),
	Array(Vec<Default>),
	Map(Vec<(String, Default)>),
	Union(usize, Box<Default>),
}

/// Logical type tags (§6).
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum LogicalType {
	Date,
	TimeMillis,
	TimeMicros,
	TimestampMillis,
	TimestampMicros,
	LocalTimestampMillis,
	LocalTimestampMicros,
	Decimal { precision: usize, scale: u32 },
	Uuid,
	Duration,
	/// A logical type this library does not specifically model; carries the
	/// raw tag string through JSON round trips untouched.
	Unknown(String),
}

impl LogicalType {
	/// The tag string as it appears in schema JSON.
	pub fn as_str(&self) -> &str {
		match self {
			LogicalType::Date => "date",
			LogicalType::TimeMillis => "time-millis",
			LogicalType::TimeMicros => "time-micros",
			LogicalType::TimestampMillis => "timestamp-millis",
			LogicalType::TimestampMicros => "timestamp-micros",
			LogicalType::LocalTimestampMillis => "local-timestamp-millis",
			LogicalType::LocalTimestampMicros => "local-timestamp-micros",
			LogicalType::Decimal { .. } => "decimal",
			LogicalType::Uuid => "uuid",
			LogicalType::Duration => "duration",
			LogicalType::Unknown(tag) => tag,
		}
	}
}

/// A qualified Avro name: base name plus an optional dotted namespace.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}

impl fmt::Debug for Name {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&self.fully_qualified_name, f)
	}
}

impl Name {
	/// The rightmost dotted component, e.g. `c` in `a.b.c`.
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(idx) => &self.fully_qualified_name[idx + 1..],
		}
	}

	/// Everything left of the last dot, e.g. `a.b` in `a.b.c`.
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx
			.map(|idx| &self.fully_qualified_name[..idx])
	}

	/// The full dotted name, e.g. `a.b.c`.
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}

	/// Build a name with an explicit base and namespace.
	pub fn new(base: impl AsRef<str>, namespace: Option<&str>) -> Self {
		match namespace {
			None | Some("") => Self::from_fully_qualified_name(base.as_ref()),
			Some(ns) => Self::from_fully_qualified_name(format!("{ns}.{}", base.as_ref())),
		}
	}

	/// Parse a dotted string, splitting on the *last* dot.
	///
	/// A name consisting only of a leading dot (e.g. `.x`) is normalized to
	/// `{namespace: None, name: "x"}`, matching the reference parsing
	/// behavior.
	pub fn from_fully_qualified_name(fully_qualified_name: impl Into<String>) -> Self {
		let mut fqn = fully_qualified_name.into();
		let namespace_delimiter_idx = match fqn.rfind('.') {
			Some(0) => {
				fqn.remove(0);
				None
			}
			other => other,
		};
		Self {
			fully_qualified_name: fqn,
			namespace_delimiter_idx,
		}
	}
}

impl From<&str> for Name {
	fn from(s: &str) -> Self {
		Self::from_fully_qualified_name(s)
	}
}

impl From<String> for Name {
	fn from(s: String) -> Self {
		Self::from_fully_qualified_name(s)
	}
}

fn is_valid_identifier(s: &str) -> bool {
	let mut chars = s.chars();
	match chars.next() {
		Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
		_ => return false,
	}
	chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Failure validating, building, or otherwise manipulating a [`Schema`]
/// outside of JSON parsing (see [`json`] for parse errors).
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SchemaError {
	message: String,
}

impl SchemaError {
	pub(crate) fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// An editable builder for a [`Schema`]'s arena.
///
/// Nodes are pushed in arbitrary order; [`SchemaKey`]s returned by `push`
/// can be used to wire up `Array`/`Map`/`Union`/`Record`/etc. before
/// `reserve` placeholders are resolved, which is what the [`codec::recursive`
/// combinator](crate::codec::recursive) relies on to build self-referential
/// schemas.
#[derive(Default)]
pub struct SchemaBuilder {
	nodes: Vec<Option<Node>>,
}

impl SchemaBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reserve a key for a node that will be filled in later via
	/// [`fill`](Self::fill). Used to build recursive schemas: reserve a slot,
	/// reference its key from a child, then fill it once the child is known.
	pub fn reserve(&mut self) -> SchemaKey {
		self.nodes.push(None);
		SchemaKey(self.nodes.len() - 1)
	}

	/// Fill a previously reserved key.
	///
	/// # Panics
	/// If `key` was already filled, or was never reserved.
	pub fn fill(&mut self, key: SchemaKey, node: Node) {
		let slot = self
			.nodes
			.get_mut(key.0)
			.expect("SchemaKey was not reserved in this builder");
		assert!(slot.is_none(), "SchemaKey was already filled");
		*slot = Some(node);
	}

	/// Push a fully-formed node, returning its key.
	pub fn push(&mut self, node: Node) -> SchemaKey {
		self.nodes.push(Some(node));
		SchemaKey(self.nodes.len() - 1)
	}

	/// Borrow an already-filled node.
	///
	/// # Panics
	/// If `key` was never filled.
	pub fn peek(&self, key: SchemaKey) -> &Node {
		self.nodes[key.0]
			.as_ref()
			.expect("SchemaKey has not been filled yet")
	}

	/// Mutably borrow an already-filled node, e.g. to attach a logical type
	/// after the node has been pushed.
	///
	/// # Panics
	/// If `key` was never filled.
	pub fn node_mut(&mut self, key: SchemaKey) -> &mut Node {
		self.nodes[key.0]
			.as_mut()
			.expect("SchemaKey has not been filled yet")
	}

	/// Copy every node of an already-built [`Schema`] into this arena,
	/// offsetting its internal keys so the copy is wired up exactly as it
	/// was in `schema`. Returns the key of the copied root. Used to compose
	/// standalone per-codec schemas (see [`crate::codec`]) into a larger
	/// one, e.g. embedding an element codec's schema as an array's `items`.
	pub fn import(&mut self, schema: &Schema) -> SchemaKey {
		let offset = self.nodes.len();
		for node in schema.nodes() {
			self.nodes.push(Some(offset_node(node, offset)));
		}
		SchemaKey(offset + schema.root().idx())
	}

	/// Finish building without validating. Combinators that build up a
	/// schema incrementally (e.g. around a not-yet-collapsed recursive
	/// placeholder) use this instead of [`build`](Self::build), and run
	/// [`Schema::validate`] explicitly once construction is complete.
	///
	/// # Panics
	/// If any reserved key was never filled.
	pub fn build_unchecked(self) -> Schema {
		let nodes = self
			.nodes
			.into_iter()
			.enumerate()
			.map(|(idx, node)| {
				node.unwrap_or_else(|| panic!("SchemaKey {idx} was reserved but never filled"))
			})
			.collect();
		Schema { nodes }
	}

	/// Finish building and validate the result.
	///
	/// # Panics
	/// If any reserved key was never filled.
	pub fn build(self) -> Result<Schema, SchemaError> {
		let schema = self.build_unchecked();
		schema.validate()?;
		Ok(schema)
	}
}

fn offset_node(node: &Node, offset: usize) -> Node {
	let bump = |key: SchemaKey| SchemaKey(key.0 + offset);
	let type_ = match &node.type_ {
		Type::Array(a) => Type::Array(Array { items: bump(a.items) }),
		Type::Map(m) => Type::Map(Map { values: bump(m.values) }),
		Type::Union(u) => Type::Union(Union {
			branches: u.branches.iter().copied().map(bump).collect(),
		}),
		Type::Record(r) => Type::Record(Record {
			name: r.name.clone(),
			fields: r
				.fields
				.iter()
				.map(|f| Field {
					name: f.name.clone(),
					schema: bump(f.schema),
					doc: f.doc.clone(),
					default: f.default.clone(),
					aliases: f.aliases.clone(),
				})
				.collect(),
			doc: r.doc.clone(),
			aliases: r.aliases.clone(),
		}),
		other => other.clone(),
	};
	Node {
		type_,
		logical_type: node.logical_type.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn name_splits_on_last_dot() {
		let name = Name::from_fully_qualified_name("a.b.c");
		assert_eq!(name.name(), "c");
		assert_eq!(name.namespace(), Some("a.b"));
		assert_eq!(name.fully_qualified_name(), "a.b.c");
	}

	#[test]
	fn name_with_leading_dot_has_no_namespace() {
		let name = Name::from_fully_qualified_name(".x");
		assert_eq!(name.name(), "x");
		assert_eq!(name.namespace(), None);
	}

	#[test]
	fn record_must_have_at_least_one_field() {
		let mut builder = SchemaBuilder::new();
		builder.push(Node::new(Type::Record(Record {
			name: Name::from_fully_qualified_name("Empty"),
			fields: vec![],
			doc: None,
			aliases: vec![],
		})));
		assert!(builder.build().is_err());
	}

	#[test]
	fn union_rejects_duplicate_branch_types() {
		let mut builder = SchemaBuilder::new();
		let int_a = builder.push(Node::new(Type::Int));
		let int_b = builder.push(Node::new(Type::Int));
		builder.push(Node::new(Type::Union(Union {
			branches: vec![int_a, int_b],
		})));
		assert!(builder.build().is_err());
	}

	#[test]
	fn union_rejects_nested_union() {
		let mut builder = SchemaBuilder::new();
		let inner = builder.push(Node::new(Type::Union(Union { branches: vec![] })));
		let null = builder.push(Node::new(Type::Null));
		builder.push(Node::new(Type::Union(Union {
			branches: vec![inner, null],
		})));
		assert!(builder.build().is_err());
	}

	#[test]
	fn fixed_size_zero_is_invalid() {
		let mut builder = SchemaBuilder::new();
		builder.push(Node::new(Type::Fixed(Fixed {
			name: Name::from_fully_qualified_name("F"),
			size: 0,
			doc: None,
			aliases: vec![],
		})));
		assert!(builder.build().is_err());
	}
}
