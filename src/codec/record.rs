//! The curried record builder (§4.3, §9 "Curried record builder").
//!
//! `record(name, ctor)` starts a pipeline; each `.field`/`.field_opt` call
//! consumes one argument of `ctor`'s curried signature and narrows the
//! builder's type parameter `C` from `Fn(F) -> Next` down to `Next`. Once
//! enough fields have been added that `C` unifies with `T` itself, `.finish()`
//! becomes callable — the arity is checked by the type system at the call
//! site, not at runtime.

use super::{option, Codec, DecodeError, EncodeError};
use crate::io::{Sink, Source};
use crate::schema::{Field, Name, Node, Record, Schema, SchemaBuilder, SchemaKey, Type};
use std::marker::PhantomData;
use std::rc::Rc;

type FieldEncodeFn<T> = Rc<dyn Fn(&T, &mut Sink) -> Result<(), EncodeError>>;
type StageFn<C> = Rc<dyn Fn(&mut Source) -> Result<C, DecodeError>>;

/// Accumulates record fields and a curried constructor; see the module docs.
pub struct RecordBuilder<T, C> {
	name: Name,
	doc: Option<String>,
	aliases: Vec<Name>,
	arena: SchemaBuilder,
	root: SchemaKey,
	field_nodes: Vec<Field>,
	encoders: Vec<FieldEncodeFn<T>>,
	decode_stage: StageFn<C>,
	_t: PhantomData<fn() -> T>,
}

/// Start a record pipeline. `ctor` is a curried constructor: a function of
/// the first field's type returning a function of the second field's type,
/// and so on, ending in `T`. `ctor` must be cheaply `Clone` — in practice
/// every curried constructor written as a plain closure literal is, since it
/// captures nothing.
pub fn record<T: 'static, C: Clone + 'static>(
	name: impl Into<Name>,
	ctor: C,
) -> RecordBuilder<T, C> {
	let mut arena = SchemaBuilder::new();
	let root = arena.reserve();
	RecordBuilder {
		name: name.into(),
		doc: None,
		aliases: Vec::new(),
		arena,
		root,
		field_nodes: Vec::new(),
		encoders: Vec::new(),
		decode_stage: Rc::new(move |_src: &mut Source| Ok(ctor.clone())),
		_t: PhantomData,
	}
}

impl<T: 'static, C: 'static> RecordBuilder<T, C> {
	/// Attach a doc string to the record being built.
	pub fn doc(mut self, doc: impl Into<String>) -> Self {
		self.doc = Some(doc.into());
		self
	}

	/// Attach an alias to the record being built.
	pub fn alias(mut self, alias: impl Into<Name>) -> Self {
		self.aliases.push(alias.into());
		self
	}

	/// Add the next field. `getter` projects the field's value out of `&T`
	/// for encoding; `C` must accept that value and yield the next stage
	/// (or `T`, if this is the last field).
	pub fn field<F: 'static, Next: 'static>(
		mut self,
		name: impl Into<String>,
		codec: Codec<F>,
		getter: impl Fn(&T) -> F + 'static,
	) -> RecordBuilder<T, Next>
	where
		C: Fn(F) -> Next + 'static,
	{
		let field_key = self.arena.import(codec.schema());
		self.field_nodes.push(Field {
			name: name.into(),
			schema: field_key,
			doc: None,
			default: None,
			aliases: vec![],
		});

		let field_encode = codec.encode_rc();
		self.encoders.push(Rc::new(move |t: &T, sink: &mut Sink| {
			let value = getter(t);
			field_encode(&value, sink)
		}));

		let field_decode = codec.decode_rc();
		let prev_stage = self.decode_stage;
		let next_stage: StageFn<Next> = Rc::new(move |src: &mut Source| {
			let stage = prev_stage(src)?;
			let value = field_decode(src)?;
			Ok(stage(value))
		});

		RecordBuilder {
			name: self.name,
			doc: self.doc,
			aliases: self.aliases,
			arena: self.arena,
			root: self.root,
			field_nodes: self.field_nodes,
			encoders: self.encoders,
			decode_stage: next_stage,
			_t: PhantomData,
		}
	}

	/// Add the next field as optional: wraps `codec` with [`option`] and
	/// records a `null` default, per §4.3 `field_opt`.
	pub fn field_opt<F: 'static, Next: 'static>(
		self,
		name: impl Into<String>,
		codec: Codec<F>,
		getter: impl Fn(&T) -> Option<F> + 'static,
	) -> RecordBuilder<T, Next>
	where
		C: Fn(Option<F>) -> Next + 'static,
	{
		let mut builder = self.field(name, option(codec), getter);
		if let Some(last) = builder.field_nodes.last_mut() {
			last.default = Some(crate::schema::Default::Null);
		}
		builder
	}
}

impl<T: 'static> RecordBuilder<T, T> {
	/// Finish the pipeline, producing a codec whose encode writes fields in
	/// declared order and whose decode applies the accumulated curried
	/// constructor field-by-field.
	///
	/// # Panics
	/// If the accumulated field names are invalid or duplicated — a
	/// construction-time bug in the caller's pipeline, not a runtime data
	/// error.
	pub fn finish(self) -> Codec<T> {
		let mut arena = self.arena;
		arena.fill(
			self.root,
			Node::new(Type::Record(Record {
				name: self.name,
				fields: self.field_nodes,
				doc: self.doc,
				aliases: self.aliases,
			})),
		);
		let schema: Schema = arena
			.build()
			.expect("record() pipeline produced an invalid schema (duplicate or malformed field names?)");

		let encoders = self.encoders;
		let encode = Rc::new(move |value: &T, sink: &mut Sink| {
			for field_encode in &encoders {
				field_encode(value, sink)?;
			}
			Ok(())
		});

		Codec::new(schema, encode, self.decode_stage)
	}
}
