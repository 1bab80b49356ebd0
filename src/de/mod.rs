//! Everything necessary for Avro binary deserialization (value
//! codec, decode direction)
//!
//! Typical usage goes through the top-level [`crate::from_datum_slice`] /
//! [`crate::from_datum_reader`], but the types here are exposed for advanced
//! usage (setting [`DeserializerConfig::max_seq_size`],
//! [`read::ReaderRead::max_alloc_size`], or driving the `serde::Deserializer`
//! manually).

mod deserializer;
mod error;
pub mod read;

use read::*;
pub use {deserializer::*, error::DeError};

use crate::schema::{Schema, SchemaKey, SchemaNode};

use serde::de::*;

/// All configuration and state necessary for the deserialization to run
///
/// Does not implement [`Deserializer`] directly (use
/// [`.deserializer`](Self::deserializer) to obtain that).
pub struct DeserializerState<'s, R> {
	pub(crate) reader: R,
	config: DeserializerConfig<'s>,
}

/// Schema plus the knobs that bound deserialization of untrusted input
#[derive(Clone)]
pub struct DeserializerConfig<'s> {
	schema: &'s Schema,
	/// If a sequence (array/map block run) turns out to be longer than this,
	/// fail instead of looping forever on malformed/adversarial input.
	/// Default `1_000_000_000`.
	pub max_seq_size: usize,
	/// If a datum turns out to be deeper than this, fail instead of
	/// overflowing the stack. Default `64`.
	pub allowed_depth: usize,
	/// Governs how a union's named branch (record/enum/fixed) is exposed when
	/// decoding into an untyped/dynamic target (anything that drives
	/// [`Deserializer::deserialize_any`](serde::Deserializer::deserialize_any)
	/// rather than a concrete Rust enum): when `true`, the branch is wrapped
	/// in a single-entry map keyed by its Avro type tag (fullname for named
	/// types, e.g. `{"com.example.Foo": {...}}`); when `false` (the
	/// default), the inner value is exposed directly with no wrapping.
	/// `null` branches are never wrapped either way. Default `false`.
	pub dynamic_union_map_keys: bool,
}

impl<'s> DeserializerConfig<'s> {
	/// Construct a `DeserializerConfig` from a schema, with all other
	/// parameters at their default values
	pub fn new(schema: &'s Schema) -> Self {
		Self {
			schema,
			max_seq_size: 1_000_000_000,
			allowed_depth: 64,
			dynamic_union_map_keys: false,
		}
	}
	/// The schema this configuration deserializes against
	pub fn schema(&self) -> &'s Schema {
		self.schema
	}
}

impl<'s, 'de, R: ReadSlice<'de>> DeserializerState<'s, R> {
	/// Construct a `DeserializerState` from a reader and a schema, with all
	/// other parameters at their default values
	pub fn new(r: R, schema: &'s Schema) -> Self {
		Self::with_config(r, DeserializerConfig::new(schema))
	}

	/// Construct a `DeserializerState` from a [`ReadSlice`] (either a
	/// [`SliceRead`] or a [`ReaderRead`]) and a [`DeserializerConfig`]
	pub fn with_config(r: R, config: DeserializerConfig<'s>) -> Self {
		DeserializerState { reader: r, config }
	}

	/// Obtain the actual [`serde::Deserializer`] for this `DeserializerState`
	pub fn deserializer<'r>(&'r mut self) -> DatumDeserializer<'r, 's, R> {
		DatumDeserializer {
			key: SchemaKey::root(),
			allowed_depth: deserializer::AllowedDepth::new(self.config.allowed_depth),
			state: self,
		}
	}
}
impl<'s, R> DeserializerState<'s, R> {
	pub fn into_reader(self) -> R {
		self.reader
	}
	pub fn into_inner(self) -> (R, DeserializerConfig<'s>) {
		(self.reader, self.config)
	}
	pub fn config(&self) -> &DeserializerConfig<'s> {
		&self.config
	}
	fn schema(&self) -> &'s Schema {
		self.config.schema
	}
	fn node(&self, key: SchemaKey) -> &'s SchemaNode {
		self.config.schema.node(key)
	}
}

impl<'s, 'a> DeserializerState<'s, read::SliceRead<'a>> {
	/// Construct a `DeserializerState` from an `&[u8]` and a schema
	pub fn from_slice(slice: &'a [u8], schema: &'s Schema) -> Self {
		Self::new(read::SliceRead::new(slice), schema)
	}
}

impl<'s, R: std::io::BufRead> DeserializerState<'s, read::ReaderRead<R>> {
	/// Construct a `DeserializerState` from an `impl BufRead` and a schema
	///
	/// Prefer [`DeserializerState::from_slice`] when you have a slice: it's
	/// faster and lets borrowed `&str`/`&[u8]` values point directly into the
	/// input.
	pub fn from_reader(reader: R, schema: &'s Schema) -> Self {
		Self::new(read::ReaderRead::new(reader), schema)
	}
}

impl<R> std::ops::Deref for DeserializerState<'_, R> {
	type Target = R;
	fn deref(&self) -> &Self::Target {
		&self.reader
	}
}
impl<R> std::ops::DerefMut for DeserializerState<'_, R> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.reader
	}
}
