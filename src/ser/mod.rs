//! Everything necessary for Avro binary serialization (value
//! codec, encode direction)
//!
//! Typical usage goes through the top-level [`crate::to_datum`] /
//! [`crate::to_datum_vec`], but the types here are exposed for advanced
//! usage (reusing buffers across serializations, driving the
//! `serde::Serializer` manually).
//!
//! ```
//! let schema: avro_codec::Schema = r#"
//! {
//! 	"namespace": "test",
//! 	"type": "record",
//! 	"name": "Test",
//! 	"fields": [
//! 		{ "name": "field", "type": "string" }
//! 	]
//! }
//! "#
//! .parse()
//! .expect("Failed to parse schema");
//!
//! #[derive(serde_derive::Serialize)]
//! struct Test<'a> {
//! 	field: &'a str,
//! }
//!
//! let serializer_config = &mut avro_codec::ser::SerializerConfig::new(&schema);
//! let mut serializer_state =
//! 	avro_codec::ser::SerializerState::from_writer(Vec::new(), serializer_config);
//!
//! serde::Serialize::serialize(&Test { field: "foo" }, serializer_state.serializer())
//! 	.expect("Failed to serialize");
//! let serialized = serializer_state.into_writer();
//! assert_eq!(serialized, &[6, b'f', b'o', b'o']);
//! ```

mod error;
mod serializer;

pub use {error::SerError, serializer::DatumSerializer};

use crate::schema::{Schema, SchemaKey, SchemaNode};

/// All configuration and state necessary for the serialization to run
///
/// Notably holds the writer and a `&mut` [`SerializerConfig`].
///
/// Does not implement [`serde::Serializer`] directly (use
/// [`.serializer`](Self::serializer) to obtain that).
pub struct SerializerState<'c, 's, W> {
	writer: W,
	config: &'c mut SerializerConfig<'s>,
}

/// Schema + serialization buffers
///
/// Reusing the same `SerializerConfig` (and output buffer) across
/// serializations is ideal for performance: it allows the field-reordering
/// buffers to be reused instead of reallocated (~40% perf gain).
pub struct SerializerConfig<'s> {
	buffers: Buffers,
	allow_slow_sequence_to_bytes: bool,
	schema: &'s Schema,
}

impl<'s> SerializerConfig<'s> {
	/// Build a new `SerializerConfig` with a given `schema`, default options
	/// and empty serialization buffers.
	pub fn new(schema: &'s Schema) -> Self {
		Self {
			schema,
			allow_slow_sequence_to_bytes: false,
			buffers: Buffers::default(),
		}
	}

	/// For when you can't use `serde_bytes` and really need to serialize a
	/// sequence as bytes.
	///
	/// It will be slow, because the bytes will be processed one by one.
	pub fn allow_slow_sequence_to_bytes(&mut self) -> &mut Self {
		self.allow_slow_sequence_to_bytes = true;
		self
	}

	/// The schema that will be used when building a serializer from this
	/// `SerializerConfig`
	pub fn schema(&self) -> &'s Schema {
		self.schema
	}
}

impl<'c, 's, W: std::io::Write> SerializerState<'c, 's, W> {
	/// Build a `SerializerState` from a writer and a `SerializerConfig`
	pub fn from_writer(writer: W, config: &'c mut SerializerConfig<'s>) -> Self {
		Self { writer, config }
	}

	/// Obtain the actual [`serde::Serializer`] for this `SerializerState`
	pub fn serializer<'r>(&'r mut self) -> DatumSerializer<'r, 'c, 's, W> {
		DatumSerializer {
			key: self.config.schema.root(),
			state: self,
		}
	}
}
impl<W> SerializerState<'_, '_, W> {
	/// Get writer back
	pub fn into_writer(self) -> W {
		self.writer
	}
	/// Get writer by reference
	pub fn writer(&self) -> &W {
		&self.writer
	}
	/// Get writer by mutable reference
	pub fn writer_mut(&mut self) -> &mut W {
		&mut self.writer
	}
}
impl<'s, W> SerializerState<'_, 's, W> {
	fn node(&self, key: SchemaKey) -> &'s SchemaNode {
		self.config.schema.node(key)
	}
	/// The schema this state is serializing against
	pub fn schema(&self) -> &'s Schema {
		self.config.schema
	}
}

/// Buffers used during serialization, for reuse across serializations
///
/// In order to avoid allocating even when field reordering is necessary we
/// can preserve the necessary allocations from one record to another (even
/// across serializations). This brings ~40% perf improvement.
#[derive(Default)]
struct Buffers {
	field_reordering_buffers: Vec<Vec<u8>>,
	field_reordering_super_buffers: Vec<Vec<Option<Vec<u8>>>>,
}
