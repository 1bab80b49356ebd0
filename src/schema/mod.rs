//! The in-memory representation of Avro schemas: the mutable builder
//! ([`SchemaMut`]), the frozen runtime representation ([`Schema`]), the JSON
//! parser that produces either from a schema document, canonical-form
//! generation and fingerprinting.
//!
//! # Getting started
//!
//! ```
//! let schema: avro_codec::Schema = r#"
//! {
//! 	"type": "record",
//! 	"name": "test.Test",
//! 	"fields": [
//! 		{ "name": "field", "type": "string" }
//! 	]
//! }
//! "#
//! .parse()
//! .expect("Failed to parse schema");
//!
//! assert_eq!(
//! 	schema.rabin_fingerprint(),
//! 	&schema.clone_canonical_form().parse::<avro_codec::Schema>().unwrap().rabin_fingerprint().to_owned()[..]
//! );
//! ```

mod canonical_form;
mod cycles;
mod error;
mod fingerprint;
mod parsing;

pub use error::SchemaError;
pub use fingerprint::{crc64_avro, crc64_avro_of_canonical_form};

use std::collections::HashMap;

/// A named schema's identity: `namespace + "." + name`.
///
/// See the [Avro spec on names](https://avro.apache.org/docs/current/specification/#names).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}
impl Name {
	/// Build a `Name` from its already-dotted fully qualified form
	pub fn from_fully_qualified_name(fully_qualified_name: String) -> Self {
		let namespace_delimiter_idx = match fully_qualified_name.rfind('.') {
			// A name that starts with a dot has no namespace (mirrors Avro's
			// "null namespace" special case for a leading-dot-only fullname)
			Some(0) => None,
			other => other,
		};
		Self {
			fully_qualified_name,
			namespace_delimiter_idx,
		}
	}
	/// The name without its namespace
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(idx) => &self.fully_qualified_name[idx + 1..],
		}
	}
	/// The namespace, if any
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx
			.map(|idx| &self.fully_qualified_name[..idx])
	}
	/// The full `namespace.name` (or just `name` if there is no namespace)
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}
}
impl std::fmt::Debug for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.fully_qualified_name.fmt(f)
	}
}
impl std::fmt::Display for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.fully_qualified_name.fmt(f)
	}
}

/// Index of a node in a schema's node arena
///
/// Schemas may be self-referential (a record that contains itself through a
/// union branch), so nodes can't own each other directly. Instead every
/// schema is a `Vec<SchemaNode>` (the arena) and nodes that need to point to
/// another node (array items, map values, union variants, record field
/// types...) store a `SchemaKey` index into that same `Vec` rather than an
/// owning pointer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SchemaKey {
	idx: usize,
}
impl SchemaKey {
	pub(crate) fn from_idx(idx: usize) -> Self {
		Self { idx }
	}
	/// The index of the root node (always `0`)
	pub fn root() -> Self {
		Self { idx: 0 }
	}
	/// The raw index into the schema's node arena
	pub fn idx(self) -> usize {
		self.idx
	}
}

/// One node of a schema tree
///
/// Retrieved by indexing a [`Schema`] or [`SchemaMut`] with a [`SchemaKey`].
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum SchemaNode {
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
	Decimal(Decimal),
	Uuid,
	Date,
	TimeMillis,
	TimeMicros,
	TimestampMillis,
	TimestampMicros,
	LocalTimestampMillis,
	LocalTimestampMicros,
	/// `duration` is always encoded as a named `fixed(12)`; the name is kept
	/// since `fixed` is a named Avro type (needed for canonical form
	/// "first mention" tracking and union-branch distinctness).
	Duration(Name),
}
impl SchemaNode {
	/// The name of this node, if it is a named type (record/enum/fixed)
	pub fn name(&self) -> Option<&Name> {
		match self {
			SchemaNode::Record(r) => Some(&r.name),
			SchemaNode::Enum(e) => Some(&e.name),
			SchemaNode::Fixed(f) => Some(&f.name),
			_ => None,
		}
	}
}

#[derive(Clone, Debug)]
pub struct Array {
	pub items: SchemaKey,
}
#[derive(Clone, Debug)]
pub struct Map {
	pub values: SchemaKey,
}
#[derive(Clone, Debug)]
pub struct Union {
	pub variants: Vec<SchemaKey>,
}
#[derive(Clone, Debug)]
pub struct Record {
	pub name: Name,
	/// Additional full names that resolve to this same schema
	pub aliases: Vec<Name>,
	pub fields: Vec<RecordField>,
}
#[derive(Clone, Debug)]
pub struct RecordField {
	pub name: String,
	pub schema: SchemaKey,
}
#[derive(Clone, Debug)]
pub struct Enum {
	pub name: Name,
	/// Additional full names that resolve to this same schema
	pub aliases: Vec<Name>,
	pub symbols: Vec<String>,
}
#[derive(Clone, Debug)]
pub struct Fixed {
	pub name: Name,
	/// Additional full names that resolve to this same schema
	pub aliases: Vec<Name>,
	pub size: usize,
}
#[derive(Clone, Debug)]
pub struct Decimal {
	pub precision: usize,
	pub scale: u32,
	pub repr: DecimalRepr,
}
#[derive(Clone, Debug)]
pub enum DecimalRepr {
	Bytes,
	Fixed { size: usize, name: Name },
}

/// Mutable / in-construction schema representation
///
/// Obtained by parsing a schema document (`str::parse`), or built
/// programmatically via [`SchemaMut::from_nodes`]. Call [`SchemaMut::freeze`]
/// (or [`TryInto::try_into`]) to validate it and obtain an immutable
/// [`Schema`] that can be used for encoding/decoding.
#[derive(Clone)]
pub struct SchemaMut {
	nodes: Vec<SchemaNode>,
	/// Arbitrary non-standard annotations, one property list per node,
	/// indexed in parallel with `nodes`.
	properties: Vec<Vec<(String, serde_json::Value)>>,
	schema_json: Option<String>,
}
impl SchemaMut {
	/// Build a `SchemaMut` from a flat node arena, with no extra properties
	/// on any node
	///
	/// The first node (index `0`) is taken as the root.
	pub fn from_nodes(nodes: Vec<SchemaNode>) -> Self {
		let properties = vec![Vec::new(); nodes.len()];
		Self {
			nodes,
			properties,
			schema_json: None,
		}
	}
	/// The nodes arena
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}
	/// The nodes arena, mutably
	///
	/// Invalidates any cached JSON representation (it will be regenerated
	/// from the nodes on the next call that needs it).
	pub fn nodes_mut(&mut self) -> &mut Vec<SchemaNode> {
		self.schema_json = None;
		&mut self.nodes
	}
	/// The non-standard annotations carried by a node, in declaration order
	///
	/// Nodes added through [`SchemaMut::nodes_mut`] after construction start
	/// out with no properties.
	pub fn properties(&self, key: SchemaKey) -> &[(String, serde_json::Value)] {
		self.properties
			.get(key.idx())
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}
	/// The non-standard annotations carried by a node, mutably
	///
	/// Invalidates any cached JSON representation.
	pub fn properties_mut(&mut self, key: SchemaKey) -> &mut Vec<(String, serde_json::Value)> {
		self.schema_json = None;
		if key.idx() >= self.properties.len() {
			self.properties.resize_with(key.idx() + 1, Vec::new);
		}
		&mut self.properties[key.idx()]
	}
	/// The root node's key (always index `0`)
	///
	/// # Panics
	/// If there are no nodes in the schema.
	pub fn root(&self) -> SchemaKey {
		assert!(!self.nodes.is_empty(), "Schema has no nodes");
		SchemaKey::root()
	}
	/// Validate this schema and freeze it into an immutable [`Schema`]
	///
	/// This computes the canonical form, the CRC-64-AVRO fingerprint, and
	/// checks for unconditional self-reference cycles.
	pub fn freeze(self) -> Result<Schema, SchemaError> {
		self.try_into()
	}
}
impl std::ops::Index<SchemaKey> for SchemaMut {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &SchemaNode {
		&self.nodes[key.idx()]
	}
}
impl serde::Serialize for SchemaMut {
	/// Re-renders the node arena as an Avro JSON schema document, ignoring
	/// any cached `schema_json` from parsing (so edits made through
	/// [`SchemaMut::nodes_mut`] are reflected)
	///
	/// # Errors
	/// If the node arena contains an unconditional cycle (see
	/// [`SchemaMut::freeze`]), since there would be no way to terminate the
	/// JSON rendering.
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		cycles::check_for_unconditional_cycles(&self.nodes).map_err(serde::ser::Error::custom)?;
		ser_helpers::SchemaAsJson {
			nodes: &self.nodes,
			properties: &self.properties,
		}
		.serialize(serializer)
	}
}
impl std::str::FromStr for SchemaMut {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		parsing::parse(s, &ParserConfig::default())
	}
}

/// An immutable, validated Avro schema
///
/// Schemas are immutable after construction and freely `Sync`/`Send` - share
/// them across threads via e.g. `Arc<Schema>`.
#[derive(Clone)]
pub struct Schema {
	nodes: Vec<SchemaNode>,
	properties: Vec<Vec<(String, serde_json::Value)>>,
	fingerprint: [u8; 8],
	schema_json: String,
}
impl Schema {
	/// The root node's key (always index `0`)
	pub fn root(&self) -> SchemaKey {
		SchemaKey::root()
	}
	/// Look up a node by key
	pub fn node(&self, key: SchemaKey) -> &SchemaNode {
		&self.nodes[key.idx()]
	}
	/// All nodes, in arena order (index `0` is the root)
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}
	/// The non-standard annotations carried by a node, in declaration order
	pub fn properties(&self, key: SchemaKey) -> &[(String, serde_json::Value)] {
		self.properties
			.get(key.idx())
			.map(Vec::as_slice)
			.unwrap_or(&[])
	}
	/// The JSON representation of this schema, as it was parsed (minified)
	pub fn json(&self) -> &str {
		&self.schema_json
	}
	/// The CRC-64-AVRO fingerprint of this schema's canonical form, as used
	/// by Single-Object-Encoding (8 bytes, value as computed by the
	/// reflected CRC-64 with seed `0xc15d213aa4d7a795`)
	pub fn rabin_fingerprint(&self) -> &[u8; 8] {
		&self.fingerprint
	}
	/// The SHA-256 fingerprint of this schema's canonical form
	#[cfg(feature = "sha256")]
	pub fn sha256_fingerprint(&self) -> [u8; 32] {
		use sha2::Digest;
		let mut hasher = sha2::Sha256::new();
		hasher.update(self.clone_canonical_form().as_bytes());
		hasher.finalize().into()
	}
	/// Recompute and return the Avro Parsing Canonical Form of this schema
	///
	/// This is recomputed on every call; prefer [`Schema::rabin_fingerprint`]
	/// if you only need the fingerprint.
	pub fn clone_canonical_form(&self) -> String {
		canonical_form::canonical_form_string(&self.nodes)
			.expect("Canonical form of an already-validated schema should not fail")
	}

	/// Extends this reference's lifetime to `'static`
	///
	/// Used by the object container file reader, which is self-referential:
	/// it stores an `Arc<Schema>` alongside a deserializer that borrows from
	/// it. Sound as long as the caller doesn't let the returned reference
	/// outlive `self` (in practice: `self` must be kept behind an `Arc` that
	/// is dropped no earlier than every value derived from this reference).
	pub(crate) unsafe fn with_fake_static_lifetime(&self) -> &'static Schema {
		&*(self as *const Schema)
	}
}
impl std::ops::Index<SchemaKey> for Schema {
	type Output = SchemaNode;
	fn index(&self, key: SchemaKey) -> &SchemaNode {
		&self.nodes[key.idx()]
	}
}
impl std::str::FromStr for Schema {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.parse::<SchemaMut>()?.freeze()
	}
}
impl TryFrom<SchemaMut> for Schema {
	type Error = SchemaError;
	fn try_from(schema_mut: SchemaMut) -> Result<Self, SchemaError> {
		cycles::check_for_unconditional_cycles(&schema_mut.nodes)?;
		let canonical = canonical_form::canonical_form_string(&schema_mut.nodes)?;
		let fingerprint = fingerprint::crc64_avro(canonical.as_bytes()).to_le_bytes();
		let schema_json = match schema_mut.schema_json {
			Some(json) => json,
			None => serde_json::to_string(&ser_helpers::SchemaAsJson {
				nodes: &schema_mut.nodes,
				properties: &schema_mut.properties,
			})
			.map_err(SchemaError::serde_json)?,
		};
		Ok(Schema {
			nodes: schema_mut.nodes,
			properties: schema_mut.properties,
			fingerprint,
			schema_json,
		})
	}
}

/// Configuration for [`SchemaMut::from_str`]-style parsing
///
/// Generalizes the legacy process-wide `SkipNameValidation` flag into
/// explicit, constructible configuration so that tests (and independent
/// callers) can use isolated settings instead of mutating global state.
#[derive(Clone)]
pub struct ParserConfig {
	/// Whether names must match `[A-Za-z_][A-Za-z0-9_]*` (default `true`)
	pub validate_names: bool,
	/// An optional cache of previously-parsed named schemas, shared across
	/// `parse` calls, for deduplication/reference resolution across
	/// documents.
	pub cache: Option<std::sync::Arc<SchemaCache>>,
}
impl Default for ParserConfig {
	fn default() -> Self {
		Self {
			validate_names: true,
			cache: None,
		}
	}
}
impl ParserConfig {
	/// Parse a schema document with this configuration
	///
	/// Safe to call concurrently from multiple threads with independent (or
	/// shared-cache) inputs.
	pub fn parse(&self, schema_json: &str) -> Result<SchemaMut, SchemaError> {
		parsing::parse(schema_json, self)
	}
}

/// A cache of previously-parsed named schemas, keyed by full name
///
/// Internally synchronized (a single [`std::sync::Mutex`]-guarded map) so it
/// may be shared across concurrent `parse` calls.
#[derive(Default)]
pub struct SchemaCache {
	named: std::sync::Mutex<HashMap<String, Schema>>,
}
impl SchemaCache {
	/// Build an empty cache
	pub fn new() -> Self {
		Self::default()
	}
}

mod ser_helpers {
	//! Re-serializes the node arena back into Avro JSON schema text, for the
	//! case where a [`SchemaMut`](super::SchemaMut) was built programmatically
	//! (not parsed) and therefore has no `schema_json` cached from parsing.
	use super::*;
	use {
		serde::ser::{SerializeMap, SerializeSeq, Serializer},
		std::cell::RefCell,
	};

	pub(super) struct SchemaAsJson<'a> {
		pub(super) nodes: &'a [SchemaNode],
		pub(super) properties: &'a [Vec<(String, serde_json::Value)>],
	}
	impl serde::Serialize for SchemaAsJson<'_> {
		fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
			let written = RefCell::new(vec![false; self.nodes.len()]);
			write_node(
				self.nodes,
				self.properties,
				&written,
				SchemaKey::root(),
				serializer,
			)
		}
	}
	/// The first time a named type's key is encountered, its full definition
	/// is written; any later occurrence (a reference cycling back to it)
	/// writes only its fullname, mirroring how such schemas parse back.
	fn should_write_only_name(written: &RefCell<Vec<bool>>, key: SchemaKey) -> bool {
		let mut written = written.borrow_mut();
		let slot = &mut written[key.idx()];
		if *slot {
			true
		} else {
			*slot = true;
			false
		}
	}
	fn node_properties<'a>(
		properties: &'a [Vec<(String, serde_json::Value)>],
		key: SchemaKey,
	) -> &'a [(String, serde_json::Value)] {
		properties.get(key.idx()).map(Vec::as_slice).unwrap_or(&[])
	}
	/// Writes a primitive/logical type that has no properties of its own as a
	/// bare type name string (`"int"`); if it carries non-standard
	/// annotations, falls back to the `{"type": "int", ...}` object form so
	/// they aren't lost.
	fn write_bare_type<S: Serializer>(
		type_str: &str,
		extra: &[(String, serde_json::Value)],
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		if extra.is_empty() {
			serializer.serialize_str(type_str)
		} else {
			let mut map = serializer.serialize_map(None)?;
			map.serialize_entry("type", type_str)?;
			for (k, v) in extra {
				map.serialize_entry(k, v)?;
			}
			map.end()
		}
	}
	fn write_node<S: Serializer>(
		nodes: &[SchemaNode],
		properties: &[Vec<(String, serde_json::Value)>],
		written: &RefCell<Vec<bool>>,
		key: SchemaKey,
		serializer: S,
	) -> Result<S::Ok, S::Error> {
		let named = match &nodes[key.idx()] {
			SchemaNode::Record(r) => Some(&r.name),
			SchemaNode::Enum(e) => Some(&e.name),
			SchemaNode::Fixed(f) => Some(&f.name),
			SchemaNode::Duration(name) => Some(name),
			SchemaNode::Decimal(Decimal {
				repr: DecimalRepr::Fixed { name, .. },
				..
			}) => Some(name),
			_ => None,
		};
		if let Some(name) = named {
			if should_write_only_name(written, key) {
				return serializer.serialize_str(name.fully_qualified_name());
			}
		}
		let extra = node_properties(properties, key);
		match &nodes[key.idx()] {
			SchemaNode::Null => write_bare_type("null", extra, serializer),
			SchemaNode::Boolean => write_bare_type("boolean", extra, serializer),
			SchemaNode::Int => write_bare_type("int", extra, serializer),
			SchemaNode::Long => write_bare_type("long", extra, serializer),
			SchemaNode::Float => write_bare_type("float", extra, serializer),
			SchemaNode::Double => write_bare_type("double", extra, serializer),
			SchemaNode::Bytes => write_bare_type("bytes", extra, serializer),
			SchemaNode::String => write_bare_type("string", extra, serializer),
			SchemaNode::Uuid => write_bare_type("string", extra, serializer),
			SchemaNode::Date | SchemaNode::TimeMillis => write_bare_type("int", extra, serializer),
			SchemaNode::TimeMicros
			| SchemaNode::TimestampMillis
			| SchemaNode::TimestampMicros
			| SchemaNode::LocalTimestampMillis
			| SchemaNode::LocalTimestampMicros => write_bare_type("long", extra, serializer),
			SchemaNode::Array(a) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "array")?;
				map.serialize_entry(
					"items",
					&Wrap {
						nodes,
						properties,
						written,
						key: a.items,
					},
				)?;
				for (k, v) in extra {
					map.serialize_entry(k, v)?;
				}
				map.end()
			}
			SchemaNode::Map(m) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "map")?;
				map.serialize_entry(
					"values",
					&Wrap {
						nodes,
						properties,
						written,
						key: m.values,
					},
				)?;
				for (k, v) in extra {
					map.serialize_entry(k, v)?;
				}
				map.end()
			}
			SchemaNode::Union(u) => {
				let mut seq = serializer.serialize_seq(Some(u.variants.len()))?;
				for &v in &u.variants {
					seq.serialize_element(&Wrap {
						nodes,
						properties,
						written,
						key: v,
					})?;
				}
				seq.end()
			}
			SchemaNode::Record(r) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "record")?;
				map.serialize_entry("name", r.name.fully_qualified_name())?;
				if !r.aliases.is_empty() {
					map.serialize_entry(
						"aliases",
						&r.aliases
							.iter()
							.map(Name::fully_qualified_name)
							.collect::<Vec<_>>(),
					)?;
				}
				map.serialize_entry(
					"fields",
					&r.fields
						.iter()
						.map(|f| FieldAsJson {
							nodes,
							properties,
							written,
							name: &f.name,
							key: f.schema,
						})
						.collect::<Vec<_>>(),
				)?;
				for (k, v) in extra {
					map.serialize_entry(k, v)?;
				}
				map.end()
			}
			SchemaNode::Enum(e) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "enum")?;
				map.serialize_entry("name", e.name.fully_qualified_name())?;
				if !e.aliases.is_empty() {
					map.serialize_entry(
						"aliases",
						&e.aliases
							.iter()
							.map(Name::fully_qualified_name)
							.collect::<Vec<_>>(),
					)?;
				}
				map.serialize_entry("symbols", &e.symbols)?;
				for (k, v) in extra {
					map.serialize_entry(k, v)?;
				}
				map.end()
			}
			SchemaNode::Fixed(f) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "fixed")?;
				map.serialize_entry("name", f.name.fully_qualified_name())?;
				if !f.aliases.is_empty() {
					map.serialize_entry(
						"aliases",
						&f.aliases
							.iter()
							.map(Name::fully_qualified_name)
							.collect::<Vec<_>>(),
					)?;
				}
				map.serialize_entry("size", &f.size)?;
				for (k, v) in extra {
					map.serialize_entry(k, v)?;
				}
				map.end()
			}
			SchemaNode::Decimal(d) => {
				let mut map = serializer.serialize_map(None)?;
				match &d.repr {
					DecimalRepr::Bytes => map.serialize_entry("type", "bytes")?,
					DecimalRepr::Fixed { size, name } => {
						map.serialize_entry("type", "fixed")?;
						map.serialize_entry("name", name.fully_qualified_name())?;
						map.serialize_entry("size", size)?;
					}
				}
				map.serialize_entry("logicalType", "decimal")?;
				map.serialize_entry("precision", &d.precision)?;
				map.serialize_entry("scale", &d.scale)?;
				for (k, v) in extra {
					map.serialize_entry(k, v)?;
				}
				map.end()
			}
			SchemaNode::Duration(name) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "fixed")?;
				map.serialize_entry("name", name.fully_qualified_name())?;
				map.serialize_entry("size", &12)?;
				map.serialize_entry("logicalType", "duration")?;
				for (k, v) in extra {
					map.serialize_entry(k, v)?;
				}
				map.end()
			}
		}
	}
	struct Wrap<'a> {
		nodes: &'a [SchemaNode],
		properties: &'a [Vec<(String, serde_json::Value)>],
		written: &'a RefCell<Vec<bool>>,
		key: SchemaKey,
	}
	impl serde::Serialize for Wrap<'_> {
		fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
			write_node(self.nodes, self.properties, self.written, self.key, serializer)
		}
	}
	struct FieldAsJson<'a> {
		nodes: &'a [SchemaNode],
		properties: &'a [Vec<(String, serde_json::Value)>],
		written: &'a RefCell<Vec<bool>>,
		name: &'a str,
		key: SchemaKey,
	}
	impl serde::Serialize for FieldAsJson<'_> {
		fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
			let mut map = serializer.serialize_map(Some(2))?;
			map.serialize_entry("name", self.name)?;
			map.serialize_entry(
				"type",
				&Wrap {
					nodes: self.nodes,
					properties: self.properties,
					written: self.written,
					key: self.key,
				},
			)?;
			map.end()
		}
	}
}
