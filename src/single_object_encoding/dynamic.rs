use super::MAGIC;
use crate::{
	de::{self, read::SliceRead, DeError, DeserializerConfig, DeserializerState},
	Schema,
};

/// Looked up by the 8-byte CRC-64-AVRO fingerprint carried in a single
/// object encoding header
///
/// Implementations are free to back this by an in-memory map (as the
/// built-in [`impl SchemaResolver for HashMap<[u8; 8], Schema>`](#impl-SchemaResolver-for-HashMap<[u8;+8],+Schema>)
/// does), a schema registry HTTP client, a local file cache, etc. The core
/// only consumes the trait: it caches nothing beyond what the resolver
/// itself returns.
pub trait SchemaResolver {
	/// Look up the schema matching this CRC-64-AVRO fingerprint, or `None` if
	/// it is not known to this resolver (surfaced to the caller as
	/// [`DynamicDecodeError::UnknownSchema`])
	fn resolve_schema(&self, fingerprint: &[u8; 8]) -> Option<&Schema>;
}

impl SchemaResolver for std::collections::HashMap<[u8; 8], Schema> {
	fn resolve_schema(&self, fingerprint: &[u8; 8]) -> Option<&Schema> {
		self.get(fingerprint)
	}
}

impl<T: SchemaResolver + ?Sized> SchemaResolver for &T {
	fn resolve_schema(&self, fingerprint: &[u8; 8]) -> Option<&Schema> {
		(**self).resolve_schema(fingerprint)
	}
}

/// Error produced by [`DynamicDecoder::decode_slice`]/[`DynamicDecoder::decode_reader`]
#[derive(Debug, thiserror::Error)]
pub enum DynamicDecodeError {
	#[error("Single object slice does not respect C3 01 header")]
	BadMagic,
	#[error("Slice is too short for single object encoding header")]
	TooShort,
	#[error("No schema registered for this single object encoding fingerprint")]
	UnknownSchema,
	#[error("Failed to decode avro datum: {0}")]
	Decode(#[source] DeError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// Decodes single-object-encoded data against a schema resolved at decode
/// time from the fingerprint carried in the header, rather than a schema
/// known up front
///
/// Typically used to decode into an untyped/dynamic target (e.g.
/// [`serde_json::Value`]) when the set of possible writer schemas isn't
/// known statically; can just as well decode into a concrete type that
/// happens to be shaped like one of several registered schemas.
pub struct DynamicDecoder<Res> {
	resolver: Res,
	dynamic_union_map_keys: bool,
}

impl<Res: SchemaResolver> DynamicDecoder<Res> {
	/// Build a decoder resolving schemas through `resolver`
	pub fn new(resolver: Res) -> Self {
		Self {
			resolver,
			dynamic_union_map_keys: false,
		}
	}

	/// When decoding a named union branch (record/enum/fixed) into an
	/// untyped target, wrap it in a single-entry map keyed by its Avro type
	/// tag instead of exposing it unwrapped (see
	/// [`DeserializerConfig::dynamic_union_map_keys`]). Off by default.
	pub fn with_dynamic_union_map_keys(mut self, enabled: bool) -> Self {
		self.dynamic_union_map_keys = enabled;
		self
	}

	/// The resolver this decoder looks schemas up through
	pub fn resolver(&self) -> &Res {
		&self.resolver
	}

	/// Decode a single-object-encoded slice
	///
	/// Zero-alloc for the datum itself: a target type containing `&'a str`s
	/// will borrow directly from `slice`.
	pub fn decode_slice<'a, T>(&self, slice: &'a [u8]) -> Result<T, DynamicDecodeError>
	where
		T: serde::Deserialize<'a>,
	{
		let header: &[u8; 10] = slice
			.get(0..10)
			.ok_or(DynamicDecodeError::TooShort)?
			.try_into()
			.unwrap();
		let schema = self.resolve(header)?;
		let mut config = DeserializerConfig::new(schema);
		config.dynamic_union_map_keys = self.dynamic_union_map_keys;
		serde::Deserialize::deserialize(
			DeserializerState::with_config(SliceRead::new(&slice[10..]), config).deserializer(),
		)
		.map_err(DynamicDecodeError::Decode)
	}

	/// Decode a single-object-encoded `impl BufRead`
	///
	/// If you only have an `impl Read`, wrap it in a
	/// [`BufReader`](std::io::BufReader) first. Prefer [`Self::decode_slice`]
	/// when decoding from a slice: it's faster and allows borrowing.
	pub fn decode_reader<R, T>(&self, mut reader: R) -> Result<T, DynamicDecodeError>
	where
		T: serde::de::DeserializeOwned,
		R: std::io::BufRead,
	{
		let mut header = [0u8; 10];
		reader.read_exact(&mut header)?;
		let schema = self.resolve(&header)?;
		let mut config = DeserializerConfig::new(schema);
		config.dynamic_union_map_keys = self.dynamic_union_map_keys;
		serde::Deserialize::deserialize(
			DeserializerState::with_config(de::read::ReaderRead::new(reader), config).deserializer(),
		)
		.map_err(DynamicDecodeError::Decode)
	}

	fn resolve(&self, header: &[u8; 10]) -> Result<&Schema, DynamicDecodeError> {
		if header[0..2] != MAGIC {
			return Err(DynamicDecodeError::BadMagic);
		}
		let fingerprint: [u8; 8] = header[2..10].try_into().unwrap();
		self.resolver
			.resolve_schema(&fingerprint)
			.ok_or(DynamicDecodeError::UnknownSchema)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ser;

	#[test]
	fn resolves_registered_schema_and_rejects_unknown() {
		let dynamic1: Schema = r#"{
			"type": "record",
			"name": "dynamic1",
			"fields": [
				{ "name": "name", "type": "string" },
				{ "name": "age", "type": "int" }
			]
		}"#
		.parse()
		.unwrap();

		#[derive(serde_derive::Serialize, serde_derive::Deserialize, Debug, PartialEq)]
		struct Dynamic1 {
			name: String,
			age: i32,
		}

		let encoded = super::super::to_single_object_vec(
			&Dynamic1 {
				name: "Bob".to_owned(),
				age: 16,
			},
			&mut ser::SerializerConfig::new(&dynamic1),
		)
		.unwrap();

		let mut registered = std::collections::HashMap::new();
		registered.insert(*dynamic1.rabin_fingerprint(), dynamic1);
		let decoder = DynamicDecoder::new(registered);

		let decoded: Dynamic1 = decoder.decode_slice(&encoded).unwrap();
		assert_eq!(
			decoded,
			Dynamic1 {
				name: "Bob".to_owned(),
				age: 16
			}
		);

		let other_schema: Schema = r#""string""#.parse().unwrap();
		let mut other_registered = std::collections::HashMap::new();
		other_registered.insert(*other_schema.rabin_fingerprint(), other_schema);
		let decoder_without_match = DynamicDecoder::new(other_registered);
		let err = decoder_without_match
			.decode_slice::<Dynamic1>(&encoded)
			.unwrap_err();
		assert!(matches!(err, DynamicDecodeError::UnknownSchema));
	}
}
