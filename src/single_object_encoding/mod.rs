//! [Single object encoding](https://avro.apache.org/docs/current/specification/#single-object-encoding)
//! a 10-byte prefix (`C3 01` magic plus
//! the writer schema's 8-byte CRC-64-AVRO fingerprint, little-endian) in
//! front of one avro datum, letting it self-identify against a schema
//! registry instead of a container file header.
//!
//! Two ways to consume this:
//! - [`from_single_object_slice`]/[`from_single_object_reader`] when the
//!   schema is already known up front (typed usage, mirrors
//!   [`crate::from_datum_slice`]/[`crate::from_datum_reader`]).
//! - [`dynamic::DynamicDecoder`] when the schema has to be looked up by its
//!   fingerprint at decode time (e.g. consuming a topic shared by several
//!   writer schemas).

mod dynamic;

pub use dynamic::{DynamicDecodeError, DynamicDecoder, SchemaResolver};

use crate::{de, ser, Schema};

const MAGIC: [u8; 2] = [0xC3, 0x01];

/// Deserialize from an avro single object encoding slice
///
/// This is zero-alloc.
///
/// Your structure may contain `&'a str`s that will end up pointing directly
/// into this slice for ideal performance.
pub fn from_single_object_slice<'a, T>(slice: &'a [u8], schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::Deserialize<'a>,
{
	let header: &[u8; 10] = slice
		.get(0..10)
		.ok_or_else(|| de::DeError::new("Slice is too short for single object encoding header"))?
		.try_into()
		.unwrap();
	check_header(header, schema)?;
	crate::from_datum_slice(&slice[10..], schema)
}

/// Deserialize from an avro single object encoding `impl BufRead`
///
/// If you only have an `impl Read`, wrap it in a
/// [`BufReader`](std::io::BufReader) first.
///
/// If deserializing from a slice, a `Vec`, ... prefer using
/// [`from_single_object_slice`], as it will be more performant and enable
/// you to borrow `&str`s from the original slice.
pub fn from_single_object_reader<R, T>(mut reader: R, schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::de::DeserializeOwned,
	R: std::io::BufRead,
{
	let mut header_buf = [0u8; 10];
	reader.read_exact(&mut header_buf).map_err(de::DeError::io)?;
	check_header(&header_buf, schema)?;
	crate::from_datum_reader(reader, schema)
}

fn check_magic(header: &[u8; 10]) -> Result<(), de::DeError> {
	if header[0..2] != MAGIC {
		return Err(de::DeError::new(
			"Single object slice does not respect C3 01 header",
		));
	}
	Ok(())
}

fn check_header(header: &[u8; 10], schema: &Schema) -> Result<(), de::DeError> {
	check_magic(header)?;
	if &header[2..10] != schema.rabin_fingerprint() {
		return Err(de::DeError::new(
			"Single object encoding fingerprint header does not match with schema fingerprint",
		));
	}
	Ok(())
}

/// Deserialize from an avro single object encoding slice, without checking
/// that the fingerprint in the header matches `schema`'s rabin fingerprint
///
/// The `C3 01` magic bytes are still validated; only the fingerprint
/// comparison is skipped. Useful when the caller already knows the writer
/// schema out of band (e.g. looked up once through a schema registry) and
/// wants to avoid recomputing/comparing the fingerprint on every message.
pub fn from_single_object_slice_unverified<'a, T>(slice: &'a [u8], schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::Deserialize<'a>,
{
	let header: &[u8; 10] = slice
		.get(0..10)
		.ok_or_else(|| de::DeError::new("Slice is too short for single object encoding header"))?
		.try_into()
		.unwrap();
	check_magic(header)?;
	crate::from_datum_slice(&slice[10..], schema)
}

/// Deserialize from an avro single object encoding `impl BufRead`, without
/// checking that the fingerprint in the header matches `schema`'s
///
/// See [`from_single_object_slice_unverified`] for details.
pub fn from_single_object_reader_unverified<R, T>(mut reader: R, schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::de::DeserializeOwned,
	R: std::io::BufRead,
{
	let mut header_buf = [0u8; 10];
	reader.read_exact(&mut header_buf).map_err(de::DeError::io)?;
	check_magic(&header_buf)?;
	crate::from_datum_reader(reader, schema)
}

/// Serialize to an avro single object encoding
///
/// to the provided writer
///
/// [`SerializerConfig`](ser::SerializerConfig) can be built from a schema:
/// ```
/// # use avro_codec::{ser, Schema};
/// let schema: Schema = r#""int""#.parse().unwrap();
/// let serializer_config = &mut ser::SerializerConfig::new(&schema);
///
/// let mut serialized: Vec<u8> =
/// 	avro_codec::single_object_encoding::to_single_object_vec(&3, serializer_config).unwrap();
/// assert_eq!(
/// 	serialized,
/// 	&[0xC3, 0x01, 143, 92, 57, 63, 26, 213, 117, 114, 6]
/// );
///
/// // reuse config and output buffer across serializations for ideal performance
/// serialized.clear();
/// let serialized =
/// 	avro_codec::single_object_encoding::to_single_object(&4, serialized, serializer_config)
/// 		.unwrap();
/// assert_eq!(
/// 	serialized,
/// 	&[0xC3, 0x01, 143, 92, 57, 63, 26, 213, 117, 114, 8]
/// );
/// ```
pub fn to_single_object<T, W>(
	value: &T,
	mut writer: W,
	serializer_config: &mut ser::SerializerConfig<'_>,
) -> Result<W, ser::SerError>
where
	T: serde::Serialize + ?Sized,
	W: std::io::Write,
{
	writer.write_all(&MAGIC).map_err(ser::SerError::io)?;
	writer
		.write_all(serializer_config.schema().rabin_fingerprint())
		.map_err(ser::SerError::io)?;
	crate::to_datum(value, writer, serializer_config)
}

/// Serialize to an avro single object encoding
///
/// to a newly allocated Vec
///
/// Note that unless you would otherwise allocate a `Vec` anyway, it will be
/// more efficient to use [`to_single_object`] instead.
///
/// See [`to_single_object`] for more details.
pub fn to_single_object_vec<T>(
	value: &T,
	serializer_config: &mut ser::SerializerConfig<'_>,
) -> Result<Vec<u8>, ser::SerError>
where
	T: serde::Serialize + ?Sized,
{
	to_single_object(value, Vec::new(), serializer_config)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roundtrips_through_single_object_encoding() {
		let schema: Schema = r#""string""#.parse().unwrap();
		let serializer_config = &mut ser::SerializerConfig::new(&schema);
		let encoded = to_single_object_vec(&"hello", serializer_config).unwrap();
		assert_eq!(&encoded[0..2], &MAGIC);
		assert_eq!(&encoded[2..10], schema.rabin_fingerprint());
		let decoded: &str = from_single_object_slice(&encoded, &schema).unwrap();
		assert_eq!(decoded, "hello");
	}

	#[test]
	fn rejects_bad_magic() {
		let schema: Schema = r#""int""#.parse().unwrap();
		let mut bad = vec![0x00, 0x00];
		bad.extend_from_slice(schema.rabin_fingerprint());
		bad.push(2);
		let res: Result<i32, _> = from_single_object_slice(&bad, &schema);
		assert!(res.is_err());
	}

	#[test]
	fn unverified_decode_skips_fingerprint_mismatch() {
		let schema: Schema = r#""int""#.parse().unwrap();
		let other_schema: Schema = r#""long""#.parse().unwrap();
		let serializer_config = &mut ser::SerializerConfig::new(&schema);
		let encoded = to_single_object_vec(&42, serializer_config).unwrap();

		// The header's fingerprint is for `schema`, not `other_schema`: a
		// verified decode against `other_schema` must fail...
		let verified: Result<i64, _> = from_single_object_slice(&encoded, &other_schema);
		assert!(verified.is_err());

		// ...but the caller can opt out of that check when it already knows
		// the data is compatible with the writer schema out of band (here,
		// `int` and `long` share the same zigzag-varint wire encoding).
		let unverified: i64 = from_single_object_slice_unverified(&encoded, &other_schema).unwrap();
		assert_eq!(unverified, 42);
	}

	#[test]
	fn unverified_decode_still_checks_magic() {
		let schema: Schema = r#""int""#.parse().unwrap();
		let mut bad = vec![0x00, 0x00];
		bad.extend_from_slice(schema.rabin_fingerprint());
		bad.push(2);
		let res: Result<i32, _> = from_single_object_slice_unverified(&bad, &schema);
		assert!(res.is_err());
	}
}
