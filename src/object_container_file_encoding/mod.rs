//! [Object Container File](https://avro.apache.org/docs/current/specification/#object-container-files)
//! reader and writer
//!
//! Unlike the raw datum codec in [`crate::ser`]/[`crate::de`], the header
//! (magic, schema, codec, sync marker) here is not produced by running a
//! schema-directed serializer against a fake metadata schema: it's written
//! and parsed directly as the fixed avro.schema/avro.codec/user-metadata map
//! the format describes, since there's no schema to direct it with until after
//! the header itself has been read.

mod reader;
mod writer;

pub use reader::{FailedToInitializeReader, Reader};
pub use writer::{SchemaMarshaling, Writer, WriterBuilder};

/// Magic bytes at the start of every object container file: `Obj` followed
/// by the format version (`1`)
const HEADER_CONST: [u8; 4] = [b'O', b'b', b'j', 1u8];

/// Compression codec used for the data blocks of an object container file
///
/// Construct via [`Compression`], which additionally carries the compression
/// level where the algorithm supports one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde_derive::Deserialize, serde_derive::Serialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum CompressionCodec {
	Null,
	#[cfg(feature = "deflate")]
	Deflate,
	#[cfg(feature = "bzip2")]
	Bzip2,
	#[cfg(feature = "snappy")]
	Snappy,
	#[cfg(feature = "xz")]
	Xz,
	#[cfg(feature = "zstandard")]
	Zstandard,
}
impl CompressionCodec {
	fn as_str(self) -> &'static str {
		match self {
			CompressionCodec::Null => "null",
			#[cfg(feature = "deflate")]
			CompressionCodec::Deflate => "deflate",
			#[cfg(feature = "bzip2")]
			CompressionCodec::Bzip2 => "bzip2",
			#[cfg(feature = "snappy")]
			CompressionCodec::Snappy => "snappy",
			#[cfg(feature = "xz")]
			CompressionCodec::Xz => "xz",
			#[cfg(feature = "zstandard")]
			CompressionCodec::Zstandard => "zstandard",
		}
	}
	fn from_str(s: &str) -> Option<Self> {
		Some(match s {
			"null" => CompressionCodec::Null,
			#[cfg(feature = "deflate")]
			"deflate" => CompressionCodec::Deflate,
			#[cfg(feature = "bzip2")]
			"bzip2" => CompressionCodec::Bzip2,
			#[cfg(feature = "snappy")]
			"snappy" => CompressionCodec::Snappy,
			#[cfg(feature = "xz")]
			"xz" => CompressionCodec::Xz,
			#[cfg(feature = "zstandard")]
			"zstandard" => CompressionCodec::Zstandard,
			_ => return None,
		})
	}
}

/// A compression codec, plus its level where the algorithm supports one
///
/// `Default::default()` is [`Compression::Null`].
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub enum Compression {
	Null,
	#[cfg(feature = "deflate")]
	Deflate { level: CompressionLevel },
	#[cfg(feature = "bzip2")]
	Bzip2 { level: CompressionLevel },
	#[cfg(feature = "snappy")]
	Snappy,
	#[cfg(feature = "xz")]
	Xz { level: CompressionLevel },
	#[cfg(feature = "zstandard")]
	Zstandard { level: CompressionLevel },
}
impl Default for Compression {
	fn default() -> Self {
		Compression::Null
	}
}
impl Compression {
	pub(super) fn codec(&self) -> CompressionCodec {
		match *self {
			Compression::Null => CompressionCodec::Null,
			#[cfg(feature = "deflate")]
			Compression::Deflate { .. } => CompressionCodec::Deflate,
			#[cfg(feature = "bzip2")]
			Compression::Bzip2 { .. } => CompressionCodec::Bzip2,
			#[cfg(feature = "snappy")]
			Compression::Snappy => CompressionCodec::Snappy,
			#[cfg(feature = "xz")]
			Compression::Xz { .. } => CompressionCodec::Xz,
			#[cfg(feature = "zstandard")]
			Compression::Zstandard { .. } => CompressionCodec::Zstandard,
		}
	}
}

/// A compression level for codecs that support one
///
/// `u8::MAX` is reserved to mean "use the algorithm's own default level",
/// which is what [`CompressionLevel::default`] returns.
#[derive(Clone, Copy)]
pub struct CompressionLevel {
	repr: std::num::NonZeroU8,
}
impl std::fmt::Debug for CompressionLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.repr.get() {
			u8::MAX => f.write_str("Default"),
			n => n.fmt(f),
		}
	}
}
impl Default for CompressionLevel {
	fn default() -> Self {
		Self {
			repr: std::num::NonZeroU8::new(u8::MAX).expect("u8::MAX is not zero"),
		}
	}
}
impl CompressionLevel {
	/// Build an explicit compression level
	///
	/// # Panics
	/// If `level` is `0`.
	pub fn new(level: u8) -> Self {
		Self {
			repr: std::num::NonZeroU8::new(level).expect("Compression level should not be 0"),
		}
	}
	fn clip(self, high: u8) -> u8 {
		match self.repr.get() {
			u8::MAX => high,
			n => n.min(high),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn compression_codec_serializes_properly() {
		assert_eq!(serde_json::to_string(&CompressionCodec::Null).unwrap(), "\"null\"");
		#[cfg(feature = "deflate")]
		assert_eq!(
			serde_json::to_string(&CompressionCodec::Deflate).unwrap(),
			"\"deflate\""
		);
	}

	#[test]
	fn header_const_is_the_documented_magic_bytes() {
		assert_eq!(HEADER_CONST, [b'O', b'b', b'j', 1]);
	}
}
