mod compression;
mod vectored_write_polyfill;

use {
	super::{Compression, CompressionCodec, HEADER_CONST},
	crate::ser::{SerError, SerializerConfig, SerializerState},
	compression::CompressionCodecState,
	integer_encoding::{VarIntReader, VarIntWriter},
	serde::{ser::Error as _, Serialize},
	std::{
		io::{Read, Seek, SeekFrom, Write},
		num::NonZeroUsize,
	},
	vectored_write_polyfill::write_all_vectored,
};

/// Which form of the schema gets written into the `avro.schema` header entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaMarshaling {
	/// Write the [parsing canonical form](crate::Schema::clone_canonical_form):
	/// aliases, doc, and non-standard properties are stripped
	Canonical,
	/// Write the schema exactly as it was originally parsed (or, for a
	/// programmatically-built schema, its re-serialized JSON form)
	Full,
}
impl Default for SchemaMarshaling {
	fn default() -> Self {
		SchemaMarshaling::Canonical
	}
}

/// Builder for a [`Writer`]
///
/// # Example
/// ```
/// let schema: avro_codec::Schema = r#"{"type": "string"}"#.parse().unwrap();
/// let serializer_config = &mut avro_codec::ser::SerializerConfig::new(&schema);
/// let mut writer = avro_codec::object_container_file_encoding::WriterBuilder::new(serializer_config)
/// 	.sync_marker([0; 16])
/// 	.build(Vec::new())
/// 	.expect("Failed to build writer");
/// writer.serialize("foo").expect("Failed to serialize");
/// let file_contents = writer.into_inner().expect("Failed to finalize writer");
/// assert!(!file_contents.is_empty());
/// ```
pub struct WriterBuilder<'c, 's> {
	serializer_config: &'c mut SerializerConfig<'s>,
	compression: Compression,
	approx_block_size: u32,
	sync_marker: Option<[u8; 16]>,
	schema_marshaling: SchemaMarshaling,
}

impl<'c, 's> WriterBuilder<'c, 's> {
	/// Start building a `Writer` that will serialize against this schema
	pub fn new(serializer_config: &'c mut SerializerConfig<'s>) -> Self {
		Self {
			serializer_config,
			compression: Compression::Null,
			approx_block_size: 64 * 1024,
			sync_marker: None,
			schema_marshaling: SchemaMarshaling::default(),
		}
	}

	/// Set the compression codec for the data blocks (default [`Compression::Null`])
	pub fn compression(&mut self, compression: Compression) -> &mut Self {
		self.compression = compression;
		self
	}

	/// Target size in bytes for a block's uncompressed contents before it gets
	/// flushed (default `64 * 1024`)
	///
	/// This is approximate: a block is only flushed once the datum being
	/// serialized when crossing the threshold has been written in full.
	pub fn approx_block_size(&mut self, approx_block_size: u32) -> &mut Self {
		self.approx_block_size = approx_block_size;
		self
	}

	/// Force a specific sync marker instead of generating a random one
	///
	/// Mostly useful for reproducible tests.
	pub fn sync_marker(&mut self, sync_marker: [u8; 16]) -> &mut Self {
		self.sync_marker = Some(sync_marker);
		self
	}

	/// Choose which form of the schema gets written into the `avro.schema`
	/// header entry (default [`SchemaMarshaling::Canonical`])
	///
	/// The canonical form is smaller and is what another reader will compute
	/// a compatible fingerprint from regardless of which form was written, so
	/// there is rarely a reason to write the full form other than wanting the
	/// file's header to be human-legible with its original docs/aliases.
	pub fn schema_marshaling(&mut self, schema_marshaling: SchemaMarshaling) -> &mut Self {
		self.schema_marshaling = schema_marshaling;
		self
	}

	/// Build the `Writer`, writing the object container file header
	/// (magic, schema, codec, sync marker) to `writer` immediately
	pub fn build<W: Write>(&'c mut self, writer: W) -> Result<Writer<'c, 's, W>, SerError> {
		self.build_with_user_metadata(writer, &[])
	}

	/// Same as [`Self::build`], additionally writing arbitrary key/value
	/// metadata entries in the header (user metadata keys must not start
	/// with `avro.`, which is reserved for Avro's own use)
	pub fn build_with_user_metadata<W: Write>(
		&'c mut self,
		mut writer: W,
		user_metadata: &[(&str, &[u8])],
	) -> Result<Writer<'c, 's, W>, SerError> {
		let sync_marker = match self.sync_marker {
			Some(marker) => marker,
			None => {
				let mut marker = [0u8; 16];
				rand::Rng::fill(&mut rand::thread_rng(), &mut marker);
				marker
			}
		};
		let schema_json = match self.schema_marshaling {
			SchemaMarshaling::Canonical => self.serializer_config.schema().clone_canonical_form(),
			SchemaMarshaling::Full => self.serializer_config.schema().json().to_owned(),
		};
		write_header(
			&mut writer,
			&schema_json,
			self.compression.codec(),
			user_metadata,
			&sync_marker,
		)?;
		let compression = self.compression;
		let codec = compression.codec();
		let approx_block_size = self.approx_block_size;
		// Reborrow for exactly `'c`: valid because `self` itself is `&'c mut
		// Self` and isn't used again after this point.
		let serializer_config: &'c mut SerializerConfig<'s> = &mut *self.serializer_config;
		Ok(Writer {
			inner: WriterInner::new(
				serializer_config,
				compression,
				codec,
				schema_json,
				approx_block_size,
				sync_marker,
			),
			writer: Some(writer),
		})
	}

	/// Build a `Writer` that appends further blocks to an already-existing
	/// object container file instead of starting a new one
	///
	/// The existing file's header (schema, codec, sync marker) is read back
	/// and reused as-is: this builder's [`compression`](Self::compression),
	/// [`sync_marker`](Self::sync_marker) and
	/// [`schema_marshaling`](Self::schema_marshaling) settings are ignored for
	/// appending, since a mid-file block must match the blocks that precede
	/// it. The schema this builder was constructed with is only used to check
	/// that its fingerprint matches the existing file's schema; the data
	/// itself will still be serialized against that schema.
	pub fn append_to<RW: Read + Write + Seek>(
		&'c mut self,
		mut writer: RW,
	) -> Result<Writer<'c, 's, RW>, SerError> {
		writer.seek(SeekFrom::Start(0)).map_err(SerError::io)?;
		let (codec, schema_json, sync_marker) =
			read_existing_header(&mut writer, self.serializer_config.schema())?;
		writer.seek(SeekFrom::End(0)).map_err(SerError::io)?;
		let compression = compression_for_codec(codec);
		let approx_block_size = self.approx_block_size;
		let serializer_config: &'c mut SerializerConfig<'s> = &mut *self.serializer_config;
		Ok(Writer {
			inner: WriterInner::new(
				serializer_config,
				compression,
				codec,
				schema_json,
				approx_block_size,
				sync_marker,
			),
			writer: Some(writer),
		})
	}
}

/// Turns a bare codec identity back into a [`Compression`] suitable for
/// [`WriterInner::new`]; the level only matters for encoding, so any already
/// written block (encoded by whatever writer appended before us) decodes the
/// same regardless of which level we pick here.
fn compression_for_codec(codec: CompressionCodec) -> Compression {
	match codec {
		CompressionCodec::Null => Compression::Null,
		#[cfg(feature = "deflate")]
		CompressionCodec::Deflate => Compression::Deflate { level: Default::default() },
		#[cfg(feature = "bzip2")]
		CompressionCodec::Bzip2 => Compression::Bzip2 { level: Default::default() },
		#[cfg(feature = "snappy")]
		CompressionCodec::Snappy => Compression::Snappy,
		#[cfg(feature = "xz")]
		CompressionCodec::Xz => Compression::Xz { level: Default::default() },
		#[cfg(feature = "zstandard")]
		CompressionCodec::Zstandard => Compression::Zstandard { level: Default::default() },
	}
}

/// Reads and validates an existing object container file's header off of a
/// plain [`Read`] (as opposed to [`Reader`](super::Reader), which is built on
/// top of this crate's buffer-oriented `ReadSlice`), returning its codec and
/// sync marker for reuse by [`WriterBuilder::append_to`].
fn read_existing_header<R: Read>(
	reader: &mut R,
	expected_schema: &crate::Schema,
) -> Result<(CompressionCodec, String, [u8; 16]), SerError> {
	let mut magic = [0u8; 4];
	reader.read_exact(&mut magic).map_err(SerError::io)?;
	if magic != HEADER_CONST {
		return Err(SerError::new(
			"Existing file does not start with the object container file magic bytes",
		));
	}
	let mut schema_json = None;
	let mut codec_str = None;
	loop {
		let block_count: i64 = reader.read_varint().map_err(SerError::io)?;
		let n_entries = match block_count {
			0 => break,
			n if n < 0 => {
				let _byte_count: i64 = reader.read_varint().map_err(SerError::io)?;
				(-n) as usize
			}
			n => n as usize,
		};
		for _ in 0..n_entries {
			let key = read_header_string(reader)?;
			let value = read_header_bytes(reader)?;
			match key.as_str() {
				"avro.schema" => schema_json = Some(String::from_utf8(value).map_err(|_| {
					SerError::new("Existing file's avro.schema header entry is not valid UTF-8")
				})?),
				"avro.codec" => codec_str = Some(String::from_utf8(value).map_err(|_| {
					SerError::new("Existing file's avro.codec header entry is not valid UTF-8")
				})?),
				_ => {}
			}
		}
	}
	let schema_json = schema_json
		.ok_or_else(|| SerError::new("Existing file's header is missing the avro.schema entry"))?;
	let codec = match codec_str.as_deref() {
		None => CompressionCodec::Null,
		Some(s) => CompressionCodec::from_str(s)
			.ok_or_else(|| SerError::custom(format_args!("Existing file uses unknown codec {s:?}")))?,
	};
	let existing_schema: crate::Schema = schema_json
		.parse()
		.map_err(|e| SerError::custom(format_args!("Failed to parse existing file's schema: {e}")))?;
	if existing_schema.rabin_fingerprint() != expected_schema.rabin_fingerprint() {
		return Err(SerError::new(
			"Existing file's schema fingerprint does not match the schema this writer was built with",
		));
	}
	let mut sync_marker = [0u8; 16];
	reader.read_exact(&mut sync_marker).map_err(SerError::io)?;
	Ok((codec, schema_json, sync_marker))
}

fn read_header_string<R: Read>(reader: &mut R) -> Result<String, SerError> {
	String::from_utf8(read_header_bytes(reader)?)
		.map_err(|_| SerError::new("Existing file's header contains a non-UTF-8 metadata key"))
}

fn read_header_bytes<R: Read>(reader: &mut R) -> Result<Vec<u8>, SerError> {
	let len: i64 = reader.read_varint().map_err(SerError::io)?;
	let len: usize = len
		.try_into()
		.map_err(|_| SerError::new("Existing file's header contains an invalid length"))?;
	let mut buf = vec![0u8; len];
	reader.read_exact(&mut buf).map_err(SerError::io)?;
	Ok(buf)
}

fn write_header<W: Write>(
	writer: &mut W,
	schema_json: &str,
	codec: CompressionCodec,
	user_metadata: &[(&str, &[u8])],
	sync_marker: &[u8; 16],
) -> Result<(), SerError> {
	writer.write_all(&HEADER_CONST).map_err(SerError::io)?;
	writer
		.write_varint::<i64>((2 + user_metadata.len()) as i64)
		.map_err(SerError::io)?;
	write_map_entry(writer, "avro.schema", schema_json.as_bytes())?;
	write_map_entry(writer, "avro.codec", codec.as_str().as_bytes())?;
	for &(key, value) in user_metadata {
		write_map_entry(writer, key, value)?;
	}
	writer.write_varint::<i64>(0).map_err(SerError::io)?;
	writer.write_all(sync_marker).map_err(SerError::io)?;
	Ok(())
}

fn write_map_entry<W: Write>(writer: &mut W, key: &str, value: &[u8]) -> Result<(), SerError> {
	writer
		.write_varint::<i64>(key.len() as i64)
		.map_err(SerError::io)?;
	writer.write_all(key.as_bytes()).map_err(SerError::io)?;
	writer
		.write_varint::<i64>(value.len() as i64)
		.map_err(SerError::io)?;
	writer.write_all(value).map_err(SerError::io)?;
	Ok(())
}

/// Writer for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
pub struct Writer<'c, 's, W: Write> {
	inner: WriterInner<'c, 's>,
	writer: Option<W>,
}

impl<'c, 's, W: Write> Writer<'c, 's, W> {
	/// Serialize a single value as the next datum in the file
	///
	/// Automatically starts a new block once the current one has reached
	/// [`WriterBuilder::approx_block_size`].
	pub fn serialize<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerError> {
		self.flush_finished_block()?;
		self.inner.serialize(value)?;
		if self.inner.serializer_state.writer().len() >= self.inner.approx_block_size as usize {
			self.finish_block()?;
		}
		Ok(())
	}

	/// Serialize every value of the iterator as successive data in the file
	pub fn serialize_all<T: Serialize>(
		&mut self,
		values: impl IntoIterator<Item = T>,
	) -> Result<(), SerError> {
		for value in values {
			self.serialize(&value)?;
		}
		Ok(())
	}

	/// Append already-serialized datums (back-to-back, matching this writer's
	/// schema) to the current block without re-serializing them
	///
	/// `n_objects` must match the number of datums contained in
	/// `serialized_objects`.
	pub fn push_serialized(
		&mut self,
		serialized_objects: &[u8],
		n_objects: u64,
	) -> Result<(), SerError> {
		self.flush_finished_block()?;
		self.inner
			.serializer_state
			.writer_mut()
			.extend_from_slice(serialized_objects);
		self.inner.n_elements_in_block += n_objects;
		if self.inner.serializer_state.writer().len() >= self.inner.approx_block_size as usize {
			self.finish_block()?;
		}
		Ok(())
	}

	/// Force the current block to be finished (compressed and queued to be
	/// written out), even if it hasn't reached `approx_block_size` yet
	///
	/// The block header and compressed bytes are only physically written to
	/// the underlying writer on the next call that needs to (`serialize`,
	/// `push_serialized`, `finish_block` again, or `into_inner`), so that a
	/// block can still be entirely aborted by dropping the `Writer`... this
	/// only matters in that it keeps one block worth of latency, not that it
	/// meaningfully changes behavior.
	pub fn finish_block(&mut self) -> Result<(), SerError> {
		self.inner.finish_block()
	}

	fn flush_finished_block(&mut self) -> Result<(), SerError> {
		if let Some(block_header_size) = self.inner.block_header_size.take() {
			let header = &self.inner.block_header_buffer[..block_header_size.get()];
			let body = self.inner.compressed_block();
			let writer = self.writer.as_mut().expect("writer only taken on into_inner");
			write_all_vectored(writer, [header, body, &self.inner.sync_marker[..]])
				.map_err(SerError::io)?;
			self.inner.serializer_state.writer_mut().clear();
		}
		Ok(())
	}

	/// Finish writing any buffered block, then return the underlying writer
	pub fn into_inner(mut self) -> Result<W, SerError> {
		if self.inner.n_elements_in_block > 0 {
			self.finish_block()?;
		}
		self.flush_finished_block()?;
		Ok(self.writer.take().expect("writer only taken here"))
	}

	/// The underlying writer
	pub fn inner(&self) -> &W {
		self.writer.as_ref().expect("writer only taken on into_inner")
	}

	/// The underlying writer, mutably
	pub fn inner_mut(&mut self) -> &mut W {
		self.writer.as_mut().expect("writer only taken on into_inner")
	}

	/// Flush the current pending block to the current writer, then switch
	/// this `Writer` over to `new_writer`: a fresh sync marker is generated
	/// and a new header (same schema and codec, new sync marker) is written
	/// to it. Returns the previous underlying writer.
	///
	/// Useful for splitting a long-running stream of data into successive
	/// files (e.g. file rotation) without having to rebuild a `Writer` (and
	/// re-borrow the `SerializerConfig`) from scratch.
	pub fn reset<W2: Write>(self, mut new_writer: W2) -> Result<(W, Writer<'c, 's, W2>), SerError> {
		// `Writer` has a `Drop` impl, so its `inner` field can't be moved out
		// of `self` directly; go through `ManuallyDrop` instead.
		let mut this = std::mem::ManuallyDrop::new(self);
		if this.inner.n_elements_in_block > 0 {
			this.finish_block()?;
		}
		this.flush_finished_block()?;
		let old_writer = this.writer.take().expect("writer only taken here");
		let mut sync_marker = [0u8; 16];
		rand::Rng::fill(&mut rand::thread_rng(), &mut sync_marker);
		write_header(
			&mut new_writer,
			&this.inner.schema_json,
			this.inner.codec,
			&[],
			&sync_marker,
		)?;
		// SAFETY: `this` is `ManuallyDrop` and is never used again after this
		// read, so its destructor never runs and this isn't a double-move.
		let mut inner = unsafe { std::ptr::read(&this.inner) };
		inner.sync_marker = sync_marker;
		Ok((old_writer, Writer { inner, writer: Some(new_writer) }))
	}
}

impl<W: Write> Drop for Writer<'_, '_, W> {
	fn drop(&mut self) {
		if self.writer.is_some() {
			if self.inner.n_elements_in_block > 0 {
				let _ = self.inner.finish_block();
			}
			let _ = self.flush_finished_block();
		}
	}
}

struct WriterInner<'c, 's> {
	serializer_state: SerializerState<'c, 's, Vec<u8>>,
	n_elements_in_block: u64,
	approx_block_size: u32,
	sync_marker: [u8; 16],
	block_header_buffer: [u8; 20],
	block_header_size: Option<NonZeroUsize>,
	/// Exact bytes written as the `avro.schema` header entry; kept around so
	/// [`Writer::reset`] can re-emit an identical header on the new writer.
	schema_json: String,
	codec: CompressionCodec,
	/// Placed last because it's potentially large (e.g. the zstd compressor)
	compression_codec_state: CompressionCodecState,
}

impl<'c, 's> WriterInner<'c, 's> {
	fn new(
		config: &'c mut SerializerConfig<'s>,
		compression: Compression,
		codec: CompressionCodec,
		schema_json: String,
		approx_block_size: u32,
		sync_marker: [u8; 16],
	) -> Self {
		Self {
			serializer_state: SerializerState::from_writer(Vec::new(), config),
			n_elements_in_block: 0,
			approx_block_size,
			sync_marker,
			block_header_buffer: [0; 20],
			block_header_size: None,
			schema_json,
			codec,
			compression_codec_state: CompressionCodecState::new(compression),
		}
	}

	fn serialize<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SerError> {
		value.serialize(self.serializer_state.serializer())?;
		self.n_elements_in_block += 1;
		Ok(())
	}

	fn finish_block(&mut self) -> Result<(), SerError> {
		if self.n_elements_in_block == 0 {
			return Ok(());
		}
		self.compression_codec_state
			.encode(self.serializer_state.writer())?;
		let block_len = self.compressed_block().len();
		let n1 = <i64 as integer_encoding::VarInt>::encode_var(
			self.n_elements_in_block as i64,
			&mut self.block_header_buffer,
		);
		let n2 = <i64 as integer_encoding::VarInt>::encode_var(
			block_len as i64,
			&mut self.block_header_buffer[n1..],
		);
		self.block_header_size = NonZeroUsize::new(n1 + n2);
		self.n_elements_in_block = 0;
		Ok(())
	}

	fn compressed_block(&self) -> &[u8] {
		self.compression_codec_state
			.compressed_buffer()
			.unwrap_or_else(|| self.serializer_state.writer())
	}
}
