mod decompression;

use {
	crate::{
		de::{
			read::{take::Take, Read as _, ReadSlice},
			DeError, DeserializerConfig, DeserializerState,
		},
		object_container_file_encoding::{CompressionCodec, HEADER_CONST},
		schema::Schema,
	},
	decompression::DecompressionState,
	serde::de::{DeserializeOwned, DeserializeSeed, Deserialize},
	std::{marker::PhantomData, sync::Arc},
};

/// Reader for [object container files](https://avro.apache.org/docs/current/specification/#object-container-files)
///
/// # Example
/// ```
/// let avro_object_container_file_encoded: &[u8] = &[
/// 	79, 98, 106, 1, 4, 22, 97, 118, 114, 111, 46, 115, 99, 104, 101, 109, 97, 222, 1, 123, 34,
/// 	116, 121, 112, 101, 34, 58, 34, 114, 101, 99, 111, 114, 100, 34, 44, 34, 110, 97, 109, 101,
/// 	34, 58, 34, 116, 101, 115, 116, 34, 44, 34, 102, 105, 101, 108, 100, 115, 34, 58, 91, 123,
/// 	34, 110, 97, 109, 101, 34, 58, 34, 97, 34, 44, 34, 116, 121, 112, 101, 34, 58, 34, 108,
/// 	111, 110, 103, 34, 44, 34, 100, 101, 102, 97, 117, 108, 116, 34, 58, 52, 50, 125, 44, 123,
/// 	34, 110, 97, 109, 101, 34, 58, 34, 98, 34, 44, 34, 116, 121, 112, 101, 34, 58, 34, 115,
/// 	116, 114, 105, 110, 103, 34, 125, 93, 125, 20, 97, 118, 114, 111, 46, 99, 111, 100, 101,
/// 	99, 8, 110, 117, 108, 108, 0, 94, 61, 54, 221, 190, 207, 108, 180, 158, 57, 114, 40, 173,
/// 	199, 228, 239, 4, 20, 54, 6, 102, 111, 111, 84, 6, 98, 97, 114, 94, 61, 54, 221, 190, 207,
/// 	108, 180, 158, 57, 114, 40, 173, 199, 228, 239,
/// ];
///
/// #[derive(serde_derive::Deserialize, Debug, PartialEq, Eq)]
/// struct SchemaRecord<'a> {
/// 	a: i64,
/// 	b: &'a str,
/// }
///
/// let mut reader = avro_codec::object_container_file_encoding::Reader::from_slice(
/// 	avro_object_container_file_encoded,
/// )
/// .expect("Failed to initialize reader");
///
/// let expected = vec![
/// 	SchemaRecord { a: 27, b: "foo" },
/// 	SchemaRecord { a: 42, b: "bar" },
/// ];
/// let res: Vec<SchemaRecord> = reader
/// 	.deserialize_borrowed::<SchemaRecord>() // Only use `_borrowed` if data is not compressed
/// 	.collect::<Result<_, _>>()
/// 	.expect("Failed to deserialize a record");
///
/// assert_eq!(expected, res);
/// ```
///
/// # Notes
///
/// Works from either slices or arbitrary `impl BufRead`s.
///
/// If you only have an `impl Read`, wrap it in a [`BufReader`](std::io::BufReader) first.
///
/// Slice version enables borrowing from the input if there is no compression involved.
pub struct Reader<R: Take> {
	// the 'static here is fake, it in fact is bound to `Schema` not being dropped.
	// Struct fields are dropped in order of declaration, so this is dropped before `schema`.
	reader_state: ReaderState<R>,
	compression_codec: CompressionCodec,
	sync_marker: [u8; 16],
	/// If we hit an IO error, we yield it once, then for following calls to
	/// `deserialize_next` we pretend that we reached EOF. IO errors will
	/// typically reproduce at every call, and we don't want to keep yielding
	/// the same error over and over if the caller tries to recover.
	pretend_eof_because_yielded_unrecoverable_error: bool,
	schema: Arc<Schema>,
}

/// Errors that may happen when attempting to construct a [`Reader`]
#[derive(Debug, thiserror::Error)]
pub enum FailedToInitializeReader {
	/// Does not begin by `Obj1` as per spec
	#[error("Reader input is not an avro object container file: could not match the header")]
	NotAvroObjectContainerFile,
	/// The header could not be read as per the object container file framing
	#[error("Failed to read avro object container file header: {}", _0)]
	FailedToDeserializeHeader(DeError),
	/// The avro schema in the header could not be parsed
	#[error("Failed to parse schema in avro object container file: {}", _0)]
	FailedToParseSchema(crate::schema::SchemaError),
}

impl<'a> Reader<crate::de::read::SliceRead<'a>> {
	/// Initialize a `Reader` from a slice
	///
	/// Useful if the entire file has already been loaded in memory and you
	/// wish to deserialize borrowing from this slice.
	///
	/// Deserialization will only be able to borrow from this slice if there
	/// is no compression codec. To be safe in both cases, use `Cow<str>`
	/// tagged with `#[serde(borrow)]`.
	pub fn from_slice(slice: &'a [u8]) -> Result<Self, FailedToInitializeReader> {
		Self::new(crate::de::read::SliceRead::new(slice))
	}
}

impl<R: std::io::BufRead> Reader<crate::de::read::ReaderRead<R>> {
	/// Initialize a `Reader` from any `impl BufRead`
	///
	/// If your reader only has [`Read`](std::io::Read), wrap it in a
	/// [`std::io::BufReader`] first.
	pub fn from_reader(reader: R) -> Result<Self, FailedToInitializeReader> {
		Self::new(crate::de::read::ReaderRead::new(reader))
	}
}

impl<R> Reader<R>
where
	R: crate::de::read::Read + Take + std::io::BufRead,
	<R as Take>::Take: std::io::BufRead,
{
	/// You should typically use `from_slice` or `from_reader` instead
	pub fn new<'de>(reader: R) -> Result<Self, FailedToInitializeReader>
	where
		R: ReadSlice<'de>,
	{
		Self::new_and_metadata(reader).map(|(reader, _user_metadata)| reader)
	}

	/// Build a `Reader`, also returning whatever custom metadata was stored
	/// in the header in addition to the avro-reserved `avro.schema`/`avro.codec`
	pub fn new_and_metadata<'de>(
		mut reader: R,
	) -> Result<(Self, Vec<(String, Vec<u8>)>), FailedToInitializeReader>
	where
		R: ReadSlice<'de>,
	{
		if reader
			.read_const_size_buf::<4>()
			.map_err(FailedToInitializeReader::FailedToDeserializeHeader)?
			!= HEADER_CONST
		{
			return Err(FailedToInitializeReader::NotAvroObjectContainerFile);
		}

		let (schema_json, codec_str, user_metadata) = read_header_metadata(&mut reader)
			.map_err(FailedToInitializeReader::FailedToDeserializeHeader)?;
		let compression_codec = CompressionCodec::from_str(&codec_str).ok_or_else(|| {
			FailedToInitializeReader::FailedToDeserializeHeader(<DeError as serde::de::Error>::custom(
				format_args!("Unknown avro.codec {codec_str:?}"),
			))
		})?;
		let schema: Arc<Schema> = Arc::new(
			schema_json
				.parse()
				.map_err(FailedToInitializeReader::FailedToParseSchema)?,
		);

		let sync_marker = reader
			.read_const_size_buf::<16>()
			.map_err(FailedToInitializeReader::FailedToDeserializeHeader)?;

		// Safety: `reader_state` (which ends up holding a `DeserializerConfig`
		// borrowing from this) is declared before `schema` in `Self`, so it is
		// dropped first.
		let schema_root: &'static Schema = unsafe { schema.with_fake_static_lifetime() };

		Ok((
			Self {
				reader_state: ReaderState::NotInBlock {
					reader,
					config: DeserializerConfig::new(schema_root),
					decompression_buffer: Vec::new(),
				},
				compression_codec,
				sync_marker,
				pretend_eof_because_yielded_unrecoverable_error: false,
				schema,
			},
			user_metadata,
		))
	}

	/// Iterator over the deserialized values
	pub fn deserialize<'r, 'rs, T: DeserializeOwned>(
		&'r mut self,
	) -> impl Iterator<Item = Result<T, DeError>> + 'r
	where
		R: ReadSlice<'rs>,
		<R as Take>::Take: ReadSlice<'rs>,
	{
		self.deserialize_inner()
	}

	/// Iterator over the deserialized values
	///
	/// Only usable when reading directly from a slice (`Reader` built via
	/// [`Reader::from_slice`]).
	///
	/// May fail if `T` borrows from the input and the blocks are compressed
	/// (`deserialize_next` instead requires `DeserializeOwned` to rule that out).
	pub fn deserialize_borrowed<'r, 'de, T: Deserialize<'de>>(
		&'r mut self,
	) -> impl Iterator<Item = Result<T, DeError>> + 'r
	where
		R: ReadSlice<'de> + IsSliceRead,
		<R as Take>::Take: ReadSlice<'de>,
	{
		Self::deserialize_inner::<T>(self)
	}

	fn deserialize_inner<'r, 'de, T: Deserialize<'de>>(
		&'r mut self,
	) -> impl Iterator<Item = Result<T, DeError>> + 'r
	where
		R: ReadSlice<'de>,
		<R as Take>::Take: ReadSlice<'de>,
	{
		std::iter::from_fn(|| self.deserialize_seed_next(PhantomData::<T>).transpose())
	}

	/// Attempt to deserialize the next value
	pub fn deserialize_next<'a, T: DeserializeOwned>(&mut self) -> Result<Option<T>, DeError>
	where
		R: ReadSlice<'a>,
		<R as Take>::Take: ReadSlice<'a>,
	{
		self.deserialize_seed_next(PhantomData::<T>)
	}

	/// Attempt to deserialize the next value
	///
	/// Only usable when reading directly from a slice.
	pub fn deserialize_next_borrowed<'de, T: Deserialize<'de>>(
		&mut self,
	) -> Result<Option<T>, DeError>
	where
		R: ReadSlice<'de> + IsSliceRead,
		<R as Take>::Take: ReadSlice<'de>,
	{
		self.deserialize_seed_next(PhantomData::<T>)
	}

	/// Attempt to deserialize the next value via the advanced [`DeserializeSeed`] API
	pub fn deserialize_seed_next<'de, S: DeserializeSeed<'de>>(
		&mut self,
		deserialize_seed: S,
	) -> Result<Option<S::Value>, DeError>
	where
		R: ReadSlice<'de>,
		<R as Take>::Take: ReadSlice<'de>,
	{
		if self.pretend_eof_because_yielded_unrecoverable_error {
			return Ok(None);
		}
		let res = self.deserialize_next_inner(deserialize_seed);
		if let Err(ref de_error) = res {
			if de_error.io_error().is_some() || matches!(self.reader_state, ReaderState::Broken) {
				self.pretend_eof_because_yielded_unrecoverable_error = true;
			}
		}
		res
	}

	fn deserialize_next_inner<'de, S: DeserializeSeed<'de>>(
		&mut self,
		deserialize_seed: S,
	) -> Result<Option<S::Value>, DeError>
	where
		R: ReadSlice<'de>,
		<R as Take>::Take: ReadSlice<'de>,
	{
		loop {
			match &mut self.reader_state {
				ReaderState::Broken => {
					return Err(DeError::new(
						"Object container file reader is broken after error",
					))
				}
				ReaderState::NotInBlock { reader, .. } => {
					if reader
						.fill_buf()
						.map(|b| b.is_empty())
						.map_err(DeError::io)?
					{
						break Ok(None);
					}
					let (mut reader, config, decompression_buffer) =
						match std::mem::replace(&mut self.reader_state, ReaderState::Broken) {
							ReaderState::NotInBlock {
								reader,
								config,
								decompression_buffer,
							} => (reader, config, decompression_buffer),
							_ => unreachable!(),
						};
					let n_objects_in_block: i64 = reader.read_varint()?;
					let n_objects_in_block: usize = n_objects_in_block
						.try_into()
						.map_err(|_| DeError::new("Invalid container file block object count"))?;
					let block_size: i64 = reader.read_varint()?;
					let block_size: usize = block_size
						.try_into()
						.map_err(|_| DeError::new("Invalid container file block size in bytes"))?;
					if n_objects_in_block == 0 {
						// A block may legally advertise 0 objects with a nonzero byte
						// size (e.g. an encoder that pads/reserves space): skip the
						// payload without trying to deserialize anything out of it,
						// then validate the sync marker and keep looking for data.
						reader.read_slice(block_size, |_: &[u8]| Ok::<_, DeError>(()))?;
						let sync_marker = reader.read_const_size_buf::<16>()?;
						if sync_marker != self.sync_marker {
							return Err(DeError::new("Incorrect sync marker at end of block"));
						}
						self.reader_state = ReaderState::NotInBlock {
							reader,
							config,
							decompression_buffer,
						};
						continue;
					}
					let codec_data = self.compression_codec.state(
						reader,
						config,
						decompression_buffer,
						block_size,
					)?;
					self.reader_state = ReaderState::InBlock {
						codec_data,
						n_objects_in_block,
					};
				}
				ReaderState::InBlock {
					codec_data,
					n_objects_in_block,
				} => match n_objects_in_block.checked_sub(1) {
					None => match std::mem::replace(&mut self.reader_state, ReaderState::Broken) {
						ReaderState::InBlock { codec_data, .. } => {
							let (mut reader, config, decompression_buffer) =
								codec_data.into_source_reader_and_config()?;
							let sync_marker = reader.read_const_size_buf::<16>()?;
							if sync_marker != self.sync_marker {
								return Err(DeError::new("Incorrect sync marker at end of block"));
							}
							self.reader_state = ReaderState::NotInBlock {
								reader,
								config,
								decompression_buffer,
							}
						}
						_ => unreachable!(),
					},
					Some(next_n_in_block) => {
						*n_objects_in_block = next_n_in_block;
						break match codec_data {
							DecompressionState::Null {
								deserializer_state, ..
							} => deserialize_seed.deserialize(deserializer_state.deserializer()),
							#[cfg(any(
								feature = "deflate",
								feature = "bzip2",
								feature = "xz",
								feature = "zstandard"
							))]
							DecompressionState::BufReader {
								deserializer_state, ..
							} => deserialize_seed.deserialize(deserializer_state.deserializer()),
							#[cfg(feature = "snappy")]
							DecompressionState::DecompressedOnConstruction {
								deserializer_state,
								..
							} => deserialize_seed.deserialize(deserializer_state.deserializer()),
						}
						.map(Some);
					}
				},
			}
		}
	}

	/// The schema read from the header of the object container file
	pub fn schema(&self) -> &Arc<Schema> {
		&self.schema
	}
}

enum ReaderState<R: Take> {
	Broken,
	NotInBlock {
		reader: R,
		config: DeserializerConfig<'static>,
		decompression_buffer: Vec<u8>,
	},
	InBlock {
		codec_data: DecompressionState<'static, R>,
		n_objects_in_block: usize,
	},
}

/// Reads the avro-map-encoded header metadata (`avro.schema`, `avro.codec`,
/// and any extra user entries), up to (not including) the sync marker
fn read_header_metadata<'de, R: ReadSlice<'de>>(
	reader: &mut R,
) -> Result<(String, String, Vec<(String, Vec<u8>)>), DeError> {
	let mut schema_json = None;
	let mut codec = None;
	let mut user_metadata = Vec::new();
	loop {
		let count: i64 = reader.read_varint()?;
		let count = match count {
			0 => break,
			n if n < 0 => {
				let _block_size_in_bytes: i64 = reader.read_varint()?;
				(-n) as usize
			}
			n => n as usize,
		};
		for _ in 0..count {
			let key = String::from_utf8(read_bytes(reader)?).map_err(|_| {
				DeError::new("Invalid UTF-8 in object container file header metadata key")
			})?;
			let value = read_bytes(reader)?;
			match key.as_str() {
				"avro.schema" => {
					schema_json = Some(String::from_utf8(value).map_err(|_| {
						DeError::new("Invalid UTF-8 in avro.schema header metadata")
					})?)
				}
				"avro.codec" => {
					codec = Some(String::from_utf8(value).map_err(|_| {
						DeError::new("Invalid UTF-8 in avro.codec header metadata")
					})?)
				}
				_ => user_metadata.push((key, value)),
			}
		}
	}
	Ok((
		schema_json.ok_or_else(|| DeError::new("Missing avro.schema in object container file header"))?,
		codec.unwrap_or_else(|| "null".to_owned()),
		user_metadata,
	))
}

fn read_bytes<'de, R: ReadSlice<'de>>(reader: &mut R) -> Result<Vec<u8>, DeError> {
	let len: i64 = reader.read_varint()?;
	let len: usize = len
		.try_into()
		.map_err(|_| DeError::new("Invalid length in object container file header"))?;
	reader.read_slice(len, |b: &[u8]| Ok::<_, DeError>(b.to_vec()))
}

mod private {
	/// Implemented only on [`SliceRead<'_>`](crate::de::read::SliceRead)
	///
	/// Enforces that `deserialize_borrowed`/`deserialize_next_borrowed` are
	/// only callable when `R = SliceRead<'de>`, not on arbitrary `BufRead`s.
	pub trait IsSliceRead {}
}
use private::IsSliceRead;
impl IsSliceRead for crate::de::read::SliceRead<'_> {}
