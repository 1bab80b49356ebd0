use crate::{
	de::{read::take::IntoLeftAfterTake, DeError, DeserializerConfig, DeserializerState},
	object_container_file_encoding::CompressionCodec,
};

impl CompressionCodec {
	pub(super) fn state<'de, 's, R>(
		self,
		reader: R,
		config: DeserializerConfig<'s>,
		decompression_buffer: Vec<u8>,
		block_size: usize,
	) -> Result<DecompressionState<'s, R>, DeError>
	where
		R: crate::de::read::take::Take + crate::de::read::ReadSlice<'de>,
		<R as crate::de::read::take::Take>::Take: crate::de::read::ReadSlice<'de> + std::io::BufRead,
	{
		use crate::de::read::{take::Take as _, ReaderRead, ReadSlice as _};

		Ok(match self {
			CompressionCodec::Null => DecompressionState::Null {
				deserializer_state: DeserializerState::with_config(reader.take(block_size)?, config),
				decompression_buffer,
			},
			#[cfg(feature = "deflate")]
			CompressionCodec::Deflate => DecompressionState::BufReader {
				deserializer_state: DeserializerState::with_config(
					ReaderRead::new(std::io::BufReader::new(DecompressionReaderForBufReader::Deflate(
						flate2::bufread::DeflateDecoder::new(reader.take(block_size)?),
					))),
					config,
				),
				decompression_buffer,
			},
			#[cfg(feature = "bzip2")]
			CompressionCodec::Bzip2 => DecompressionState::BufReader {
				deserializer_state: DeserializerState::with_config(
					ReaderRead::new(std::io::BufReader::new(DecompressionReaderForBufReader::Bzip2(
						bzip2::bufread::BzDecoder::new(reader.take(block_size)?),
					))),
					config,
				),
				decompression_buffer,
			},
			#[cfg(feature = "snappy")]
			CompressionCodec::Snappy => {
				// Avro's Snappy framing does not support block decompression: the
				// whole block (minus the trailing CRC) is one compressed chunk.
				let block_raw_size = block_size.checked_sub(4).ok_or_else(|| {
					DeError::new("Incorrect block size for Snappy compression: should be at least 4 for CRC")
				})?;
				let mut reader = reader;
				let mut decompression_buffer = decompression_buffer;
				fn fix_closure_late_bound_lifetime_inference<F, T>(f: F) -> F
				where
					F: FnOnce(&[u8]) -> T,
				{
					f
				}
				reader.read_slice(
					block_raw_size,
					fix_closure_late_bound_lifetime_inference(|compressed_slice| {
						fn snappy_to_de_error(e: snap::Error) -> DeError {
							<DeError as serde::de::Error>::custom(format_args!("Snappy decompression error: {e}"))
						}
						decompression_buffer.resize(
							snap::raw::decompress_len(compressed_slice).map_err(snappy_to_de_error)?,
							0,
						);
						let written = snap::raw::Decoder::new()
							.decompress(compressed_slice, &mut decompression_buffer)
							.map_err(snappy_to_de_error)?;
						if written != decompression_buffer.len() {
							return Err(DeError::new(
								"Snappy decompression error: incorrect decompressed size",
							));
						}
						Ok(())
					}),
				)?;
				let actual_crc32 = crc32fast::hash(&decompression_buffer);
				let expected_crc32 =
					u32::from_be_bytes(crate::de::read::Read::read_const_size_buf(&mut reader)?);
				if actual_crc32 != expected_crc32 {
					return Err(DeError::new(
						"Incorrect extra CRC32 of decompressed data when using Snappy compression codec",
					));
				}
				DecompressionState::DecompressedOnConstruction {
					deserializer_state: DeserializerState::with_config(
						ReaderRead::new(std::io::Cursor::new(decompression_buffer)),
						config,
					),
					source_reader: reader,
				}
			}
			#[cfg(feature = "xz")]
			CompressionCodec::Xz => DecompressionState::BufReader {
				deserializer_state: DeserializerState::with_config(
					ReaderRead::new(std::io::BufReader::new(DecompressionReaderForBufReader::Xz(
						xz2::bufread::XzDecoder::new(reader.take(block_size)?),
					))),
					config,
				),
				decompression_buffer,
			},
			#[cfg(feature = "zstandard")]
			CompressionCodec::Zstandard => DecompressionState::BufReader {
				deserializer_state: DeserializerState::with_config(
					ReaderRead::new(std::io::BufReader::new(DecompressionReaderForBufReader::Zstandard(
						zstd::stream::read::Decoder::with_buffer(reader.take(block_size)?)
							.map_err(DeError::io)?,
					))),
					config,
				),
				decompression_buffer,
			},
		})
	}
}

pub(super) enum DecompressionState<'s, R: crate::de::read::take::Take> {
	Null {
		deserializer_state: DeserializerState<'s, R::Take>,
		decompression_buffer: Vec<u8>,
	},
	/// Streaming decompression protocols, decoded on the fly into a
	/// `BufReader` as the deserializer empties it
	#[cfg(any(feature = "deflate", feature = "bzip2", feature = "xz", feature = "zstandard"))]
	BufReader {
		deserializer_state: DeserializerState<
			's,
			crate::de::read::ReaderRead<
				std::io::BufReader<DecompressionReaderForBufReader<<R as crate::de::read::take::Take>::Take>>,
			>,
		>,
		decompression_buffer: Vec<u8>,
	},
	/// Protocols decompressed wholesale into a `Vec<u8>` up front, then read
	/// back out of a `Cursor`
	#[cfg(feature = "snappy")]
	DecompressedOnConstruction {
		deserializer_state: DeserializerState<'s, crate::de::read::ReaderRead<std::io::Cursor<Vec<u8>>>>,
		source_reader: R,
	},
}

pub(super) enum DecompressionReaderForBufReader<R: std::io::BufRead> {
	#[cfg(feature = "deflate")]
	Deflate(flate2::bufread::DeflateDecoder<R>),
	#[cfg(feature = "bzip2")]
	Bzip2(bzip2::bufread::BzDecoder<R>),
	#[cfg(feature = "xz")]
	Xz(xz2::bufread::XzDecoder<R>),
	#[cfg(feature = "zstandard")]
	Zstandard(zstd::stream::read::Decoder<'static, R>),
}

impl<'s, R: crate::de::read::take::Take> DecompressionState<'s, R> {
	pub(super) fn into_source_reader_and_config(
		self,
	) -> Result<(R, DeserializerConfig<'s>, Vec<u8>), DeError> {
		Ok(match self {
			DecompressionState::Null {
				deserializer_state,
				decompression_buffer,
			} => {
				let (reader, config) = deserializer_state.into_inner();
				(reader.into_left_after_take()?, config, decompression_buffer)
			}
			#[cfg(any(feature = "deflate", feature = "bzip2", feature = "xz", feature = "zstandard"))]
			DecompressionState::BufReader {
				deserializer_state,
				decompression_buffer,
			} => {
				let (reader, config) = deserializer_state.into_inner();
				(
					(match reader.into_inner().into_inner() {
						#[cfg(feature = "deflate")]
						DecompressionReaderForBufReader::Deflate(reader) => reader.into_inner(),
						#[cfg(feature = "bzip2")]
						DecompressionReaderForBufReader::Bzip2(reader) => reader.into_inner(),
						#[cfg(feature = "xz")]
						DecompressionReaderForBufReader::Xz(reader) => reader.into_inner(),
						#[cfg(feature = "zstandard")]
						DecompressionReaderForBufReader::Zstandard(mut reader) => {
							// Zstandard needs to be manually driven to the end: if we
							// don't, the last bytes of the compressed data are left
							// unread, which then fails the "no data left in block" check.
							// https://github.com/gyscos/zstd-rs/issues/255
							let mut drive_to_end = [0];
							let read = std::io::Read::read(&mut reader, &mut drive_to_end)
								.map_err(|e| DeError::custom_io("Zstandard error when driving decompressor to end", e))?;
							if read != 0 {
								return Err(DeError::new(
									"Zstandard decompression error: there's decompressed data left in \
									 the block after reading the whole avro block out of it",
								));
							}
							reader.finish()
						}
					})
					.into_left_after_take()?,
					config,
					decompression_buffer,
				)
			}
			#[cfg(feature = "snappy")]
			DecompressionState::DecompressedOnConstruction {
				deserializer_state,
				source_reader,
			} => {
				let (reader, config) = deserializer_state.into_inner();
				(source_reader, config, reader.into_inner().into_inner())
			}
		})
	}
}

macro_rules! dispatch {
	($self: ident, $function: ident ($($arg:ident)*)) => {
		match $self {
			#[cfg(feature = "deflate")]
			DecompressionReaderForBufReader::Deflate(reader) => reader.$function($($arg)*),
			#[cfg(feature = "bzip2")]
			DecompressionReaderForBufReader::Bzip2(reader) => reader.$function($($arg)*),
			#[cfg(feature = "xz")]
			DecompressionReaderForBufReader::Xz(reader) => reader.$function($($arg)*),
			#[cfg(feature = "zstandard")]
			DecompressionReaderForBufReader::Zstandard(reader) => reader.$function($($arg)*),
		}
	};
}
impl<R: std::io::BufRead> std::io::Read for DecompressionReaderForBufReader<R> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		dispatch!(self, read(buf))
	}
	fn read_vectored(&mut self, bufs: &mut [std::io::IoSliceMut<'_>]) -> std::io::Result<usize> {
		dispatch!(self, read_vectored(bufs))
	}
}
