use super::{Compression, SerError};
use serde::ser::Error as _;

/// Buffer plus whatever per-block compressor state the chosen codec needs
///
/// Kept as a single growable `Vec<u8>` across blocks so that successive
/// `finish_block` calls don't reallocate.
pub(super) struct CompressionCodecState {
	output_vec: Vec<u8>,
	kind: Kind,
}

enum Kind {
	Null,
	#[cfg(feature = "deflate")]
	Deflate { compress: flate2::Compress },
	#[cfg(feature = "bzip2")]
	Bzip2 { level: u8 },
	#[cfg(feature = "snappy")]
	Snappy { encoder: snap::raw::Encoder },
	#[cfg(feature = "xz")]
	Xz { level: u8 },
	#[cfg(feature = "zstandard")]
	Zstandard {
		compressor: Option<zstd::bulk::Compressor<'static>>,
		level: i32,
	},
}

impl CompressionCodecState {
	pub(super) fn new(compression: Compression) -> Self {
		let kind = match compression {
			Compression::Null => Kind::Null,
			#[cfg(feature = "deflate")]
			Compression::Deflate { level } => Kind::Deflate {
				compress: flate2::Compress::new(
					flate2::Compression::new(level.clip(9).into()),
					false,
				),
			},
			#[cfg(feature = "bzip2")]
			Compression::Bzip2 { level } => Kind::Bzip2 {
				level: level.clip(9),
			},
			#[cfg(feature = "snappy")]
			Compression::Snappy => Kind::Snappy {
				encoder: snap::raw::Encoder::new(),
			},
			#[cfg(feature = "xz")]
			Compression::Xz { level } => Kind::Xz {
				level: level.clip(9),
			},
			#[cfg(feature = "zstandard")]
			Compression::Zstandard { level } => Kind::Zstandard {
				compressor: None,
				level: i32::from(level.clip(22)),
			},
		};
		Self {
			output_vec: Vec::new(),
			kind,
		}
	}

	/// The compressed bytes for the block that was just `encode`d, or `None`
	/// if the codec is [`Compression::Null`] (meaning the caller should use
	/// the raw serializer buffer directly instead)
	pub(super) fn compressed_buffer(&self) -> Option<&[u8]> {
		match self.kind {
			Kind::Null => None,
			#[cfg(any(
				feature = "deflate",
				feature = "bzip2",
				feature = "snappy",
				feature = "xz",
				feature = "zstandard"
			))]
			_ => Some(&self.output_vec),
		}
	}

	pub(super) fn encode(&mut self, input: &[u8]) -> Result<(), SerError> {
		self.output_vec.clear();
		match &mut self.kind {
			Kind::Null => {}
			#[cfg(feature = "deflate")]
			Kind::Deflate { compress } => {
				compress.reset();
				self.output_vec.reserve(input.len() / 2 + 16);
				loop {
					let before_out = compress.total_out();
					let before_in = compress.total_in();
					let status = compress
						.compress_vec(
							&input[before_in as usize..],
							&mut self.output_vec,
							flate2::FlushCompress::Finish,
						)
						.map_err(|e| {
							SerError::custom(format_args!("Deflate compression error: {e}"))
						})?;
					if compress.total_out() == before_out && status != flate2::Status::StreamEnd {
						let additional = self.output_vec.capacity().max(64);
						self.output_vec.reserve(additional);
					}
					if status == flate2::Status::StreamEnd {
						break;
					}
				}
			}
			#[cfg(feature = "bzip2")]
			Kind::Bzip2 { level } => {
				use std::io::Write;
				let mut compressor = bzip2::write::BzEncoder::new(
					std::mem::take(&mut self.output_vec),
					bzip2::Compression::new(u32::from(*level)),
				);
				compressor
					.write_all(input)
					.map_err(|e| SerError::custom(format_args!("Bzip2 compression error: {e}")))?;
				self.output_vec = compressor
					.finish()
					.map_err(|e| SerError::custom(format_args!("Bzip2 compression error: {e}")))?;
			}
			#[cfg(feature = "snappy")]
			Kind::Snappy { encoder } => {
				self.output_vec
					.resize(snap::raw::max_compress_len(input.len()), 0);
				let written = encoder.compress(input, &mut self.output_vec).map_err(|e| {
					SerError::custom(format_args!("Snappy compression error: {e}"))
				})?;
				self.output_vec.truncate(written);
				self.output_vec
					.extend_from_slice(&crc32fast::hash(input).to_be_bytes());
			}
			#[cfg(feature = "xz")]
			Kind::Xz { level } => {
				use std::io::Write;
				let mut compressor =
					xz2::write::XzEncoder::new(std::mem::take(&mut self.output_vec), u32::from(*level));
				compressor
					.write_all(input)
					.map_err(|e| SerError::custom(format_args!("Xz compression error: {e}")))?;
				self.output_vec = compressor
					.finish()
					.map_err(|e| SerError::custom(format_args!("Xz compression error: {e}")))?;
			}
			#[cfg(feature = "zstandard")]
			Kind::Zstandard { compressor, level } => {
				let compressor = compressor
					.get_or_insert_with(|| zstd::bulk::Compressor::new(*level).expect("Invalid zstd level"));
				self.output_vec
					.resize(zstd::zstd_safe::compress_bound(input.len()), 0);
				let written = compressor
					.compress_to_buffer(input, &mut self.output_vec)
					.map_err(|e| SerError::custom(format_args!("Zstandard compression error: {e}")))?;
				self.output_vec.truncate(written);
			}
		}
		Ok(())
	}
}
