//! CRC-64-AVRO fingerprinting
//!
//! This is the "Rabin fingerprint" variant Avro uses for schema
//! fingerprinting: a reflected CRC-64 seeded with `0xc15d213aa4d7a795`.

const SEED: u64 = 0xc15d213aa4d7a795;

fn fp_table() -> &'static [u64; 256] {
	use std::sync::OnceLock;
	static TABLE: OnceLock<[u64; 256]> = OnceLock::new();
	TABLE.get_or_init(|| {
		let mut table = [0u64; 256];
		let mut i = 0;
		while i < 256 {
			let mut fp = i as u64;
			let mut j = 0;
			while j < 8 {
				// Equivalent to: fp = (fp >> 1) ^ (SEED & -(fp & 1))
				// in two's-complement wrapping arithmetic.
				fp = (fp >> 1) ^ (SEED & (fp & 1).wrapping_neg());
				j += 1;
			}
			table[i] = fp;
			i += 1;
		}
		table
	})
}

/// Compute the CRC-64-AVRO fingerprint of a buffer (typically a schema's
/// canonical form, UTF-8 encoded)
///
/// See [`crc64_avro_of_canonical_form`] for the common case of fingerprinting
/// a schema's canonical form string.
pub fn crc64_avro(buf: &[u8]) -> u64 {
	let table = fp_table();
	let mut fp: u64 = SEED;
	for &b in buf {
		let idx = ((fp ^ b as u64) & 0xff) as usize;
		fp = (fp >> 8) ^ table[idx];
	}
	fp
}

/// Convenience wrapper: fingerprint a schema's already-computed canonical
/// form string
pub fn crc64_avro_of_canonical_form(canonical_form: &str) -> u64 {
	crc64_avro(canonical_form.as_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn null_schema_fingerprint() {
		// Seed suite S4: fingerprint_crc64("\"null\"") == 0x63dd24e7cc258f8a
		assert_eq!(crc64_avro(b"\"null\""), 0x63dd24e7cc258f8a);
	}
}
