use std::io::{Error, ErrorKind, IoSlice, Result, Write};

pub(super) fn write_all_vectored<'a, W: Write, const N: usize>(
	writer: &mut W,
	mut slices: [&'a [u8]; N],
) -> Result<()> {
	let mut bufs = slices.map(IoSlice::new);
	write_all_vectored_inner(writer, &mut slices, &mut bufs)
}

/// Taken from std before stabilization
/// https://github.com/rust-lang/rust/issues/70436
fn write_all_vectored_inner<'a, W: Write>(
	writer: &mut W,
	mut slices: &mut [&'a [u8]],
	mut bufs: &mut [IoSlice<'a>],
) -> Result<()> {
	advance_slices(&mut slices, &mut bufs, 0);
	while !bufs.is_empty() {
		match writer.write_vectored(bufs) {
			Ok(0) => {
				return Err(Error::new(
					ErrorKind::WriteZero,
					"failed to write whole buffer",
				));
			}
			Ok(n) => advance_slices(&mut slices, &mut bufs, n),
			Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
			Err(e) => return Err(e),
		}
	}
	Ok(())
}

/// ~Taken from std before stabilization
/// https://github.com/rust-lang/rust/issues/62726
fn advance_slices<'a>(slices: &mut &mut [&'a [u8]], bufs: &mut &mut [IoSlice<'a>], n: usize) {
	assert_eq!(slices.len(), bufs.len());
	let mut remove = 0;
	let mut left = n;
	for slice in slices.iter() {
		if let Some(remainder) = left.checked_sub(slice.len()) {
			left = remainder;
			remove += 1;
		} else {
			break;
		}
	}

	*slices = &mut std::mem::take(slices)[remove..];
	*bufs = &mut std::mem::take(bufs)[remove..];
	if slices.is_empty() {
		assert!(left == 0, "advancing io slices beyond their length");
	} else {
		let first = &mut slices[0];
		let new_slice = &(*first)[left..];
		*first = new_slice;
		bufs[0] = IoSlice::new(new_slice);
	}
}
