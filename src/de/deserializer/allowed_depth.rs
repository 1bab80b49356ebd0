use super::DeError;

/// Allowed additional depth of the deserialization
///
/// Decremented as traversal advances, to turn a maliciously/accidentally
/// deeply-nested datum into an error instead of a stack overflow.
#[derive(Clone, Copy)]
pub(crate) struct AllowedDepth {
	allowed_additional_depth: usize,
}

impl AllowedDepth {
	pub(crate) fn new(allowed_depth: usize) -> Self {
		Self {
			allowed_additional_depth: allowed_depth,
		}
	}

	pub(crate) fn dec(self) -> Result<Self, DeError> {
		match self.allowed_additional_depth.checked_sub(1) {
			Some(allowed_additional_depth) => Ok(Self {
				allowed_additional_depth,
			}),
			None => Err(DeError::new(
				"Deserialization recursion limit reached (stack overflow prevention)",
			)),
		}
	}
}
