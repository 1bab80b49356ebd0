use std::{borrow::Cow, fmt};

/// Error that may happen when parsing or validating a schema
pub struct SchemaError {
	inner: Box<ErrorInner>,
}
enum ErrorInner {
	SerdeJson(serde_json::Error),
	Other(Cow<'static, str>),
}

impl SchemaError {
	pub(crate) fn msg(msg: impl Into<Cow<'static, str>>) -> Self {
		Self {
			inner: Box::new(ErrorInner::Other(msg.into())),
		}
	}
	pub(crate) fn new(msg: impl fmt::Display) -> Self {
		Self::msg(msg.to_string())
	}
	pub(crate) fn serde_json(e: serde_json::Error) -> Self {
		Self {
			inner: Box::new(ErrorInner::SerdeJson(e)),
		}
	}
}
impl fmt::Debug for SchemaError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}
impl fmt::Display for SchemaError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &*self.inner {
			ErrorInner::SerdeJson(e) => write!(f, "Failed to parse schema JSON: {e}"),
			ErrorInner::Other(msg) => f.write_str(msg),
		}
	}
}
impl std::error::Error for SchemaError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match &*self.inner {
			ErrorInner::SerdeJson(e) => Some(e),
			ErrorInner::Other(_) => None,
		}
	}
}
impl From<serde_json::Error> for SchemaError {
	fn from(e: serde_json::Error) -> Self {
		Self::serde_json(e)
	}
}
