//! Bearer credential wrapper that redacts sensitive material.

// crates.io
use reqwest::header::HeaderValue;
// self
use crate::{_prelude::*, error::ConfigError};

/// Opaque bearer token kept out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);
impl Credential {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Builds the `Authorization: Bearer <token>` header value, marked sensitive.
	pub fn bearer_header(&self) -> Result<HeaderValue, ConfigError> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
			.map_err(|_| ConfigError::InvalidCredential)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl AsRef<str> for Credential {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn credential_formatters_redact() {
		let credential = Credential::new("super-secret");

		assert_eq!(format!("{credential:?}"), "Credential(\"<redacted>\")");
		assert_eq!(format!("{credential}"), "<redacted>");
	}

	#[test]
	fn bearer_header_is_sensitive() {
		let header = Credential::new("T1").bearer_header().expect("Header should encode.");

		assert_eq!(header.to_str().expect("Header should be ASCII."), "Bearer T1");
		assert!(header.is_sensitive());
	}

	#[test]
	fn bearer_header_rejects_control_bytes() {
		let err = Credential::new("bad\ntoken").bearer_header().unwrap_err();

		assert!(matches!(err, ConfigError::InvalidCredential));
	}
}
