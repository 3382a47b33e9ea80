//! Gateway-level error types shared across requests, refreshes, stores, and routing.

// self
use crate::{_prelude::*, auth::FieldErrors};

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Router could not resolve a navigation target.
	#[error(transparent)]
	Navigation(#[from] crate::router::NavigationError),

	/// The API rejected the credential as expired or missing.
	#[error("Authentication expired (status {status}): {message}.")]
	AuthenticationExpired {
		/// HTTP status code returned by the API.
		status: u16,
		/// Server-supplied message, or the canonical reason phrase.
		message: String,
	},
	/// The API rejected the submitted form with field-level errors.
	#[error("Request failed validation on {} field(s).", .0.len())]
	Validation(FieldErrors),
	/// Any other non-success response.
	#[error("API returned status {status}: {message}.")]
	Server {
		/// HTTP status code returned by the API.
		status: u16,
		/// Truncated response body.
		message: String,
	},
	/// Response body could not be decoded into the expected shape.
	#[error("API returned malformed JSON.")]
	Decode {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the offending response.
		status: u16,
	},
	/// Credential refresh failed; the session has been torn down.
	#[error("Credential refresh failed.")]
	RefreshFailure {
		/// Failure shared by every caller waiting on the same refresh.
		#[source]
		source: Arc<Error>,
	},
	/// The task driving a refresh was dropped before the refresh settled.
	#[error("Credential refresh was abandoned before it settled.")]
	RefreshCancelled,
	/// Too many callers are already waiting on the in-flight refresh.
	#[error("Refresh queue is full ({capacity} pending requests).")]
	RefreshQueueFull {
		/// Configured queue capacity.
		capacity: usize,
	},
}
impl Error {
	/// Wraps a refresh-side failure so it can be fanned out to queued callers.
	pub fn refresh_failure(source: impl Into<Arc<Error>>) -> Self {
		Self::RefreshFailure { source: source.into() }
	}

	/// Returns `true` for errors the gateway may recover from by refreshing.
	pub fn is_authentication_expired(&self) -> bool {
		matches!(self, Self::AuthenticationExpired { .. })
	}

	/// Returns the HTTP status attached to the error, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthenticationExpired { status, .. }
			| Self::Server { status, .. }
			| Self::Decode { status, .. } => Some(*status),
			Self::Validation(_) => Some(422),
			Self::RefreshFailure { source } => source.status(),
			_ => None,
		}
	}

	/// Returns the field errors carried by a validation failure.
	pub fn field_errors(&self) -> Option<&FieldErrors> {
		match self {
			Self::Validation(errors) => Some(errors),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot carry path segments (e.g. `mailto:`).
	#[error("Base URL `{url}` cannot be used as an API base.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// An endpoint or route path is not absolute.
	#[error("Path `{path}` configured for {field} must start with `/`.")]
	InvalidPath {
		/// Configuration field name.
		field: &'static str,
		/// Offending path.
		path: String,
	},
	/// Refresh queue capacity must be positive.
	#[error("Refresh queue capacity must be greater than zero.")]
	ZeroQueueCapacity,
	/// Refresh timeout must be positive.
	#[error("Refresh timeout must be greater than zero.")]
	ZeroRefreshTimeout,
	/// Credential contains bytes that cannot appear in an HTTP header.
	#[error("Credential cannot be encoded as an Authorization header.")]
	InvalidCredential,
	/// Configuration document could not be parsed.
	#[error("Gateway configuration is malformed.")]
	Parse {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	BodySerialize(#[source] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its configured timeout.
	#[error("Request to the API timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
