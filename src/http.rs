//! Transport primitives for API calls made through the gateway.
//!
//! The module exposes [`ApiRequest`] (what callers build), [`OutgoingRequest`] (what the
//! gateway hands to a transport after resolving the URL and attaching credentials), and
//! [`ApiResponse`]. [`HttpTransport`] is the gateway's only dependency on an HTTP stack, so
//! tests and embedders can swap in their own client without touching the refresh logic.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use reqwest::{
	Method, StatusCode,
	header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::FieldErrors,
	config::AuthFailurePolicy,
	error::{ConfigError, TransportError},
};

/// Maximum number of body bytes carried into [`Error::Server`] messages.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing gateway requests.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by
/// every caller of a gateway, and must return the response for every status code;
/// status interpretation belongs to the gateway.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes a fully resolved request.
	fn execute(&self, request: OutgoingRequest) -> TransportFuture<'_>;
}

/// Request description relative to the gateway's base URL.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path appended to the base URL, e.g. `/profile/me`.
	pub path: String,
	/// Query parameters appended in order.
	pub query: Vec<(String, String)>,
	/// Extra headers; the gateway adds `Authorization` on top of these.
	pub headers: HeaderMap,
	/// JSON body, if any.
	pub body: Option<Value>,
	/// Per-request timeout enforced by the transport.
	pub timeout: Option<StdDuration>,
	authenticate: bool,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
			timeout: None,
			authenticate: true,
			retried: false,
		}
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::PATCH, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends a query parameter.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((key.into(), value.into()));

		self
	}

	/// Sets a header, replacing any previous value.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_value(body).map_err(ConfigError::BodySerialize)?);

		Ok(self)
	}

	/// Bounds the request duration.
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = Some(timeout);

		self
	}

	/// Sends the request without a bearer credential even when one is stored.
	pub fn without_credential(mut self) -> Self {
		self.authenticate = false;

		self
	}

	/// Whether the gateway attaches the stored credential.
	pub fn is_authenticated(&self) -> bool {
		self.authenticate
	}

	/// Whether the request has already been reissued after a refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct OutgoingRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL including query parameters.
	pub url: Url,
	/// Final header set, including `Authorization` when a credential was attached.
	pub headers: HeaderMap,
	/// Encoded body bytes.
	pub body: Option<Vec<u8>>,
	/// Timeout the transport must enforce.
	pub timeout: Option<StdDuration>,
}

/// Response captured from the API.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status.as_u16() })
	}

	/// Body as lossy UTF-8 text.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Server-supplied `message` field, when the body is a JSON object carrying one.
	pub fn message(&self) -> Option<String> {
		#[derive(Deserialize)]
		struct MessageBody {
			message: String,
		}

		serde_json::from_slice::<MessageBody>(&self.body).ok().map(|body| body.message)
	}
}

/// Maps a response to `Ok` for success statuses and to the matching [`Error`] otherwise.
pub(crate) fn classify(response: ApiResponse, policy: &AuthFailurePolicy) -> Result<ApiResponse> {
	let status = response.status;

	if status.is_success() {
		return Ok(response);
	}

	let message = response.message();

	if policy.matches(status.as_u16(), message.as_deref()) {
		return Err(Error::AuthenticationExpired {
			status: status.as_u16(),
			message: message
				.or_else(|| status.canonical_reason().map(str::to_owned))
				.unwrap_or_default(),
		});
	}
	if status == StatusCode::UNPROCESSABLE_ENTITY {
		#[derive(Deserialize)]
		struct ValidationBody {
			errors: FieldErrors,
		}

		if let Ok(body) = serde_json::from_slice::<ValidationBody>(&response.body) {
			return Err(Error::Validation(body.errors));
		}
	}

	Err(Error::Server { status: status.as_u16(), message: truncate_body(&response.text()) })
}

/// Truncates a response body to avoid carrying excessive data in errors.
fn truncate_body(body: &str) -> String {
	if body.len() <= MAX_ERROR_BODY_LENGTH {
		return body.to_owned();
	}

	let mut end = MAX_ERROR_BODY_LENGTH;

	while !body.is_char_boundary(end) {
		end -= 1;
	}

	format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Encodes a JSON body and sets the matching content type.
pub(crate) fn encode_body(
	body: Option<&Value>,
	headers: &mut HeaderMap,
) -> Result<Option<Vec<u8>>, ConfigError> {
	let Some(body) = body else {
		return Ok(None);
	};
	let bytes = serde_json::to_vec(body).map_err(ConfigError::BodySerialize)?;

	headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static("application/json"));

	Ok(Some(bytes))
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// [`ReqwestTransport::new`] enables a cookie store, which the refresh endpoint relies on
/// to read the session cookie issued at login. Configure any custom [`ReqwestClient`]
/// passed to [`ReqwestTransport::with_client`] the same way.
#[derive(Clone)]
pub struct ReqwestTransport(pub ReqwestClient);
impl ReqwestTransport {
	/// Builds a cookie-aware reqwest client.
	pub fn new() -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().cookie_store(true).build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Debug for ReqwestTransport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ReqwestTransport(..)")
	}
}
impl HttpTransport for ReqwestTransport {
	fn execute(&self, request: OutgoingRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let mut builder = client.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}
			if let Some(timeout) = request.timeout {
				builder = builder.timeout(timeout);
			}

			let response = builder.send().await?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await?.to_vec();

			Ok(ApiResponse { status, headers, body })
		})
	}
}

impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
