//! Gateway configuration: API base URL, endpoint paths, auth-failure policy, and bounds.

// std
use std::time::Duration as StdDuration;
// self
use crate::{_prelude::*, error::ConfigError};

/// Endpoint paths relative to [`GatewayConfig::base_url`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiEndpoints {
	/// Cookie-authenticated refresh endpoint returning `{token}`.
	pub refresh: String,
	/// Login endpoint accepting `{email, password}`.
	pub login: String,
	/// Registration endpoint accepting `{name, email, password}`.
	pub register: String,
	/// Logout endpoint.
	pub logout: String,
	/// Endpoint returning the signed-in user's profile.
	pub profile: String,
}
impl Default for ApiEndpoints {
	fn default() -> Self {
		Self {
			refresh: "/auth/refresh-token".into(),
			login: "/auth/login".into(),
			register: "/auth/register".into(),
			logout: "/auth/logout".into(),
			profile: "/profile/me".into(),
		}
	}
}

/// Decides which error responses count as an expired credential.
///
/// A response matches when its status equals [`status`](Self::status) and, if
/// [`message`](Self::message) is set, the body's `message` field equals it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthFailurePolicy {
	/// Status code signalling authentication failure.
	pub status: u16,
	/// Server message that must accompany the status, if any.
	pub message: Option<String>,
}
impl AuthFailurePolicy {
	/// Requires the server to send `message` alongside the status.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Returns `true` when a response with `status` + `message` signals expiry.
	pub fn matches(&self, status: u16, message: Option<&str>) -> bool {
		status == self.status
			&& self.message.as_deref().is_none_or(|expected| message == Some(expected))
	}
}
impl Default for AuthFailurePolicy {
	fn default() -> Self {
		Self { status: 401, message: None }
	}
}

/// Validated gateway configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
	/// Base URL every endpoint path is appended to, e.g. `http://localhost/api/v1`.
	pub base_url: Url,
	/// API endpoint paths.
	#[serde(default)]
	pub endpoints: ApiEndpoints,
	/// Auth-failure detection policy.
	#[serde(default)]
	pub auth_failure: AuthFailurePolicy,
	/// Client-side route users are sent to when the session cannot be recovered.
	#[serde(default = "GatewayConfig::default_login_route")]
	pub login_route: String,
	/// Query parameter carrying the originally intended path on that redirect.
	#[serde(default = "GatewayConfig::default_redirect_param")]
	pub redirect_param: String,
	/// Upper bound on the refresh call so queued callers are always released.
	#[serde(default = "GatewayConfig::default_refresh_timeout", with = "secs")]
	pub refresh_timeout: StdDuration,
	/// Default timeout for ordinary requests.
	#[serde(default, with = "opt_secs")]
	pub request_timeout: Option<StdDuration>,
	/// Maximum number of callers waiting on one refresh.
	#[serde(default = "GatewayConfig::default_max_pending")]
	pub max_pending: usize,
}
impl GatewayConfig {
	/// Default refresh timeout.
	pub const DEFAULT_REFRESH_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	/// Default pending queue capacity.
	pub const DEFAULT_MAX_PENDING: usize = 256;

	/// Creates a builder seeded with `base_url`.
	pub fn builder(base_url: Url) -> GatewayConfigBuilder {
		GatewayConfigBuilder::new(base_url)
	}

	/// Parses and validates a JSON configuration document.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);
		let config: Self = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::Parse { source })?;

		config.validate()?;

		Ok(config)
	}

	/// Resolves `path` (and optional query pairs) against the base URL.
	///
	/// Paths are appended to the base path, so `/auth/login` under
	/// `http://host/api/v1` becomes `http://host/api/v1/auth/login`.
	pub fn endpoint(&self, path: &str, query: &[(String, String)]) -> Result<Url, ConfigError> {
		let mut url = self.base_url.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidBaseUrl { url: self.base_url.to_string() })?
			.pop_if_empty()
			.extend(path.trim_start_matches('/').split('/'));

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query);
		}

		Ok(url)
	}

	/// Validates paths, base URL, and bounds.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.base_url.cannot_be_a_base() {
			return Err(ConfigError::InvalidBaseUrl { url: self.base_url.to_string() });
		}

		let paths = [
			("endpoints.refresh", &self.endpoints.refresh),
			("endpoints.login", &self.endpoints.login),
			("endpoints.register", &self.endpoints.register),
			("endpoints.logout", &self.endpoints.logout),
			("endpoints.profile", &self.endpoints.profile),
			("login_route", &self.login_route),
		];

		for (field, path) in paths {
			if !path.starts_with('/') {
				return Err(ConfigError::InvalidPath { field, path: path.clone() });
			}
		}
		if self.max_pending == 0 {
			return Err(ConfigError::ZeroQueueCapacity);
		}
		if self.refresh_timeout.is_zero() {
			return Err(ConfigError::ZeroRefreshTimeout);
		}

		Ok(())
	}

	fn default_login_route() -> String {
		"/login".into()
	}

	fn default_redirect_param() -> String {
		"redirect".into()
	}

	fn default_refresh_timeout() -> StdDuration {
		Self::DEFAULT_REFRESH_TIMEOUT
	}

	fn default_max_pending() -> usize {
		Self::DEFAULT_MAX_PENDING
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug)]
pub struct GatewayConfigBuilder {
	config: GatewayConfig,
}
impl GatewayConfigBuilder {
	/// Creates a new builder with default endpoints and bounds.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: GatewayConfig {
				base_url,
				endpoints: ApiEndpoints::default(),
				auth_failure: AuthFailurePolicy::default(),
				login_route: GatewayConfig::default_login_route(),
				redirect_param: GatewayConfig::default_redirect_param(),
				refresh_timeout: GatewayConfig::DEFAULT_REFRESH_TIMEOUT,
				request_timeout: None,
				max_pending: GatewayConfig::DEFAULT_MAX_PENDING,
			},
		}
	}

	/// Replaces every endpoint path.
	pub fn endpoints(mut self, endpoints: ApiEndpoints) -> Self {
		self.config.endpoints = endpoints;

		self
	}

	/// Overrides the refresh endpoint path.
	pub fn refresh_endpoint(mut self, path: impl Into<String>) -> Self {
		self.config.endpoints.refresh = path.into();

		self
	}

	/// Overrides the auth-failure policy.
	pub fn auth_failure(mut self, policy: AuthFailurePolicy) -> Self {
		self.config.auth_failure = policy;

		self
	}

	/// Overrides the login route used for forced redirects.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.config.login_route = route.into();

		self
	}

	/// Overrides the redirect query parameter name.
	pub fn redirect_param(mut self, param: impl Into<String>) -> Self {
		self.config.redirect_param = param.into();

		self
	}

	/// Overrides the refresh call timeout.
	pub fn refresh_timeout(mut self, timeout: StdDuration) -> Self {
		self.config.refresh_timeout = timeout;

		self
	}

	/// Sets a default timeout for ordinary requests.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.config.request_timeout = Some(timeout);

		self
	}

	/// Overrides the pending queue capacity.
	pub fn max_pending(mut self, capacity: usize) -> Self {
		self.config.max_pending = capacity;

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

mod secs {
	// std
	use std::time::Duration as StdDuration;
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &StdDuration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_f64(value.as_secs_f64())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<StdDuration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let secs = f64::deserialize(deserializer)?;

		StdDuration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
	}
}

mod opt_secs {
	// std
	use std::time::Duration as StdDuration;
	// crates.io
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &Option<StdDuration>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(value) => serializer.serialize_some(&value.as_secs_f64()),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<StdDuration>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Option::<f64>::deserialize(deserializer)?
			.map(|secs| StdDuration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
			.transpose()
	}
}
