//! Authenticated request gateway.
//!
//! [`Gateway::send`] attaches the stored bearer credential to every request and hides
//! credential expiry from callers. When the API answers with an authentication failure,
//! the first affected caller refreshes the credential while every other affected caller
//! waits in an ordered queue; all of them then reissue their own request once with the
//! new credential. An unrecoverable refresh tears the session down and sends the user to
//! the login route.

pub mod account;
pub mod refresh;

pub use account::*;
pub use refresh::RefreshMetrics;

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::GatewayConfig,
	http::{self, ApiRequest, ApiResponse, HttpTransport, OutgoingRequest, ReqwestTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	router::Navigator,
	session::SessionState,
};
use refresh::RefreshState;

/// Collaborators injected into a gateway at construction.
#[derive(Clone)]
pub struct GatewayContext {
	/// Session store cleared on unrecoverable refresh failures; also owns durable storage.
	pub session: Arc<SessionState>,
	/// Navigation used for the forced login redirect, if the client has one.
	pub navigator: Option<Arc<dyn Navigator>>,
}
impl GatewayContext {
	/// Creates a context without navigation.
	pub fn new(session: Arc<SessionState>) -> Self {
		Self { session, navigator: None }
	}

	/// Attaches a navigator.
	pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
		self.navigator = Some(navigator);

		self
	}
}
impl Debug for GatewayContext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GatewayContext")
			.field("session", &self.session)
			.field("navigator_set", &self.navigator.is_some())
			.finish()
	}
}

/// Sends API requests with bearer credentials and single-flight credential refresh.
///
/// One gateway is constructed per client and shared (typically behind `Arc`) by every
/// caller. It owns the refresh flag and pending queue, so concurrent authentication
/// failures observed through the same gateway trigger exactly one refresh call.
pub struct Gateway<C = ReqwestTransport>
where
	C: ?Sized + HttpTransport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<C>,
	/// Validated configuration.
	pub config: GatewayConfig,
	/// Session store shared with views and the router.
	pub session: Arc<SessionState>,
	/// Optional navigation collaborator.
	pub navigator: Option<Arc<dyn Navigator>>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	default_headers: Arc<RwLock<HeaderMap>>,
	refresh: Arc<Mutex<RefreshState>>,
}
impl<C> Gateway<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a gateway that reuses the caller-provided transport.
	pub fn with_transport(
		config: GatewayConfig,
		context: GatewayContext,
		transport: impl Into<Arc<C>>,
	) -> Self {
		Self {
			transport: transport.into(),
			config,
			session: context.session,
			navigator: context.navigator,
			refresh_metrics: Default::default(),
			default_headers: Default::default(),
			refresh: Default::default(),
		}
	}

	/// Sends `request`, refreshing the credential once if the API reports it expired.
	///
	/// Errors other than an authentication failure are returned unchanged. A request
	/// that fails authentication again after its retry is not refreshed a second time.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Send;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				match self.dispatch(&request, None).await {
					Err(e) if e.is_authentication_expired() && !request.is_retried() =>
						self.recover(request, e).await,
					other => other,
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Sends `request` once, without intercepting authentication failures.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		self.dispatch(&request, None).await
	}

	/// Returns the stored credential, if any.
	pub async fn credential(&self) -> Result<Option<Credential>> {
		Ok(self.session.store().credential().await?)
	}

	/// Headers applied to every request before per-request headers.
	pub fn default_headers(&self) -> HeaderMap {
		self.default_headers.read().clone()
	}

	/// Replaces a default header.
	pub fn set_default_header(
		&self,
		name: reqwest::header::HeaderName,
		value: reqwest::header::HeaderValue,
	) {
		self.default_headers.write().insert(name, value);
	}

	/// Persists `credential` and makes it the default `Authorization` header.
	pub(crate) async fn adopt_credential(&self, credential: &Credential) -> Result<()> {
		let header = credential.bearer_header()?;

		self.session.store().save_credential(credential).await?;
		self.default_headers.write().insert(AUTHORIZATION, header);

		Ok(())
	}

	/// Drops the default `Authorization` header.
	pub(crate) fn forget_credential(&self) {
		self.default_headers.write().remove(AUTHORIZATION);
	}

	async fn dispatch(
		&self,
		request: &ApiRequest,
		credential: Option<&Credential>,
	) -> Result<ApiResponse> {
		let outgoing = self.prepare(request, credential).await?;
		let response = self.transport.execute(outgoing).await?;

		http::classify(response, &self.config.auth_failure)
	}

	async fn prepare(
		&self,
		request: &ApiRequest,
		credential: Option<&Credential>,
	) -> Result<OutgoingRequest> {
		let mut headers = self.default_headers();

		headers.extend(request.headers.clone());

		if request.is_authenticated() {
			let stored = match credential {
				Some(credential) => Some(credential.clone()),
				None => self.session.store().credential().await?,
			};

			// Without a stored credential the default or caller header (if any) is sent as-is.
			if let Some(credential) = stored {
				headers.insert(AUTHORIZATION, credential.bearer_header()?);
			}
		} else {
			headers.remove(AUTHORIZATION);
		}

		let body = http::encode_body(request.body.as_ref(), &mut headers)?;
		let url = self.config.endpoint(&request.path, &request.query)?;

		Ok(OutgoingRequest {
			method: request.method.clone(),
			url,
			headers,
			body,
			timeout: request.timeout.or(self.config.request_timeout),
		})
	}
}
impl Gateway<ReqwestTransport> {
	/// Creates a gateway backed by a cookie-aware reqwest client.
	pub fn new(config: GatewayConfig, context: GatewayContext) -> Result<Self> {
		Ok(Self::with_transport(config, context, ReqwestTransport::new()?))
	}
}
impl<C> Clone for Gateway<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			config: self.config.clone(),
			session: self.session.clone(),
			navigator: self.navigator.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
			default_headers: self.default_headers.clone(),
			refresh: self.refresh.clone(),
		}
	}
}
impl<C> Debug for Gateway<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway")
			.field("base_url", &self.config.base_url.as_str())
			.field("session", &self.session)
			.field("navigator_set", &self.navigator.is_some())
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
