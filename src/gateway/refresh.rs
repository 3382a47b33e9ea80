//! Credential refresh with a single-flight flag, an ordered pending queue, and teardown.
//!
//! The first caller whose request fails authentication takes a [`RefreshLease`] and calls
//! the refresh endpoint. Callers that fail while the lease is held park on a one-shot
//! receiver instead of issuing their own refresh. The lease clears the flag and drains the
//! queue under one lock, so a request arriving after the refresh settled never queues
//! behind it. Dropping an unsettled lease releases every waiter with
//! [`Error::RefreshCancelled`].

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::collections::VecDeque;
// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	gateway::Gateway,
	http::{ApiRequest, ApiResponse, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	router::NavigationTarget,
};

type RefreshOutcome = Result<Credential, Arc<Error>>;

/// Flag + queue shared by every caller of one gateway.
#[derive(Debug, Default)]
pub(crate) struct RefreshState {
	in_flight: bool,
	pending: VecDeque<oneshot::Sender<RefreshOutcome>>,
}

/// What a caller does after its request failed authentication.
pub(crate) enum RefreshTicket {
	/// This caller drives the refresh.
	Lead(RefreshLease),
	/// Another caller is refreshing; wait for its outcome.
	Wait(oneshot::Receiver<RefreshOutcome>),
}

/// Exclusive right to run the in-flight refresh.
pub(crate) struct RefreshLease {
	state: Arc<Mutex<RefreshState>>,
	settled: bool,
}
impl RefreshLease {
	/// Clears the flag, drains the queue in enqueue order, and hands `outcome` to each waiter.
	fn settle(mut self, outcome: RefreshOutcome) -> usize {
		self.settled = true;

		release(&self.state, outcome)
	}
}
impl Drop for RefreshLease {
	fn drop(&mut self) {
		if !self.settled {
			release(&self.state, Err(Arc::new(Error::RefreshCancelled)));
		}
	}
}

fn release(state: &Mutex<RefreshState>, outcome: RefreshOutcome) -> usize {
	let pending = {
		let mut guard = state.lock();

		guard.in_flight = false;

		std::mem::take(&mut guard.pending)
	};
	let released = pending.len();

	for waiter in pending {
		// A waiter whose caller went away has nothing left to resume.
		let _ = waiter.send(outcome.clone());
	}

	released
}

/// Takes the lease if no refresh is running, otherwise joins the queue.
pub(crate) fn enter(state: &Arc<Mutex<RefreshState>>, capacity: usize) -> Result<RefreshTicket> {
	let mut guard = state.lock();

	if !guard.in_flight {
		guard.in_flight = true;

		return Ok(RefreshTicket::Lead(RefreshLease { state: state.clone(), settled: false }));
	}

	// Callers that gave up waiting no longer count against the bound.
	guard.pending.retain(|waiter| !waiter.is_canceled());

	if guard.pending.len() >= capacity {
		return Err(Error::RefreshQueueFull { capacity });
	}

	let (sender, receiver) = oneshot::channel();

	guard.pending.push_back(sender);

	Ok(RefreshTicket::Wait(receiver))
}

impl<C> Gateway<C>
where
	C: ?Sized + HttpTransport,
{
	/// Whether a refresh call is currently outstanding.
	pub fn is_refreshing(&self) -> bool {
		self.refresh.lock().in_flight
	}

	/// Number of callers waiting on the outstanding refresh.
	pub fn pending_refreshes(&self) -> usize {
		self.refresh.lock().pending.len()
	}

	/// Recovers from an authentication failure by refreshing (or waiting for a refresh)
	/// and reissuing `request` exactly once.
	pub(crate) async fn recover(&self, mut request: ApiRequest, cause: Error) -> Result<ApiResponse> {
		obs::record_event(FlowKind::Send, &format_args!("{} {} failed: {cause}", request.method, request.path));
		request.mark_retried();

		let credential = match enter(&self.refresh, self.config.max_pending)? {
			RefreshTicket::Lead(lease) => self.run_refresh(lease).await?,
			RefreshTicket::Wait(receiver) => {
				self.refresh_metrics.record_queued();
				obs::record_flow_outcome(FlowKind::Refresh, FlowOutcome::Queued);

				receiver
					.await
					.unwrap_or_else(|_| Err(Arc::new(Error::RefreshCancelled)))
					.map_err(Error::refresh_failure)?
			},
		};

		self.dispatch(&request, Some(&credential)).await
	}

	async fn run_refresh(&self, lease: RefreshLease) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_credential");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				let refreshed = match self.request_credential().await {
					Ok(credential) => self.adopt_credential(&credential).await.map(|_| credential),
					Err(e) => Err(e),
				};

				match refreshed {
					Ok(credential) => {
						let released = lease.settle(Ok(credential.clone()));

						obs::record_event(KIND, &format_args!("released {released} waiting request(s)"));
						self.refresh_metrics.record_success();

						Ok(credential)
					},
					Err(e) => {
						let shared = Arc::new(e);

						// Teardown runs under the lease; callers failing meanwhile queue behind it.
						self.teardown().await;
						lease.settle(Err(shared.clone()));
						self.refresh_metrics.record_failure();

						Err(Error::refresh_failure(shared))
					},
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn request_credential(&self) -> Result<Credential> {
		#[derive(Deserialize)]
		struct RefreshBody {
			token: String,
		}

		let request = ApiRequest::post(&self.config.endpoints.refresh)
			.without_credential()
			.with_timeout(self.config.refresh_timeout);
		let body: RefreshBody = self.dispatch(&request, None).await?.json()?;

		Ok(Credential::new(body.token))
	}

	/// Ends the local session after an unrecoverable refresh and sends the user to login.
	pub(crate) async fn teardown(&self) {
		self.forget_credential();

		if let Err(e) = self.session.clear_user().await {
			obs::record_warning(FlowKind::Refresh, &e);
		}

		let Some(navigator) = &self.navigator else {
			return;
		};
		let login_route = navigator.login_route().unwrap_or(self.config.login_route.as_str());
		let current = navigator.current();

		if current.path == login_route {
			return;
		}

		let target = NavigationTarget::new(login_route)
			.with_query(&self.config.redirect_param, current.full_path());

		if let Err(e) = navigator.push(target) {
			obs::record_warning(FlowKind::Refresh, &e);
		}
	}
}
