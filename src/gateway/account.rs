//! Account actions layered on the gateway: login, registration, logout, and profile loading.

// self
use crate::{
	_prelude::*,
	auth::{Credential, FieldErrors, UserProfile},
	gateway::Gateway,
	http::{ApiRequest, HttpTransport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result of submitting a form the API may reject with field errors.
#[derive(Clone, Debug, PartialEq)]
pub enum FormOutcome<T> {
	/// The API accepted the submission.
	Accepted(T),
	/// The API answered 422; the errors are also stored in the session.
	Rejected(FieldErrors),
}
impl<T> FormOutcome<T> {
	/// Returns `true` for [`FormOutcome::Accepted`].
	pub fn is_accepted(&self) -> bool {
		matches!(self, Self::Accepted(_))
	}

	/// Field errors of a rejected submission.
	pub fn errors(&self) -> Option<&FieldErrors> {
		match self {
			Self::Accepted(_) => None,
			Self::Rejected(errors) => Some(errors),
		}
	}
}

#[derive(Serialize)]
struct LoginPayload<'a> {
	email: &'a str,
	password: &'a str,
}

#[derive(Serialize)]
struct RegisterPayload<'a> {
	name: &'a str,
	email: &'a str,
	password: &'a str,
}

#[derive(Deserialize)]
struct TokenBody {
	token: String,
}

impl<C> Gateway<C>
where
	C: ?Sized + HttpTransport,
{
	/// Signs in with email + password.
	///
	/// On success the returned credential is persisted and the profile is fetched; a
	/// failing profile fetch is logged and leaves the user unset. A 422 answer is returned
	/// as [`FormOutcome::Rejected`] and mirrored into the session's form errors.
	pub async fn login(
		&self,
		email: &str,
		password: &str,
	) -> Result<FormOutcome<Option<UserProfile>>> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.session.clear_errors();

				let request = ApiRequest::post(&self.config.endpoints.login)
					.with_json(&LoginPayload { email, password })?;
				let response = match self.execute(request).await {
					Ok(response) => response,
					Err(Error::Validation(errors)) => return Ok(self.reject(errors)),
					Err(e) => return Err(e),
				};
				let TokenBody { token } = response.json()?;

				self.adopt_credential(&Credential::new(token)).await?;

				let user = match self.load_user().await {
					Ok(user) => Some(user),
					Err(e) => {
						obs::record_warning(KIND, &format_args!("profile load after login failed: {e}"));

						None
					},
				};

				Ok(FormOutcome::Accepted(user))
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Creates an account. The API's 422 answer is handled as for [`Gateway::login`].
	pub async fn register(
		&self,
		name: &str,
		email: &str,
		password: &str,
	) -> Result<FormOutcome<()>> {
		const KIND: FlowKind = FlowKind::Register;

		let span = FlowSpan::new(KIND, "register");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.session.clear_errors();

				let request = ApiRequest::post(&self.config.endpoints.register)
					.with_json(&RegisterPayload { name, email, password })?;

				match self.execute(request).await {
					Ok(_) => Ok(FormOutcome::Accepted(())),
					Err(Error::Validation(errors)) => Ok(self.reject(errors)),
					Err(e) => Err(e),
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Signs out remotely (best effort) and always clears the local session.
	///
	/// Safe to call when already signed out; only a local storage failure is returned.
	pub async fn logout(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Logout;

		let span = FlowSpan::new(KIND, "logout");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				if let Err(e) = self.execute(ApiRequest::post(&self.config.endpoints.logout)).await {
					obs::record_warning(KIND, &format_args!("remote logout failed: {e}"));
				}

				self.forget_credential();
				self.session.clear_user().await?;

				Ok(())
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Fetches the signed-in user's profile and stores it in the session.
	pub async fn load_user(&self) -> Result<UserProfile> {
		const KIND: FlowKind = FlowKind::Profile;

		let span = FlowSpan::new(KIND, "load_user");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let user: UserProfile =
					self.send(ApiRequest::get(&self.config.endpoints.profile)).await?.json()?;

				self.session.set_user(user.clone()).await?;

				Ok(user)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Loads the profile at startup when storage says the client is signed in.
	pub async fn restore(&self) -> Result<Option<UserProfile>> {
		obs::record_flow_outcome(FlowKind::Restore, FlowOutcome::Attempt);

		let result = if self.session.is_authenticated() {
			self.load_user().await.map(Some)
		} else {
			Ok(None)
		};

		obs::record_result(FlowKind::Restore, &result);

		result
	}

	fn reject<T>(&self, errors: FieldErrors) -> FormOutcome<T> {
		self.session.set_errors(errors.clone());

		FormOutcome::Rejected(errors)
	}
}
