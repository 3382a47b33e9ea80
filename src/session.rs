//! Client session state: the signed-in user, the authenticated flag, and form errors.

// self
use crate::{
	_prelude::*,
	auth::{FieldErrors, UserProfile},
	obs::{self, FlowKind},
	store::{ClientStore, StoreError},
};

/// Point-in-time copy of the session, suitable for rendering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
	/// Current user profile, if loaded.
	pub user: Option<UserProfile>,
	/// Whether the client believes it holds a usable credential.
	pub is_authenticated: bool,
	/// Validation errors from the last rejected form.
	pub errors: FieldErrors,
}

/// Shared session store mutated by account actions and by the gateway on teardown.
///
/// Mutations that touch the user also write through to the [`ClientStore`] so a
/// restarted client can restore the same state.
pub struct SessionState {
	store: Arc<dyn ClientStore>,
	inner: RwLock<SessionSnapshot>,
}
impl SessionState {
	/// Creates an empty, unauthenticated session backed by `store`.
	pub fn new(store: Arc<dyn ClientStore>) -> Self {
		Self { store, inner: Default::default() }
	}

	/// Rebuilds the session from durable storage.
	///
	/// The user comes from the cached profile and the authenticated flag from the
	/// presence of a credential. A cached profile that no longer parses is dropped.
	pub async fn restore(store: Arc<dyn ClientStore>) -> Result<Self, StoreError> {
		let is_authenticated = store.credential().await?.is_some();
		let user = match store.user().await {
			Ok(user) => user,
			Err(StoreError::Serialization { message }) => {
				obs::record_warning(FlowKind::Restore, &message);

				None
			},
			Err(e) => return Err(e),
		};

		Ok(Self {
			store,
			inner: RwLock::new(SessionSnapshot { user, is_authenticated, errors: Default::default() }),
		})
	}

	/// Storage backend shared with the gateway.
	pub fn store(&self) -> &Arc<dyn ClientStore> {
		&self.store
	}

	/// Current user profile.
	pub fn user(&self) -> Option<UserProfile> {
		self.inner.read().user.clone()
	}

	/// Whether the session is authenticated.
	pub fn is_authenticated(&self) -> bool {
		self.inner.read().is_authenticated
	}

	/// Validation errors from the last rejected form.
	pub fn errors(&self) -> FieldErrors {
		self.inner.read().errors.clone()
	}

	/// Copies the whole session state.
	pub fn snapshot(&self) -> SessionSnapshot {
		self.inner.read().clone()
	}

	/// Stores the signed-in user and persists the profile.
	pub async fn set_user(&self, user: UserProfile) -> Result<(), StoreError> {
		self.store.save_user(Some(&user)).await?;

		let mut guard = self.inner.write();

		guard.user = Some(user);
		guard.is_authenticated = true;

		Ok(())
	}

	/// Signs the user out locally, erasing the profile and the credential.
	pub async fn clear_user(&self) -> Result<(), StoreError> {
		{
			let mut guard = self.inner.write();

			guard.user = None;
			guard.is_authenticated = false;
		}

		self.store.clear_session().await
	}

	/// Replaces the current form errors.
	pub fn set_errors(&self, errors: FieldErrors) {
		self.inner.write().errors = errors;
	}

	/// Clears the current form errors.
	pub fn clear_errors(&self) {
		self.inner.write().errors = FieldErrors::default();
	}
}
impl Debug for SessionState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionState").field("state", &*self.inner.read()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::{MemoryStore, StoreKey};

	fn profile() -> UserProfile {
		serde_json::from_str("{\"id\":1,\"name\":\"Ann\",\"email\":\"a@b.com\"}")
			.expect("Profile fixture should deserialize.")
	}

	#[tokio::test]
	async fn restore_derives_authentication_from_credential() {
		let backend = Arc::new(MemoryStore::default());

		backend.set(StoreKey::AccessToken, "T1".into()).await.expect("Seeding should succeed.");

		let session = SessionState::restore(backend.clone()).await.expect("Restore should succeed.");

		assert!(session.is_authenticated());
		assert_eq!(session.user(), None);
	}

	#[tokio::test]
	async fn restore_drops_corrupt_profile() {
		let backend = Arc::new(MemoryStore::default());

		backend.set(StoreKey::User, "{not json".into()).await.expect("Seeding should succeed.");

		let session = SessionState::restore(backend).await.expect("Restore should succeed.");

		assert_eq!(session.snapshot(), SessionSnapshot::default());
	}

	#[tokio::test]
	async fn set_and_clear_user_write_through() {
		let backend = Arc::new(MemoryStore::default());
		let session = SessionState::new(backend.clone());

		backend.set(StoreKey::AccessToken, "T1".into()).await.expect("Seeding should succeed.");
		session.set_user(profile()).await.expect("Setting the user should succeed.");

		assert!(session.is_authenticated());
		assert!(backend.peek(StoreKey::User).is_some_and(|raw| raw.contains("a@b.com")));

		session.clear_user().await.expect("Clearing the user should succeed.");
		session.clear_user().await.expect("Clearing twice should succeed.");

		assert!(!session.is_authenticated());
		assert!(!backend.contains(StoreKey::User));
		assert!(!backend.contains(StoreKey::AccessToken));
	}

	#[test]
	fn errors_can_be_set_and_cleared() {
		let session = SessionState::new(Arc::new(MemoryStore::default()));
		let errors = FieldErrors::from_iter([("email", ["required"])]);

		session.set_errors(errors.clone());

		assert_eq!(session.errors(), errors);

		session.clear_errors();

		assert!(session.errors().is_empty());
	}
}
