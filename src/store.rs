//! Storage contracts and built-in implementations for durable client state.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, UserProfile},
};

/// Boxed future returned by [`ClientStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable client-side key/value storage holding the credential and cached profile.
pub trait ClientStore
where
	Self: Send + Sync,
{
	/// Reads the raw value stored under `key`, if present.
	fn get(&self, key: StoreKey) -> StoreFuture<'_, Option<String>>;

	/// Persists or replaces the value stored under `key`.
	fn set(&self, key: StoreKey, value: String) -> StoreFuture<'_, ()>;

	/// Removes `key`; removing an absent key succeeds.
	fn remove(&self, key: StoreKey) -> StoreFuture<'_, ()>;
}
impl dyn ClientStore + '_ {
	/// Reads the persisted bearer credential.
	pub async fn credential(&self) -> Result<Option<Credential>, StoreError> {
		Ok(self.get(StoreKey::AccessToken).await?.map(Credential::new))
	}

	/// Persists the bearer credential.
	pub async fn save_credential(&self, credential: &Credential) -> Result<(), StoreError> {
		self.set(StoreKey::AccessToken, credential.expose().to_owned()).await
	}

	/// Reads the cached profile; a `null` entry reads as no profile.
	pub async fn user(&self) -> Result<Option<UserProfile>, StoreError> {
		match self.get(StoreKey::User).await? {
			Some(raw) => serde_json::from_str::<Option<UserProfile>>(&raw).map_err(|e| {
				StoreError::Serialization { message: format!("Failed to parse cached user: {e}") }
			}),
			None => Ok(None),
		}
	}

	/// Caches the profile (or `null`) as JSON.
	pub async fn save_user(&self, user: Option<&UserProfile>) -> Result<(), StoreError> {
		let raw = serde_json::to_string(&user).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize user: {e}"),
		})?;

		self.set(StoreKey::User, raw).await
	}

	/// Erases both the credential and the cached profile.
	pub async fn clear_session(&self) -> Result<(), StoreError> {
		self.remove(StoreKey::AccessToken).await?;
		self.remove(StoreKey::User).await
	}
}

/// Fixed storage keys used by the gateway and session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKey {
	/// Bearer credential.
	AccessToken,
	/// Serialized [`UserProfile`] or `null`.
	User,
}
impl StoreKey {
	/// Returns the storage key string.
	pub const fn as_str(self) -> &'static str {
		match self {
			StoreKey::AccessToken => "access_token",
			StoreKey::User => "user",
		}
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for StoreKey {
	type Err = StoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"access_token" => Ok(StoreKey::AccessToken),
			"user" => Ok(StoreKey::User),
			other => Err(StoreError::Serialization { message: format!("Unknown store key `{other}`") }),
		}
	}
}

/// Error type produced by [`ClientStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_gateway_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let gateway_error: Error = store_error.clone().into();

		assert!(matches!(gateway_error, Error::Storage(_)));
		assert!(gateway_error.to_string().contains("disk unavailable"));

		let source = StdError::source(&gateway_error)
			.expect("Gateway error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn store_keys_match_storage_names() {
		for key in [StoreKey::AccessToken, StoreKey::User] {
			assert_eq!(key.as_str().parse::<StoreKey>(), Ok(key));
			assert_eq!(
				serde_json::to_string(&key).expect("Store key should serialize."),
				format!("\"{key}\"")
			);
		}

		assert!("refresh_token".parse::<StoreKey>().is_err());
	}

	#[tokio::test]
	async fn null_user_entry_reads_as_none() {
		let backend = MemoryStore::default();
		let store: &dyn ClientStore = &backend;

		store.save_user(None).await.expect("Saving a null user should succeed.");

		assert_eq!(store.get(StoreKey::User).await.expect("Read should succeed."), Some("null".into()));
		assert_eq!(store.user().await.expect("Null user should parse."), None);
	}
}
