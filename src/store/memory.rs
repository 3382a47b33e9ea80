//! Thread-safe in-memory [`ClientStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{ClientStore, StoreFuture, StoreKey},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, String>>>;

/// Thread-safe storage backend that keeps entries in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns a copy of the value under `key` without going through the async contract.
	pub fn peek(&self, key: StoreKey) -> Option<String> {
		self.0.read().get(&key).cloned()
	}

	/// Returns `true` when `key` holds a value.
	pub fn contains(&self, key: StoreKey) -> bool {
		self.0.read().contains_key(&key)
	}
}
impl ClientStore for MemoryStore {
	fn get(&self, key: StoreKey) -> StoreFuture<'_, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn set(&self, key: StoreKey, value: String) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(key, value);

			Ok(())
		})
	}

	fn remove(&self, key: StoreKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(&key);

			Ok(())
		})
	}
}
