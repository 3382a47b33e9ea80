//! Profile returned by the API for the signed-in user.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Current user profile cached by the session and durable storage.
///
/// Fields beyond `id`, `name`, and `email` are kept verbatim in
/// [`extra`](Self::extra) so views can read whatever the API adds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Server-side identifier.
	pub id: Value,
	/// Display name.
	#[serde(default)]
	pub name: String,
	/// Account email address.
	#[serde(default)]
	pub email: String,
	/// Remaining profile attributes.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
