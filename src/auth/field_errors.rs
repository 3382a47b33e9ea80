//! Field-keyed validation messages returned by the API for rejected forms.

// std
use std::collections::btree_map::Iter;
// self
use crate::_prelude::*;

/// Validation messages keyed by form field, as found under `errors` in a 422 body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);
impl FieldErrors {
	/// Returns `true` when no field carries an error.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Number of fields with at least one message.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Messages recorded for `field`.
	pub fn get(&self, field: &str) -> Option<&[String]> {
		self.0.get(field).map(Vec::as_slice)
	}

	/// First message recorded for `field`, handy for inline form hints.
	pub fn first(&self, field: &str) -> Option<&str> {
		self.get(field).and_then(|messages| messages.first()).map(String::as_str)
	}

	/// Iterates over `(field, messages)` pairs in field order.
	pub fn iter(&self) -> Iter<'_, String, Vec<String>> {
		self.0.iter()
	}
}
impl<K, V, M> FromIterator<(K, V)> for FieldErrors
where
	K: Into<String>,
	V: IntoIterator<Item = M>,
	M: Into<String>,
{
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|(field, messages)| {
					(field.into(), messages.into_iter().map(Into::into).collect())
				})
				.collect(),
		)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn deserializes_laravel_style_error_map() {
		let errors: FieldErrors = serde_json::from_str(
			"{\"email\":[\"required\",\"must be an email\"],\"password\":[\"too short\"]}",
		)
		.expect("Field error fixture should deserialize.");

		assert_eq!(errors.len(), 2);
		assert_eq!(errors.first("email"), Some("required"));
		assert_eq!(errors.get("password"), Some(&["too short".to_owned()][..]));
		assert_eq!(errors.get("name"), None);
	}
}
