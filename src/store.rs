//! Storage contracts and built-in credential store implementations.
//!
//! The store is a durable key-value boundary holding at most one credential pair under the
//! `access_token`/`refresh_token` keys. [`CredentialStore::compare_and_swap`] keys the swap
//! on the expected current refresh secret so a refresh that lost a race can never clobber a
//! newer pair.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::CredentialPair};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the client's credential pair.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Returns the stored pair, if any.
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>>;

	/// Persists or replaces the stored pair unconditionally (initial login).
	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

	/// Removes the stored pair, returning whatever was present (logout).
	fn clear(&self) -> StoreFuture<'_, Option<CredentialPair>>;

	/// Atomically replaces the pair if the stored refresh secret matches the expected one.
	fn compare_and_swap<'a>(
		&'a self,
		expected_refresh: Option<&'a str>,
		replacement: CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Result of a credential compare-and-swap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh secret matched the expected value and the pair was replaced.
	Updated,
	/// A pair exists but its refresh secret did not match; a concurrent rotation won.
	RefreshMismatch,
	/// No pair was stored.
	Missing,
}

/// Error type produced by [`CredentialStore`] implementations.
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

pub(crate) fn refresh_matches(
	current: Option<&crate::auth::TokenSecret>,
	expected: Option<&str>,
) -> bool {
	match (current.map(crate::auth::TokenSecret::expose), expected) {
		(None, None) => true,
		(Some(cur), Some(exp)) => cur == exp,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::TokenSecret;

	#[test]
	fn refresh_matching_requires_equal_secrets() {
		let secret = TokenSecret::new("refresh-1");

		assert!(refresh_matches(Some(&secret), Some("refresh-1")));
		assert!(refresh_matches(None, None));
		assert!(!refresh_matches(Some(&secret), Some("refresh-2")));
		assert!(!refresh_matches(Some(&secret), None));
		assert!(!refresh_matches(None, Some("refresh-1")));
	}

	#[test]
	fn compare_and_swap_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&CompareAndSwapOutcome::Updated)
			.expect("CompareAndSwapOutcome should serialize to JSON.");

		assert_eq!(payload, "\"Updated\"");

		let round_trip: CompareAndSwapOutcome = serde_json::from_str(&payload)
			.expect("Serialized outcome should deserialize from JSON.");

		assert_eq!(round_trip, CompareAndSwapOutcome::Updated);
	}
}
