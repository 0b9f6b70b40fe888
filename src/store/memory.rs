//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	store::{self, CompareAndSwapOutcome, CredentialStore, StoreError, StoreFuture},
};

type Slot = Arc<RwLock<Option<CredentialPair>>>;

/// Thread-safe storage backend that keeps the pair in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	fn save_now(slot: Slot, pair: CredentialPair) -> Result<(), StoreError> {
		*slot.write() = Some(pair);

		Ok(())
	}

	fn load_now(slot: Slot) -> Option<CredentialPair> {
		slot.read().clone()
	}

	fn clear_now(slot: Slot) -> Option<CredentialPair> {
		slot.write().take()
	}

	fn cas_now(
		slot: Slot,
		expected_refresh: Option<&str>,
		replacement: CredentialPair,
	) -> CompareAndSwapOutcome {
		let mut guard = slot.write();
		let outcome = match guard.as_ref() {
			Some(existing)
				if store::refresh_matches(existing.refresh_token.as_ref(), expected_refresh) =>
				CompareAndSwapOutcome::Updated,
			Some(_) => CompareAndSwapOutcome::RefreshMismatch,
			None => CompareAndSwapOutcome::Missing,
		};

		if matches!(outcome, CompareAndSwapOutcome::Updated) {
			*guard = Some(replacement);
		}

		outcome
	}
}
impl CredentialStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::load_now(slot)) })
	}

	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move { Self::save_now(slot, pair) })
	}

	fn clear(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::clear_now(slot)) })
	}

	fn compare_and_swap<'a>(
		&'a self,
		expected_refresh: Option<&'a str>,
		replacement: CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::cas_now(slot, expected_refresh, replacement)) })
	}
}
