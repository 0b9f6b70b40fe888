//! Simple file-backed [`CredentialStore`] durable across process restarts on one device.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	store::{self, CompareAndSwapOutcome, CredentialStore, StoreError, StoreFuture},
};

/// Persists the credential pair to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<CredentialPair>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { None };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<Option<CredentialPair>, StoreError> {
		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist_locked(&self, contents: &Option<CredentialPair>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl CredentialStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn save(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			*guard = Some(pair);
			self.persist_locked(&guard)?;

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, Option<CredentialPair>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let previous = guard.take();

			self.persist_locked(&guard)?;

			Ok(previous)
		})
	}

	fn compare_and_swap<'a>(
		&'a self,
		expected_refresh: Option<&'a str>,
		replacement: CredentialPair,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let outcome = match guard.as_ref() {
				Some(existing)
					if store::refresh_matches(existing.refresh_token.as_ref(), expected_refresh) =>
					CompareAndSwapOutcome::Updated,
				Some(_) => CompareAndSwapOutcome::RefreshMismatch,
				None => CompareAndSwapOutcome::Missing,
			};

			if matches!(outcome, CompareAndSwapOutcome::Updated) {
				*guard = Some(replacement);
				self.persist_locked(&guard)?;
			}

			Ok(outcome)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let unique = format!(
			"jwt_session_client_file_store_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	#[test]
	fn save_and_reload_round_trip() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let pair = CredentialPair::new("access-token", "refresh-token");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save(pair.clone()))
			.expect("Failed to save credential pair to file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.load())
			.expect("Failed to load credential pair from file store.")
			.expect("File store lost the pair after reopen.");

		assert_eq!(fetched.access_token.expose(), pair.access_token.expose());
		assert_eq!(
			fetched.refresh_token.as_ref().map(|secret| secret.expose()),
			pair.refresh_token.as_ref().map(|secret| secret.expose())
		);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn clear_persists_the_empty_snapshot() {
		let path = temp_path();
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save(CredentialPair::new("access", "refresh")))
			.expect("Failed to save credential pair to file store.");

		let removed =
			rt.block_on(store.clear()).expect("Failed to clear credential pair from file store.");

		assert!(removed.is_some());
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched =
			rt.block_on(reopened.load()).expect("Failed to load snapshot after clearing.");

		assert!(fetched.is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
