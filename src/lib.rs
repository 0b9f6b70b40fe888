//! JWT session HTTP client for API frontends: storage-backed credentials, single-flight token
//! refresh, and replay-once request dispatch in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;
	pub use crate::store::CredentialStore;

	// self
	use crate::{
		client::SessionClient, config::ClientConfig, http::ReqwestTransport, store::MemoryStore,
	};

	/// Client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestClient = SessionClient<ReqwestTransport>;

	/// Constructs a [`SessionClient`] backed by an in-memory store and the default reqwest
	/// transport, pointed at the provided mock server base URL.
	pub fn build_reqwest_test_client(base_url: &str) -> (ReqwestTestClient, Arc<MemoryStore>) {
		let config = ClientConfig::new(base_url, StdDuration::from_secs(5))
			.expect("Test client configuration should be valid.");
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn CredentialStore> = store_backend.clone();
		let client =
			SessionClient::new(config, store).expect("Test client construction should succeed.");

		(client, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {httpmock as _, jwt_session_client as _, tokio as _};
