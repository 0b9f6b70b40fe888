//! Immutable client configuration: base URL, timeout, default headers, refresh endpoint.

// self
use crate::{_prelude::*, error::ConfigError};

/// Per-request timeout applied when the caller does not override it.
pub const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(5);
/// Refresh endpoint path resolved against the base URL.
pub const DEFAULT_REFRESH_PATH: &str = "v1/auth/tokens/refresh/";

/// Immutable configuration shared by every request a [`SessionClient`](crate::client::SessionClient)
/// dispatches.
///
/// Static headers configured here are attached to every outgoing request; the authorization
/// header is never part of this set because it is read fresh from storage at send time.
#[derive(Clone, Debug)]
pub struct ClientConfig {
	/// Base URL every request path is resolved against.
	pub base_url: Url,
	/// Per-request timeout enforced by the transport.
	pub timeout: StdDuration,
	/// Static headers attached to every request, keyed by lowercase header name.
	pub default_headers: BTreeMap<String, String>,
	/// Path of the token refresh endpoint, relative to the base URL.
	pub refresh_path: String,
}
impl ClientConfig {
	/// Validates and builds a configuration from a base URL and timeout.
	///
	/// Fails when the URL is empty or unparseable, or when the timeout is zero.
	pub fn new(base_url: impl AsRef<str>, timeout: StdDuration) -> Result<Self, ConfigError> {
		let raw = base_url.as_ref().trim();

		if raw.is_empty() {
			return Err(ConfigError::EmptyBaseUrl);
		}
		if timeout.is_zero() {
			return Err(ConfigError::NonPositiveTimeout);
		}

		let base_url = Url::parse(raw).map_err(|source| ConfigError::InvalidBaseUrl { source })?;

		Ok(Self {
			base_url,
			timeout,
			default_headers: BTreeMap::new(),
			refresh_path: DEFAULT_REFRESH_PATH.into(),
		})
	}

	/// Adds a static header sent with every request. Names are normalized to lowercase.
	pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.default_headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Overrides the refresh endpoint path (defaults to [`DEFAULT_REFRESH_PATH`]).
	pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
		self.refresh_path = path.into();

		self
	}

	/// Resolves a request path against the base URL.
	pub(crate) fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		self.base_url
			.join(path.trim_start_matches('/'))
			.map_err(|source| ConfigError::InvalidPath { path: path.into(), source })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejects_empty_base_url() {
		let result = ClientConfig::new("  ", DEFAULT_TIMEOUT);

		assert!(matches!(result, Err(ConfigError::EmptyBaseUrl)));
	}

	#[test]
	fn rejects_zero_timeout() {
		let result = ClientConfig::new("http://127.0.0.1:8000/", StdDuration::ZERO);

		assert!(matches!(result, Err(ConfigError::NonPositiveTimeout)));
	}

	#[test]
	fn rejects_unparseable_base_url() {
		let result = ClientConfig::new("not a url", DEFAULT_TIMEOUT);

		assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
	}

	#[test]
	fn resolves_paths_against_the_base_url() {
		let config = ClientConfig::new("http://127.0.0.1:8000/", DEFAULT_TIMEOUT)
			.expect("Base configuration fixture should be valid.");
		let absolute =
			config.resolve("/v1/items/").expect("Leading-slash path should resolve cleanly.");
		let relative = config.resolve("v1/items/").expect("Relative path should resolve cleanly.");

		assert_eq!(absolute.as_str(), "http://127.0.0.1:8000/v1/items/");
		assert_eq!(absolute, relative);
	}

	#[test]
	fn header_names_normalize_to_lowercase() {
		let config = ClientConfig::new("http://127.0.0.1:8000/", DEFAULT_TIMEOUT)
			.expect("Base configuration fixture should be valid.")
			.with_header("X-Client-Version", "0.1.0");

		assert_eq!(config.default_headers.get("x-client-version").map(String::as_str), Some("0.1.0"));
	}
}
