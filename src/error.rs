//! Client-level error types shared across dispatch, refresh, and storage.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Authentication irrecoverable for this request.
	#[error(transparent)]
	Auth(#[from] AuthError),
}

/// Configuration and validation failures raised at client construction or request build time.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Base URL string is empty.
	#[error("Base URL must not be empty.")]
	EmptyBaseUrl,
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Offending request path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Timeout must be strictly positive.
	#[error("Timeout must be strictly positive.")]
	NonPositiveTimeout,
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized to JSON.")]
	BodySerialize(#[from] serde_json::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO); surfaced to the caller and eligible for
/// caller-level retry. Dispatch never attempts a token refresh after one of these.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The per-request timeout elapsed before a response arrived.
	#[error("Request timed out.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Authentication failures; every variant means the caller should route to an
/// unauthenticated entry point (e.g. a login page) instead of retrying the request.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// The server rejected the request with 401 after its single refresh-and-retry cycle.
	#[error("Request remained unauthorized after a token refresh.")]
	Unauthorized,
	/// No refresh token is present in storage, so no refresh was attempted.
	#[error("No refresh token is available in storage.")]
	NoRefreshToken,
	/// The refresh endpoint could not produce a new credential pair.
	#[error("Token refresh was rejected: {reason}.")]
	RefreshRejected {
		/// HTTP status returned by the refresh endpoint, when one was received.
		status: Option<u16>,
		/// Human-readable summary of the rejection.
		reason: String,
	},
}
impl AuthError {
	/// Returns `true` when the stored session is unusable and the caller must log in again.
	pub fn session_ended(&self) -> bool {
		matches!(self, Self::NoRefreshToken | Self::RefreshRejected { .. })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_terminal_variants_end_the_session() {
		assert!(AuthError::NoRefreshToken.session_ended());
		assert!(
			AuthError::RefreshRejected { status: Some(401), reason: "token blacklisted".into() }
				.session_ended()
		);
		assert!(!AuthError::Unauthorized.session_ended());
	}

	#[test]
	fn store_error_converts_into_client_error_with_source() {
		let store_error =
			crate::store::StoreError::Backend { message: "snapshot unwritable".into() };
		let client_error: Error = store_error.clone().into();

		assert!(matches!(client_error, Error::Storage(_)));
		assert!(client_error.to_string().contains("snapshot unwritable"));

		let source = StdError::source(&client_error)
			.expect("Client error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
