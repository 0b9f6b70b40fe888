//! Credential pair model and the redacting token secret wrapper.

// self
use crate::_prelude::*;

/// Authorization scheme prefix expected by the backend, e.g. `Authorization: JWT <token>`.
pub const AUTH_SCHEME: &str = "JWT";

/// Redacted token secret wrapper keeping sensitive material out of logs.
///
/// Serializes as the plain inner string so stored snapshots keep the two-key
/// `access_token`/`refresh_token` shape.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Access/refresh token pair held in durable storage.
///
/// Mutated only by an initial install (login) and by a successful refresh; every outgoing
/// request reads the pair fresh to populate its authorization header.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialPair {
	/// Short-lived credential authorizing API requests.
	pub access_token: TokenSecret,
	/// Longer-lived credential used to obtain a new access token, if one was issued.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the pair was installed or rotated.
	pub issued_at: OffsetDateTime,
}
impl CredentialPair {
	/// Builds a pair issued at the current UTC instant.
	pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access),
			refresh_token: Some(TokenSecret::new(refresh)),
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Builds a pair without a refresh token; a later 401 then ends the session.
	pub fn access_only(access: impl Into<String>) -> Self {
		Self {
			access_token: TokenSecret::new(access),
			refresh_token: None,
			issued_at: OffsetDateTime::now_utc(),
		}
	}

	/// Overrides the issued-at instant; mostly useful for fixtures.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Renders the `Authorization` header value for the current access token.
	pub fn authorization_value(&self) -> String {
		format!("{AUTH_SCHEME} {}", self.access_token.expose())
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn issued_at_can_be_pinned_for_fixtures() {
		let instant = macros::datetime!(2026-08-25 12:00 UTC);
		let pair = CredentialPair::new("a", "r").issued_at(instant);

		assert_eq!(pair.issued_at, instant);
	}

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn authorization_value_uses_jwt_scheme() {
		let pair = CredentialPair::new("access-1", "refresh-1");

		assert_eq!(pair.authorization_value(), "JWT access-1");
	}

	#[test]
	fn pair_serializes_with_storage_key_names() {
		let pair = CredentialPair::new("a", "r");
		let json = serde_json::to_value(&pair).expect("Credential pair should serialize to JSON.");

		assert_eq!(json["access_token"], "a");
		assert_eq!(json["refresh_token"], "r");
	}
}
