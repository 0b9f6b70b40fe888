//! Request/response primitives and the transport seam used by the session client.
//!
//! [`Transport`] is the crate's only dependency on an HTTP stack. The default
//! [`ReqwestTransport`] (feature `reqwest`, enabled by default) applies the configured
//! per-request timeout and never follows redirects, so a 401 from the origin reaches the
//! dispatch path instead of being masked by an interstitial hop.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{_prelude::*, error::TransportError};
#[cfg(feature = "reqwest")] use crate::{config::ClientConfig, error::ConfigError};

/// HTTP methods supported by the request descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
	/// HTTP HEAD.
	Head,
}
impl Method {
	/// Returns the canonical uppercase method name.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
			Method::Head => "HEAD",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Caller-facing description of one outgoing request.
///
/// The private `retried` flag marks a request that already went through its single
/// refresh-and-retry cycle; dispatch refuses to refresh for it a second time.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
	/// HTTP method.
	pub method: Method,
	/// Request path, resolved against the configured base URL.
	pub path: String,
	/// Extra headers for this request, keyed by lowercase header name.
	pub headers: BTreeMap<String, String>,
	/// Raw request body bytes, if any.
	pub body: Option<Vec<u8>>,
	retried: bool,
}
impl RequestDescriptor {
	/// Creates a descriptor for the provided method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: BTreeMap::new(), body: None, retried: false }
	}

	/// Shorthand for a GET descriptor.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a POST descriptor.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Adds a per-request header. Names are normalized to lowercase.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());

		self
	}

	/// Serializes a JSON payload into the request body.
	pub fn json<T>(mut self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		self.body =
			Some(serde_json::to_vec(payload).map_err(crate::error::ConfigError::BodySerialize)?);

		Ok(self)
	}

	/// Returns `true` once the request has been replayed after a token refresh.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

/// Fully resolved request handed to a [`Transport`]: absolute URL plus merged headers.
#[derive(Clone, Debug)]
pub struct PreparedRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Merged headers (defaults, per-request, authorization), keyed by lowercase name.
	pub headers: BTreeMap<String, String>,
	/// Raw request body bytes, if any.
	pub body: Option<Vec<u8>>,
}

/// Response surfaced to callers unchanged apart from buffering the body.
#[derive(Clone, Debug)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers, keyed by lowercase name; non-UTF-8 values are dropped.
	pub headers: BTreeMap<String, String>,
	/// Buffered response body.
	pub body: Vec<u8>,
}
impl HttpResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns `true` for 401 Unauthorized.
	pub fn is_unauthorized(&self) -> bool {
		self.status == 401
	}

	/// Returns the body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Deserializes the body as JSON, preserving the failing path in the error.
	pub fn json<T>(&self) -> Result<T, ResponseParseError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ResponseParseError { status: self.status, source })
	}
}

/// Body-deserialization failure carrying the HTTP status it arrived under.
#[derive(Debug, ThisError)]
#[error("Response body is not valid JSON (status {status}).")]
pub struct ResponseParseError {
	/// HTTP status code of the malformed response.
	pub status: u16,
	/// Structured parsing failure.
	#[source]
	pub source: serde_path_to_error::Error<serde_json::Error>,
}

/// Boxed future returned by [`Transport`] implementations.
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of executing prepared requests.
///
/// Implementations must be `Send + Sync + 'static` so a single client can be shared across
/// whatever concurrency context the caller uses. Transports report only transport-level
/// failures; non-2xx statuses come back as ordinary [`HttpResponse`] values for the
/// dispatch layer to interpret.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Executes a prepared request and buffers the response.
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a transport honoring the configured per-request timeout.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(config.timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing [`ReqwestClient`]. The caller is responsible for configuring
	/// timeouts and redirect policy on it.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Transport for ReqwestTransport {
	fn execute(&self, request: PreparedRequest) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move {
			let method = match request.method {
				Method::Get => reqwest::Method::GET,
				Method::Post => reqwest::Method::POST,
				Method::Put => reqwest::Method::PUT,
				Method::Patch => reqwest::Method::PATCH,
				Method::Delete => reqwest::Method::DELETE,
				Method::Head => reqwest::Method::HEAD,
			};
			let mut builder = client.request(method, request.url);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| {
					value.to_str().ok().map(|value| (name.as_str().to_owned(), value.to_owned()))
				})
				.collect();
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(HttpResponse { status, headers, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn descriptor_starts_unretried_and_normalizes_headers() {
		let descriptor = RequestDescriptor::get("/v1/items/").header("X-Request-Id", "abc");

		assert!(!descriptor.is_retried());
		assert_eq!(descriptor.headers.get("x-request-id").map(String::as_str), Some("abc"));
	}

	#[test]
	fn json_helper_sets_the_body() {
		let descriptor = RequestDescriptor::post("/v1/items/")
			.json(&serde_json::json!({ "name": "widget" }))
			.expect("JSON body fixture should serialize.");

		assert_eq!(descriptor.body.as_deref(), Some(br#"{"name":"widget"}"# as &[u8]));
	}

	#[test]
	fn response_json_reports_status_on_malformed_bodies() {
		let response =
			HttpResponse { status: 200, headers: BTreeMap::new(), body: b"not json".to_vec() };
		let err = response
			.json::<serde_json::Value>()
			.expect_err("Malformed body should fail to parse.");

		assert_eq!(err.status, 200);
	}

	#[test]
	fn status_predicates() {
		let ok = HttpResponse { status: 204, headers: BTreeMap::new(), body: Vec::new() };
		let unauthorized = HttpResponse { status: 401, headers: BTreeMap::new(), body: Vec::new() };

		assert!(ok.is_success());
		assert!(!ok.is_unauthorized());
		assert!(unauthorized.is_unauthorized());
		assert!(!unauthorized.is_success());
	}
}
