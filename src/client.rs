//! Session client orchestrating request dispatch and single-flight token refresh.
//!
//! [`SessionClient::send`] reads the credential pair fresh from storage for every request,
//! attaches the `JWT` authorization header, and interprets a 401 as "access token expired":
//! it refreshes once, replays the original request once with the rotated token, and surfaces
//! [`AuthError`] when that is not enough. Refreshes are serialized behind a single guard so
//! a burst of concurrent 401s produces exactly one refresh network call; late arrivals reuse
//! the pair the winner stored.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::CredentialPair,
	config::ClientConfig,
	error::AuthError,
	http::{HttpResponse, PreparedRequest, RequestDescriptor, Transport},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{CompareAndSwapOutcome, CredentialStore},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

const MAX_REJECTION_REASON_LEN: usize = 256;

#[cfg(feature = "reqwest")]
/// Session client specialized for the crate's default reqwest transport.
pub type ReqwestSessionClient = SessionClient<ReqwestTransport>;

#[derive(Serialize)]
struct RefreshRequest<'a> {
	refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
	access: String,
	refresh: String,
}

/// How a refresh was triggered; decides whether a concurrent rotation may be reused.
enum RefreshMode {
	/// Explicit caller-requested refresh; always hits the endpoint.
	Forced,
	/// Refresh after a 401, carrying the access token the rejected request was sent with.
	/// If storage holds a different token by the time the guard is acquired, another caller
	/// already rotated and its pair is reused instead of refreshing again.
	AfterUnauthorized(Option<String>),
}

/// JWT-authenticated HTTP client with storage-backed credentials.
///
/// The client owns the transport, the credential store, and the immutable configuration so
/// the dispatch path can focus on the refresh-and-replay protocol. Credentials are never
/// cached on the client itself; storage is the single source of truth, which keeps every
/// clone of the client (and every concurrent caller) on the most recently issued pair.
#[derive(Clone)]
pub struct SessionClient<T>
where
	T: ?Sized + Transport,
{
	/// Transport used for every outbound request.
	pub transport: Arc<T>,
	/// Durable credential store read at send time.
	pub store: Arc<dyn CredentialStore>,
	/// Immutable client configuration.
	pub config: ClientConfig,
	/// Shared counters for refresh flow outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl<T> SessionClient<T>
where
	T: ?Sized + Transport,
{
	/// Creates a client that reuses the caller-provided transport.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config,
			refresh_metrics: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Installs a credential pair (initial login), replacing whatever storage held.
	pub async fn install_credentials(&self, pair: CredentialPair) -> Result<()> {
		Ok(self.store.save(pair).await?)
	}

	/// Removes the stored credential pair (logout), returning whatever was present.
	pub async fn clear_credentials(&self) -> Result<Option<CredentialPair>> {
		Ok(self.store.clear().await?)
	}

	/// Dispatches a request with the current access token, refreshing and replaying once on 401.
	///
	/// - Transport failures surface as [`TransportError`](crate::error::TransportError) and never
	///   trigger a refresh.
	/// - Responses other than 401 come back unchanged, success or not.
	/// - A 401 triggers the refresh flow; when it succeeds the original request is re-sent
	///   exactly once with the rotated token. A second 401, or any refresh failure, surfaces
	///   [`AuthError`] and the caller should route to its unauthenticated entry point.
	pub async fn send(&self, mut request: RequestDescriptor) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::Dispatch;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let pair = self.store.load().await?;
				let attempted_with =
					pair.as_ref().map(|pair| pair.access_token.expose().to_owned());
				let prepared = self.prepare(&request, pair.as_ref())?;
				let response = self.transport.execute(prepared).await?;

				if !response.is_unauthorized() {
					return Ok(response);
				}
				if request.is_retried() {
					return Err(AuthError::Unauthorized.into());
				}

				let rotated = self.refresh_flow(RefreshMode::AfterUnauthorized(attempted_with)).await?;

				request.mark_retried();

				let prepared = self.prepare(&request, Some(&rotated))?;
				let response = self.transport.execute(prepared).await?;

				if response.is_unauthorized() {
					return Err(AuthError::Unauthorized.into());
				}

				Ok(response)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Explicitly rotates the credential pair via the refresh endpoint.
	///
	/// Always performs the network call (under the single-flight guard); use this for
	/// preemptive rotation rather than 401 recovery, which [`SessionClient::send`] handles
	/// on its own.
	pub async fn refresh(&self) -> Result<CredentialPair> {
		self.refresh_flow(RefreshMode::Forced).await
	}

	/// Merges defaults, per-request headers, and the authorization header into a
	/// transport-ready request.
	fn prepare(
		&self,
		request: &RequestDescriptor,
		pair: Option<&CredentialPair>,
	) -> Result<PreparedRequest> {
		let url = self.config.resolve(&request.path)?;
		let mut headers: BTreeMap<String, String> = BTreeMap::new();

		headers.insert("content-type".into(), "application/json".into());
		headers.insert("accept".into(), "application/json".into());
		headers.extend(self.config.default_headers.clone());
		headers.extend(request.headers.clone());

		if let Some(pair) = pair {
			headers.insert("authorization".into(), pair.authorization_value());
		}

		Ok(PreparedRequest { method: request.method, url, headers, body: request.body.clone() })
	}

	async fn refresh_flow(&self, mode: RefreshMode) -> Result<CredentialPair> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "refresh_flow");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.refresh_metrics.record_attempt();

				let _singleflight = self.refresh_guard.lock().await;
				let current = self.store.load().await.map_err(|err| {
					self.refresh_metrics.record_failure();

					Error::from(err)
				})?;

				if let RefreshMode::AfterUnauthorized(attempted_with) = &mode
					&& let Some(pair) = current.as_ref()
					&& Some(pair.access_token.expose()) != attempted_with.as_deref()
				{
					// Another caller rotated while this one waited on the guard.
					self.refresh_metrics.record_success();

					return Ok(pair.clone());
				}

				let current = current.ok_or_else(|| {
					self.refresh_metrics.record_failure();

					Error::from(AuthError::NoRefreshToken)
				})?;
				let expected_refresh = current
					.refresh_token
					.as_ref()
					.map(|secret| secret.expose().to_owned())
					.ok_or_else(|| {
						self.refresh_metrics.record_failure();

						Error::from(AuthError::NoRefreshToken)
					})?;
				let descriptor = RequestDescriptor::post(self.config.refresh_path.clone())
					.json(&RefreshRequest { refresh: &expected_refresh })
					.inspect_err(|_| {
						self.refresh_metrics.record_failure();
					})?;
				let prepared = self.prepare(&descriptor, Some(&current)).inspect_err(|_| {
					self.refresh_metrics.record_failure();
				})?;
				let response = match self.transport.execute(prepared).await {
					Ok(response) => response,
					Err(err) => {
						self.refresh_metrics.record_failure();

						return Err(AuthError::RefreshRejected {
							status: None,
							reason: err.to_string(),
						}
						.into());
					},
				};

				if !response.is_success() {
					self.refresh_metrics.record_failure();

					return Err(AuthError::RefreshRejected {
						status: Some(response.status),
						reason: rejection_reason(&response),
					}
					.into());
				}

				let payload: RefreshResponse = response.json().map_err(|err| {
					self.refresh_metrics.record_failure();

					Error::from(AuthError::RefreshRejected {
						status: Some(err.status),
						reason: "token payload is not valid JSON".into(),
					})
				})?;
				let rotated = CredentialPair::new(payload.access, payload.refresh);
				let outcome = self
					.store
					.compare_and_swap(Some(expected_refresh.as_str()), rotated.clone())
					.await
					.map_err(|err| {
						self.refresh_metrics.record_failure();

						Error::from(err)
					})?;
				let result = match outcome {
					CompareAndSwapOutcome::Updated => rotated,
					CompareAndSwapOutcome::Missing => {
						self.store.save(rotated.clone()).await.map_err(|err| {
							self.refresh_metrics.record_failure();

							Error::from(err)
						})?;

						rotated
					},
					CompareAndSwapOutcome::RefreshMismatch => {
						match self.store.load().await.map_err(|err| {
							self.refresh_metrics.record_failure();

							Error::from(err)
						})? {
							Some(existing) => existing,
							None => {
								self.store.save(rotated.clone()).await.map_err(|err| {
									self.refresh_metrics.record_failure();

									Error::from(err)
								})?;

								rotated
							},
						}
					},
				};

				self.refresh_metrics.record_success();

				Ok(result)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl SessionClient<ReqwestTransport> {
	/// Creates a client with the default reqwest transport built from the configuration.
	///
	/// The transport honors the configured per-request timeout and never follows redirects.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		let transport = ReqwestTransport::from_config(&config)?;

		Ok(Self::with_transport(config, store, transport))
	}
}
impl<T> Debug for SessionClient<T>
where
	T: ?Sized + Transport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("timeout", &self.config.timeout)
			.field("refresh_path", &self.config.refresh_path)
			.finish()
	}
}

fn rejection_reason(response: &HttpResponse) -> String {
	let text = response.text();
	let trimmed = text.trim();

	if trimmed.is_empty() {
		return "refresh endpoint returned an error status".into();
	}

	trimmed.chars().take(MAX_REJECTION_REASON_LEN).collect()
}
