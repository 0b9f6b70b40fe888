#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use jwt_session_client::{
	_preludet::*,
	auth::CredentialPair,
	http::{HttpResponse, RequestDescriptor},
};

#[tokio::test]
async fn concurrent_unauthorized_requests_share_a_single_refresh_call() {
	let server = MockServer::start_async().await;
	let (client, store) = build_reqwest_test_client(&server.base_url());

	client
		.install_credentials(CredentialPair::new("access-stale", "refresh-stale"))
		.await
		.expect("Seeding credentials into the store should succeed.");

	let _stale_resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/data/").header("authorization", "JWT access-stale");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"detail\":\"token expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/auth/tokens/refresh/")
				.body("{\"refresh\":\"refresh-stale\"}");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access\":\"access-new\",\"refresh\":\"refresh-new\"}");
		})
		.await;
	let _fresh_resource = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/data/").header("authorization", "JWT access-new");
			then.status(200).header("content-type", "application/json").body("{\"value\":42}");
		})
		.await;
	let (first, second, third): (
		Result<HttpResponse>,
		Result<HttpResponse>,
		Result<HttpResponse>,
	) = tokio::join!(
		client.send(RequestDescriptor::get("/v1/data/")),
		client.send(RequestDescriptor::get("/v1/data/")),
		client.send(RequestDescriptor::get("/v1/data/")),
	);
	let first = first.expect("First concurrent request should succeed.");
	let second = second.expect("Second concurrent request should succeed.");
	let third = third.expect("Third concurrent request should succeed.");

	// Every request completed on the rotated token; the 200 is only reachable with it.
	for response in [&first, &second, &third] {
		assert_eq!(response.status, 200);
		assert_eq!(response.text(), "{\"value\":42}");
	}

	// The stampede collapses into exactly one refresh network call.
	refresh.assert_calls_async(1).await;

	let stored = store
		.load()
		.await
		.expect("Loading the rotated pair should succeed.")
		.expect("Storage should hold the rotated pair.");

	assert_eq!(stored.access_token.expose(), "access-new");
	assert_eq!(stored.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-new"));
}
