//! HTTP transport tests against the fake provider
//!
//! Token refresh, retry and status mapping of `HttpTransport`.

mod mocks;

use mocks::TestServer;
use realty_adapters::{
	ClientCache, HttpTransport, LoginAuthenticator, LoginCredentials, RetryPolicy, TokenManager,
};
use realty_aggregator::{RequestDescriptor, Transport, TransportError};
use realty_types::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn tokens(server: &TestServer) -> Arc<TokenManager> {
	let authenticator = LoginAuthenticator::new(
		url::Url::parse(&server.auth_url()).unwrap(),
		LoginCredentials::Phone {
			phone: "+70000000000".to_string(),
			password: SecretString::from("secret"),
		},
		2_000,
	)
	.unwrap();
	Arc::new(TokenManager::new(Arc::new(authenticator)))
}

fn fast_retry(max_attempts: u32) -> RetryPolicy {
	RetryPolicy {
		max_attempts,
		base_delay: Duration::from_millis(10),
		max_delay: Duration::from_millis(20),
	}
}

fn transport(server: &TestServer, retry: RetryPolicy) -> HttpTransport {
	HttpTransport::with_cache(Some(tokens(server)), ClientCache::new())
		.with_retry(retry)
		.with_timeout_ms(2_000)
}

#[tokio::test]
async fn test_bearer_token_is_attached() {
	let server = TestServer::spawn().await;
	server.route("/v1/blocks/7", 200, json!({"id": 7}));
	let transport = transport(&server, RetryPolicy::none());

	let payload = transport
		.execute(&RequestDescriptor::get("info", server.url("/v1/blocks/7")))
		.await
		.unwrap();

	assert_eq!(payload["id"], 7);
	assert_eq!(server.login_count(), 1);
}

#[tokio::test]
async fn test_concurrent_expiry_triggers_one_login() {
	let server = TestServer::spawn().await;
	server.route("/v1/blocks", 200, json!([]));
	let transport = Arc::new(transport(&server, RetryPolicy::none()));
	let request = RequestDescriptor::get("catalog", server.url("/v1/blocks"));

	transport.execute(&request).await.unwrap();
	assert_eq!(server.login_count(), 1);

	server.expire_tokens();
	server.set_login_delay(Duration::from_millis(50));

	let calls = (0..10).map(|_| {
		let transport = Arc::clone(&transport);
		let request = request.clone();
		async move { transport.execute(&request).await }
	});
	let results = futures::future::join_all(calls).await;

	assert!(results.iter().all(Result::is_ok));
	assert_eq!(server.login_count(), 2);
}

#[tokio::test]
async fn test_token_rejected_after_refresh_is_auth_expired() {
	let server = TestServer::spawn().await;
	server.route("/v1/blocks/7", 200, json!({"id": 7}));
	server.reject_all_tokens();
	let transport = transport(&server, fast_retry(3));

	let error = transport
		.execute(&RequestDescriptor::get("info", server.url("/v1/blocks/7")))
		.await
		.unwrap_err();

	assert!(matches!(error, TransportError::AuthExpired { .. }));
	// Initial login plus exactly one refresh, never retried
	assert_eq!(server.login_count(), 2);
	assert_eq!(server.hits("/v1/blocks/7"), 2);
}

#[tokio::test]
async fn test_failed_login_is_auth_expired() {
	let server = TestServer::spawn().await;
	server.fail_logins();
	let transport = transport(&server, fast_retry(3));

	let error = transport
		.execute(&RequestDescriptor::get("info", server.url("/v1/blocks/7")))
		.await
		.unwrap_err();

	assert!(matches!(error, TransportError::AuthExpired { .. }));
	assert_eq!(server.hits("/v1/blocks/7"), 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
	let server = TestServer::spawn().await;
	server.route_sequence(
		"/v1/blocks/count",
		vec![(503, json!({})), (502, json!({})), (200, json!({"count": 12}))],
	);
	let transport = transport(&server, fast_retry(3));

	let payload = transport
		.execute(&RequestDescriptor::get("count", server.url("/v1/blocks/count")))
		.await
		.unwrap();

	assert_eq!(payload["count"], 12);
	assert_eq!(server.hits("/v1/blocks/count"), 3);
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
	let server = TestServer::spawn().await;
	server.route("/v1/blocks/count", 503, json!({}));
	let transport = transport(&server, fast_retry(2));

	let error = transport
		.execute(&RequestDescriptor::get("count", server.url("/v1/blocks/count")))
		.await
		.unwrap_err();

	assert_eq!(error.status_code(), Some(503));
	assert!(error.is_transient());
	assert_eq!(server.hits("/v1/blocks/count"), 2);
}

#[tokio::test]
async fn test_post_is_not_retried() {
	let server = TestServer::spawn().await;
	server.route("/v1/blocks/search", 503, json!({}));
	let transport = transport(&server, fast_retry(3));

	let request = RequestDescriptor::post(
		"catalog",
		server.url("/v1/blocks/search"),
		json!({"city": "C1"}),
	);
	let error = transport.execute(&request).await.unwrap_err();

	assert_eq!(error.status_code(), Some(503));
	assert_eq!(server.hits("/v1/blocks/search"), 1);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
	let server = TestServer::spawn().await;
	let transport = transport(&server, fast_retry(3));

	let error = transport
		.execute(&RequestDescriptor::get("info", server.url("/v1/blocks/404")))
		.await
		.unwrap_err();

	assert!(error.is_not_found());
	assert_eq!(server.hits("/v1/blocks/404"), 1);
}

#[tokio::test]
async fn test_slow_endpoint_times_out() {
	let server = TestServer::spawn_open().await;
	server.route("/v1/blocks/7/reviews", 200, json!([]));
	server.delay("/v1/blocks/7/reviews", Duration::from_millis(500));
	let transport = HttpTransport::with_cache(None, ClientCache::new())
		.with_retry(RetryPolicy::none())
		.with_timeout_ms(100);

	let error = transport
		.execute(&RequestDescriptor::get(
			"reviews",
			server.url("/v1/blocks/7/reviews"),
		))
		.await
		.unwrap_err();

	assert!(matches!(error, TransportError::Timeout { .. }));
}

#[tokio::test]
async fn test_anonymous_transport_sends_no_token() {
	let server = TestServer::spawn().await;
	let transport = HttpTransport::with_cache(None, ClientCache::new()).with_retry(RetryPolicy::none());

	let error = transport
		.execute(&RequestDescriptor::get("info", server.url("/v1/blocks/7")))
		.await
		.unwrap_err();

	assert_eq!(error.status_code(), Some(401));
	assert_eq!(server.login_count(), 0);
}
