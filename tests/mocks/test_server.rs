//! Fake provider for HTTP-level tests
//!
//! Serves a login endpoint that issues numbered bearer tokens and answers
//! every other path from a per-path script of status codes and bodies.

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone)]
struct Route {
	/// Answered in order; the last one repeats
	responses: VecDeque<(u16, Value)>,
	delay: Option<Duration>,
}

#[derive(Default)]
struct ProviderState {
	logins: AtomicUsize,
	login_delay_ms: AtomicU64,
	fail_logins: AtomicBool,
	reject_tokens: AtomicBool,
	require_auth: AtomicBool,
	current_token: Mutex<Option<String>>,
	routes: Mutex<HashMap<String, Route>>,
	fallback: Mutex<Option<(u16, Value)>>,
	hits: Mutex<HashMap<String, usize>>,
}

/// Provider double listening on a random local port
pub struct TestServer {
	pub base_url: String,
	state: Arc<ProviderState>,
	handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl TestServer {
	/// Server that requires a bearer token on every data path
	pub async fn spawn() -> Self {
		let state = Arc::new(ProviderState::default());
		state.require_auth.store(true, Ordering::SeqCst);
		Self::spawn_with_state(state).await
	}

	/// Server that accepts anonymous requests
	pub async fn spawn_open() -> Self {
		Self::spawn_with_state(Arc::new(ProviderState::default())).await
	}

	async fn spawn_with_state(state: Arc<ProviderState>) -> Self {
		let app = Router::new()
			.route(LOGIN_PATH, post(login))
			.fallback(data)
			.with_state(Arc::clone(&state));

		let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
			.await
			.expect("bind test port");
		let addr = listener.local_addr().unwrap();
		let base_url = format!("http://{}:{}", addr.ip(), addr.port());

		let handle = tokio::spawn(async move {
			let _ = axum::serve(listener, app).await;
		});

		// Give server time to start
		tokio::time::sleep(Duration::from_millis(10)).await;

		Self {
			base_url,
			state,
			handle,
		}
	}

	pub fn auth_url(&self) -> String {
		format!("{}{}", self.base_url, LOGIN_PATH)
	}

	pub fn url(&self, path: &str) -> url::Url {
		url::Url::parse(&format!("{}{}", self.base_url, path)).unwrap()
	}

	/// Answer `path` with `status` and `body` on every call
	pub fn route(&self, path: &str, status: u16, body: Value) {
		self.route_sequence(path, vec![(status, body)]);
	}

	/// Answer `path` with each response in turn, repeating the last
	pub fn route_sequence(&self, path: &str, responses: Vec<(u16, Value)>) {
		self.state.routes.lock().unwrap().insert(
			path.to_string(),
			Route {
				responses: responses.into(),
				delay: None,
			},
		);
	}

	pub fn delay(&self, path: &str, delay: Duration) {
		if let Some(route) = self.state.routes.lock().unwrap().get_mut(path) {
			route.delay = Some(delay);
		}
	}

	/// Response for paths without a route; 404 when unset
	pub fn fallback(&self, status: u16, body: Value) {
		*self.state.fallback.lock().unwrap() = Some((status, body));
	}

	/// Make every issued token stale; the next login issues a valid one
	pub fn expire_tokens(&self) {
		*self.state.current_token.lock().unwrap() = None;
	}

	/// Reject every token, including freshly issued ones
	pub fn reject_all_tokens(&self) {
		self.state.reject_tokens.store(true, Ordering::SeqCst);
	}

	pub fn fail_logins(&self) {
		self.state.fail_logins.store(true, Ordering::SeqCst);
	}

	pub fn set_login_delay(&self, delay: Duration) {
		self.state
			.login_delay_ms
			.store(delay.as_millis() as u64, Ordering::SeqCst);
	}

	pub fn login_count(&self) -> usize {
		self.state.logins.load(Ordering::SeqCst)
	}

	/// Requests that reached `path`, including rejected ones
	pub fn hits(&self, path: &str) -> usize {
		self.state
			.hits
			.lock()
			.unwrap()
			.get(path)
			.copied()
			.unwrap_or(0)
	}

	pub fn abort(self) {
		self.handle.abort();
	}
}

impl Drop for TestServer {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

async fn login(State(state): State<Arc<ProviderState>>) -> Response {
	let delay = state.login_delay_ms.load(Ordering::SeqCst);
	if delay > 0 {
		tokio::time::sleep(Duration::from_millis(delay)).await;
	}

	let count = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
	if state.fail_logins.load(Ordering::SeqCst) {
		return (
			StatusCode::UNAUTHORIZED,
			Json(json!({"error": "bad credentials"})),
		)
			.into_response();
	}

	let token = format!("token-{}", count);
	*state.current_token.lock().unwrap() = Some(token.clone());

	Json(json!({"data": {"access_token": token, "expires_in": 3600}})).into_response()
}

async fn data(State(state): State<Arc<ProviderState>>, uri: Uri, headers: HeaderMap) -> Response {
	let path = uri.path().to_string();
	*state.hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

	if state.require_auth.load(Ordering::SeqCst) && !authorized(&state, &headers) {
		return (StatusCode::UNAUTHORIZED, Json(json!({"error": "token expired"}))).into_response();
	}

	let (delay, status, body) = {
		let mut routes = state.routes.lock().unwrap();
		match routes.get_mut(&path) {
			Some(route) => {
				let (status, body) = if route.responses.len() > 1 {
					route.responses.pop_front().unwrap()
				} else {
					route.responses.front().cloned().unwrap()
				};
				(route.delay, status, body)
			},
			None => {
				let (status, body) = state
					.fallback
					.lock()
					.unwrap()
					.clone()
					.unwrap_or((404, json!({"error": "not found"})));
				(None, status, body)
			},
		}
	};

	if let Some(delay) = delay {
		tokio::time::sleep(delay).await;
	}

	(StatusCode::from_u16(status).unwrap(), Json(body)).into_response()
}

fn authorized(state: &ProviderState, headers: &HeaderMap) -> bool {
	if state.reject_tokens.load(Ordering::SeqCst) {
		return false;
	}
	let presented = headers
		.get(AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "));

	match (presented, state.current_token.lock().unwrap().as_deref()) {
		(Some(presented), Some(current)) => presented == current,
		_ => false,
	}
}
