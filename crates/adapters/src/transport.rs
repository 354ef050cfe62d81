//! Authenticated HTTP transport
//!
//! Attaches the shared bearer token, refreshes it once when the provider
//! answers 401 and retries transient failures of idempotent requests with
//! exponential backoff and jitter.

use crate::auth::TokenManager;
use crate::client_cache::{global_client_cache, ClientCache, ClientConfig};
use async_trait::async_trait;
use rand::Rng;
use realty_types::constants::limits::{
	DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE_DELAY_MS,
	DEFAULT_RETRY_MAX_DELAY_MS,
};
use realty_types::{
	AuthError, AuthToken, HttpMethod, RequestDescriptor, Transport, TransportError,
	TransportResult,
};
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry schedule for idempotent requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Attempts including the first one
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl RetryPolicy {
	/// Single attempt, no retries
	pub fn none() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	/// Delay before retry number `attempt` (1-based)
	///
	/// Exponential in `attempt`, capped at `max_delay`, with the upper half
	/// randomized so concurrent callers do not retry in lockstep.
	pub fn backoff(&self, attempt: u32) -> Duration {
		let exponent = attempt.saturating_sub(1).min(16);
		let ceiling = self
			.base_delay
			.saturating_mul(1u32 << exponent)
			.min(self.max_delay);

		let half = ceiling / 2;
		let jitter_ms = half.as_millis() as u64;
		let jitter = if jitter_ms == 0 {
			Duration::ZERO
		} else {
			Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
		};

		half + jitter
	}
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: DEFAULT_RETRY_ATTEMPTS,
			base_delay: Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
			max_delay: Duration::from_millis(DEFAULT_RETRY_MAX_DELAY_MS),
		}
	}
}

/// reqwest-backed [`Transport`] for the provider's REST endpoints
#[derive(Debug, Clone)]
pub struct HttpTransport {
	clients: ClientCache,
	tokens: Option<Arc<TokenManager>>,
	retry: RetryPolicy,
	timeout_ms: u64,
}

impl HttpTransport {
	/// Transport sharing the process-wide client cache
	pub fn new(tokens: Option<Arc<TokenManager>>) -> Self {
		Self::with_cache(tokens, global_client_cache())
	}

	pub fn with_cache(tokens: Option<Arc<TokenManager>>, clients: ClientCache) -> Self {
		Self {
			clients,
			tokens,
			retry: RetryPolicy::default(),
			timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
		}
	}

	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;
		self
	}

	pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	/// One attempt, including the refresh-and-retry-once on 401
	async fn execute_authenticated(&self, request: &RequestDescriptor) -> TransportResult<Value> {
		let Some(tokens) = &self.tokens else {
			return self.send(request, None).await;
		};

		let leased = tokens.current().await.map_err(auth_expired)?;
		match self.send(request, Some(&leased.token)).await {
			Err(error) if error.status_code() == Some(401) => {
				debug!(
					"Provider rejected token for {} ({}), refreshing",
					request.endpoint_key, request.url
				);
				let fresh = tokens.refresh(leased.epoch).await.map_err(auth_expired)?;

				match self.send(request, Some(&fresh.token)).await {
					Err(error) if error.status_code() == Some(401) => {
						warn!(
							"Provider rejected a freshly issued token for {}",
							request.endpoint_key
						);
						Err(TransportError::AuthExpired {
							reason: "token rejected after refresh".to_string(),
						})
					},
					other => other,
				}
			},
			other => other,
		}
	}

	async fn send(
		&self,
		request: &RequestDescriptor,
		token: Option<&AuthToken>,
	) -> TransportResult<Value> {
		let client = self
			.clients
			.get_client(&ClientConfig::for_url(&request.url, self.timeout_ms))?;

		let mut builder = match request.method {
			HttpMethod::Get => client.get(request.url.clone()),
			HttpMethod::Post => client.post(request.url.clone()),
		};
		if !request.query.is_empty() {
			builder = builder.query(&request.query);
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}
		if let Some(token) = token {
			builder = builder.header(AUTHORIZATION, token.bearer());
		}

		let response = builder
			.send()
			.await
			.map_err(|e| TransportError::from_reqwest(e, self.timeout_ms))?;

		let status = response.status();
		if !status.is_success() {
			return Err(TransportError::from_status(status.as_u16()));
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| TransportError::from_reqwest(e, self.timeout_ms))?;
		if body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Value::Null);
		}

		serde_json::from_slice(&body).map_err(|e| TransportError::InvalidResponse {
			reason: format!("{} returned invalid JSON: {}", request.endpoint_key, e),
		})
	}
}

#[async_trait]
impl Transport for HttpTransport {
	async fn execute(&self, request: &RequestDescriptor) -> TransportResult<Value> {
		let max_attempts = if request.is_idempotent() {
			self.retry.max_attempts.max(1)
		} else {
			1
		};

		let mut attempt = 1;
		loop {
			match self.execute_authenticated(request).await {
				Ok(payload) => return Ok(payload),
				Err(error) if error.is_transient() && attempt < max_attempts => {
					let delay = self.retry.backoff(attempt);
					warn!(
						"{} {} failed (attempt {}/{}): {}, retrying in {:?}",
						request.method, request.endpoint_key, attempt, max_attempts, error, delay
					);
					tokio::time::sleep(delay).await;
					attempt += 1;
				},
				Err(error) => return Err(error),
			}
		}
	}
}

fn auth_expired(error: AuthError) -> TransportError {
	TransportError::AuthExpired {
		reason: error.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_backoff_grows_and_is_capped() {
		let policy = RetryPolicy {
			max_attempts: 5,
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_millis(400),
		};

		for _ in 0..50 {
			let first = policy.backoff(1);
			assert!(first >= Duration::from_millis(50) && first <= Duration::from_millis(100));

			let second = policy.backoff(2);
			assert!(second >= Duration::from_millis(100) && second <= Duration::from_millis(200));

			let capped = policy.backoff(10);
			assert!(capped >= Duration::from_millis(200) && capped <= Duration::from_millis(400));
		}
	}

	#[test]
	fn test_no_retry_policy() {
		assert_eq!(RetryPolicy::none().max_attempts, 1);
		assert_eq!(RetryPolicy::default().max_attempts, DEFAULT_RETRY_ATTEMPTS);
	}
}
