//! Provider login and shared token state
//!
//! [`LoginAuthenticator`] performs the login exchange. [`TokenManager`] owns
//! the process-wide [`AuthToken`] and makes refresh single-flight: every
//! caller that saw the same stale token waits on one login and then shares
//! its outcome, success or failure.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use realty_types::constants::limits::{DEFAULT_TOKEN_TTL_SECONDS, TOKEN_REFRESH_SKEW_SECONDS};
use realty_types::{AuthError, AuthResult, AuthToken, Authenticator, SecretString};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

/// Credentials accepted by the provider's login endpoint
#[derive(Debug, Clone)]
pub enum LoginCredentials {
	Phone {
		phone: String,
		password: SecretString,
	},
	ClientCredentials {
		client_id: String,
		client_secret: SecretString,
	},
}

impl LoginCredentials {
	fn body(&self) -> Value {
		match self {
			LoginCredentials::Phone { phone, password } => json!({
				"phone": phone,
				"password": password.expose_secret(),
			}),
			LoginCredentials::ClientCredentials {
				client_id,
				client_secret,
			} => json!({
				"grant_type": "client_credentials",
				"client_id": client_id,
				"client_secret": client_secret.expose_secret(),
			}),
		}
	}

	fn principal(&self) -> &str {
		match self {
			LoginCredentials::Phone { phone, .. } => phone,
			LoginCredentials::ClientCredentials { client_id, .. } => client_id,
		}
	}
}

/// Login response; the token may be wrapped in `{"data": {...}}`
#[derive(Debug, Deserialize)]
struct LoginResponse {
	#[serde(alias = "token", alias = "accessToken")]
	access_token: SecretString,
	/// Lifetime in seconds
	expires_in: Option<i64>,
	/// Expiry as a Unix timestamp
	expires_at: Option<i64>,
}

impl LoginResponse {
	fn into_token(self) -> AuthResult<AuthToken> {
		if self.access_token.is_empty() {
			return Err(AuthError::InvalidResponse(
				"login response carries an empty token".to_string(),
			));
		}

		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(timestamp), _) if timestamp > 0 => DateTime::<Utc>::from_timestamp(timestamp, 0)
				.ok_or_else(|| {
					AuthError::InvalidResponse(format!("Invalid expires_at timestamp: {}", timestamp))
				})?,
			(_, Some(seconds)) if seconds > 0 => Utc::now() + Duration::seconds(seconds),
			_ => Utc::now() + Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
		};

		Ok(AuthToken::new(self.access_token, expires_at))
	}
}

/// Logs in against the provider's auth endpoint
#[derive(Debug, Clone)]
pub struct LoginAuthenticator {
	auth_url: Url,
	credentials: LoginCredentials,
	client: Client,
}

impl LoginAuthenticator {
	pub fn new(auth_url: Url, credentials: LoginCredentials, timeout_ms: u64) -> AuthResult<Self> {
		// Separate client so login never shares pooled state with data calls
		let client = Client::builder()
			.timeout(std::time::Duration::from_millis(timeout_ms))
			.build()
			.map_err(|e| AuthError::ConfigurationError(e.to_string()))?;

		Ok(Self {
			auth_url,
			credentials,
			client,
		})
	}
}

#[async_trait]
impl Authenticator for LoginAuthenticator {
	async fn login(&self) -> AuthResult<AuthToken> {
		debug!(
			"Logging in at {} as {}",
			self.auth_url,
			self.credentials.principal()
		);

		let response = self
			.client
			.post(self.auth_url.clone())
			.json(&self.credentials.body())
			.send()
			.await
			.map_err(|e| AuthError::ServiceUnavailable(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			return Err(AuthError::from_status(status.as_u16()));
		}

		let mut body: Value = response
			.json()
			.await
			.map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
		if let Some(inner) = body.get_mut("data").filter(|d| d.is_object()).map(Value::take) {
			body = inner;
		}

		let login: LoginResponse = serde_json::from_value(body)
			.map_err(|e| AuthError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;
		let token = login.into_token()?;

		info!(
			"Registered provider token for {} (expires: {})",
			self.credentials.principal(),
			token.expires_at()
		);

		Ok(token)
	}
}

#[derive(Debug, Default)]
struct TokenState {
	token: Option<AuthToken>,
	/// Bumped by every completed refresh, successful or not
	epoch: u64,
	last_error: Option<AuthError>,
}

/// Token handed to a caller, tagged with the refresh epoch it belongs to
#[derive(Debug, Clone)]
pub struct LeasedToken {
	pub token: AuthToken,
	pub epoch: u64,
}

/// Shared credential with single-flight refresh
pub struct TokenManager {
	authenticator: Arc<dyn Authenticator>,
	state: RwLock<TokenState>,
	refresh_gate: Mutex<()>,
	skew: Duration,
}

impl std::fmt::Debug for TokenManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TokenManager")
			.field("skew", &self.skew)
			.finish_non_exhaustive()
	}
}

impl TokenManager {
	pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
		Self {
			authenticator,
			state: RwLock::new(TokenState::default()),
			refresh_gate: Mutex::new(()),
			skew: Duration::seconds(TOKEN_REFRESH_SKEW_SECONDS),
		}
	}

	/// Start from an already issued token
	pub fn with_token(authenticator: Arc<dyn Authenticator>, token: AuthToken) -> Self {
		Self {
			state: RwLock::new(TokenState {
				token: Some(token),
				..Default::default()
			}),
			..Self::new(authenticator)
		}
	}

	pub fn with_skew(mut self, skew: Duration) -> Self {
		self.skew = skew;
		self
	}

	/// Current token, logging in first when there is none or it is about to expire
	pub async fn current(&self) -> AuthResult<LeasedToken> {
		let epoch = {
			let state = self.state.read().await;
			match &state.token {
				Some(token) if !token.expires_within(self.skew) => {
					return Ok(LeasedToken {
						token: token.clone(),
						epoch: state.epoch,
					});
				},
				_ => state.epoch,
			}
		};

		debug!("Provider token missing or expiring, refreshing");
		self.refresh(epoch).await
	}

	/// Replace the token issued at `stale_epoch`
	///
	/// When another caller already completed a refresh past `stale_epoch`,
	/// its outcome is returned without a new login.
	pub async fn refresh(&self, stale_epoch: u64) -> AuthResult<LeasedToken> {
		let _gate = self.refresh_gate.lock().await;

		{
			let state = self.state.read().await;
			if state.epoch != stale_epoch {
				debug!(
					"Token refresh already completed by another caller (epoch {} -> {})",
					stale_epoch, state.epoch
				);
				match (&state.last_error, &state.token) {
					(Some(error), _) => return Err(error.clone()),
					(None, Some(token)) => {
						return Ok(LeasedToken {
							token: token.clone(),
							epoch: state.epoch,
						})
					},
					// Nothing to share; log in below
					(None, None) => {},
				}
			}
		}

		let outcome = self.authenticator.login().await;

		let mut state = self.state.write().await;
		state.epoch += 1;
		match outcome {
			Ok(token) => {
				state.token = Some(token.clone());
				state.last_error = None;
				Ok(LeasedToken {
					token,
					epoch: state.epoch,
				})
			},
			Err(error) => {
				warn!("Provider token refresh failed: {}", error);
				state.token = None;
				state.last_error = Some(error.clone());
				Err(error)
			},
		}
	}
}
