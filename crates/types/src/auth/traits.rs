//! Provider credential types and the login trait

use super::AuthResult;
use crate::SecretString;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Bearer credential issued by the provider's login exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
	value: SecretString,
	expires_at: DateTime<Utc>,
}

impl AuthToken {
	pub fn new(value: SecretString, expires_at: DateTime<Utc>) -> Self {
		Self { value, expires_at }
	}

	/// Token valid for `ttl` from now
	pub fn valid_for(value: SecretString, ttl: Duration) -> Self {
		Self::new(value, Utc::now() + ttl)
	}

	pub fn value(&self) -> &SecretString {
		&self.value
	}

	pub fn expires_at(&self) -> DateTime<Utc> {
		self.expires_at
	}

	/// True when the token expires within `skew` from now
	pub fn expires_within(&self, skew: Duration) -> bool {
		Utc::now() + skew >= self.expires_at
	}

	/// `Authorization` header value
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.value.expose_secret())
	}
}

/// Performs the provider login exchange
///
/// Implementations must not cache: every call issues one login request.
/// Caching and refresh coordination belong to the token manager.
#[async_trait]
pub trait Authenticator: Send + Sync {
	async fn login(&self) -> AuthResult<AuthToken>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_expiry_skew() {
		let token = AuthToken::valid_for(SecretString::from("t"), Duration::seconds(30));
		assert!(token.expires_within(Duration::seconds(60)));
		assert!(!token.expires_within(Duration::seconds(5)));
	}

	#[test]
	fn test_bearer_header_and_redacted_debug() {
		let token = AuthToken::valid_for(SecretString::from("abc"), Duration::hours(1));
		assert_eq!(token.bearer(), "Bearer abc");
		assert!(!format!("{:?}", token).contains("abc"));
	}
}
