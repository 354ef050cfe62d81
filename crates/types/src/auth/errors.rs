//! Authentication error types

use thiserror::Error;

/// Failures of the provider login exchange
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
	#[error("Login rejected with HTTP {status_code}")]
	Rejected { status_code: u16 },

	#[error("Invalid credentials")]
	InvalidCredentials,

	#[error("Invalid login response: {0}")]
	InvalidResponse(String),

	#[error("Auth service unavailable: {0}")]
	ServiceUnavailable(String),

	#[error("Configuration error: {0}")]
	ConfigurationError(String),
}

impl AuthError {
	/// Map a non-success login status to an error
	pub fn from_status(status_code: u16) -> Self {
		match status_code {
			401 | 403 => AuthError::InvalidCredentials,
			code if code >= 500 => {
				AuthError::ServiceUnavailable(format!("login endpoint returned HTTP {}", code))
			},
			code => AuthError::Rejected { status_code: code },
		}
	}
}
