//! Error types for outbound provider calls

use thiserror::Error;

/// Failure of a single outbound call, after the transport's own retries
#[derive(Error, Debug)]
pub enum TransportError {
	#[error("Timeout occurred after {timeout_ms}ms")]
	Timeout { timeout_ms: u64 },

	#[error("Connection error: {0}")]
	Connection(String),

	#[error("HTTP {status_code}: {reason}")]
	Status { status_code: u16, reason: String },

	#[error("Authentication expired: {reason}")]
	AuthExpired { reason: String },

	#[error("Invalid response format: {reason}")]
	InvalidResponse { reason: String },

	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),
}

impl TransportError {
	/// HTTP status code, if the provider answered
	pub fn status_code(&self) -> Option<u16> {
		match self {
			TransportError::Status { status_code, .. } => Some(*status_code),
			TransportError::Http(reqwest_error) => reqwest_error.status().map(|s| s.as_u16()),
			_ => None,
		}
	}

	/// Timeouts, connection failures and 5xx responses may succeed on retry
	pub fn is_transient(&self) -> bool {
		match self {
			TransportError::Timeout { .. } | TransportError::Connection(_) => true,
			TransportError::Status { status_code, .. } => *status_code >= 500,
			TransportError::Http(e) => {
				e.is_timeout()
					|| e.is_connect()
					|| e.status().map(|s| s.is_server_error()).unwrap_or(false)
			},
			TransportError::AuthExpired { .. } | TransportError::InvalidResponse { .. } => false,
		}
	}

	/// Provider reported that the addressed resource does not exist
	pub fn is_not_found(&self) -> bool {
		self.status_code() == Some(404)
	}

	/// Classify a reqwest failure into the transport taxonomy
	pub fn from_reqwest(error: reqwest::Error, timeout_ms: u64) -> Self {
		if error.is_timeout() {
			TransportError::Timeout { timeout_ms }
		} else if error.is_connect() {
			TransportError::Connection(error.to_string())
		} else if error.is_decode() {
			TransportError::InvalidResponse {
				reason: error.to_string(),
			}
		} else {
			TransportError::Http(error)
		}
	}

	/// Create a status error with the canonical reason phrase
	pub fn from_status(status_code: u16) -> Self {
		let reason = match status_code {
			400 => "Bad Request".to_string(),
			401 => "Unauthorized".to_string(),
			403 => "Forbidden".to_string(),
			404 => "Not Found".to_string(),
			408 => "Request Timeout".to_string(),
			429 => "Too Many Requests".to_string(),
			500 => "Internal Server Error".to_string(),
			502 => "Bad Gateway".to_string(),
			503 => "Service Unavailable".to_string(),
			504 => "Gateway Timeout".to_string(),
			_ => format!("HTTP Error {}", status_code),
		};

		TransportError::Status {
			status_code,
			reason,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transient_classification() {
		assert!(TransportError::Timeout { timeout_ms: 10 }.is_transient());
		assert!(TransportError::Connection("refused".into()).is_transient());
		assert!(TransportError::from_status(503).is_transient());
		assert!(!TransportError::from_status(404).is_transient());
		assert!(!TransportError::from_status(429).is_transient());
		assert!(!TransportError::AuthExpired {
			reason: "expired".into()
		}
		.is_transient());
	}

	#[test]
	fn test_status_extraction_and_not_found() {
		let error = TransportError::from_status(404);
		assert_eq!(error.status_code(), Some(404));
		assert!(error.is_not_found());
		assert!(error.to_string().contains("Not Found"));

		let error = TransportError::InvalidResponse {
			reason: "not json".into(),
		};
		assert_eq!(error.status_code(), None);
		assert!(!error.is_not_found());
	}
}
