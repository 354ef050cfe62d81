//! Error taxonomy exposed to callers of the catalog, detail, dictionary and media paths

use crate::{EntityKind, TransportError};
use thiserror::Error;

/// Normalization failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
	#[error("Empty payload for {kind}")]
	EmptyPayload { kind: EntityKind },

	#[error("Payload for {kind} is not a JSON object")]
	NotAnObject { kind: EntityKind },

	#[error("Missing identifier in {kind} payload")]
	MissingIdentifier { kind: EntityKind },

	#[error("No mapper registered for {kind}")]
	Unsupported { kind: EntityKind },
}

/// Errors returned by the public operations
#[derive(Error, Debug)]
pub enum AggregatorError {
	#[error("{kind} '{id}' not found")]
	NotFound { kind: EntityKind, id: String },

	#[error("Invalid filter '{key}' for {kind}: {reason}")]
	InvalidFilter {
		kind: EntityKind,
		key: String,
		reason: String,
	},

	#[error("Authentication expired: {reason}")]
	AuthExpired { reason: String },

	#[error("Upstream failure: {0}")]
	Upstream(TransportError),

	#[error("Validation failed: {0}")]
	Validation(#[from] MappingError),

	#[error("{kind} has no {operation} endpoint")]
	Unsupported {
		kind: EntityKind,
		operation: &'static str,
	},

	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl From<TransportError> for AggregatorError {
	fn from(error: TransportError) -> Self {
		match error {
			TransportError::AuthExpired { reason } => AggregatorError::AuthExpired { reason },
			other => AggregatorError::Upstream(other),
		}
	}
}

impl AggregatorError {
	/// Map a failed lookup of a single resource, turning 404 into `NotFound`
	pub fn from_lookup(kind: EntityKind, id: &str, error: TransportError) -> Self {
		if error.is_not_found() {
			AggregatorError::NotFound {
				kind,
				id: id.to_string(),
			}
		} else {
			AggregatorError::from(error)
		}
	}

	pub fn invalid_filter(kind: EntityKind, key: &str, reason: impl Into<String>) -> Self {
		AggregatorError::InvalidFilter {
			kind,
			key: key.to_string(),
			reason: reason.into(),
		}
	}

	/// Whether repeating the same call later may succeed
	///
	/// Transient upstream failures already exhausted the transport's retries,
	/// but remain worth retrying at a coarser granularity.
	pub fn is_retriable(&self) -> bool {
		match self {
			AggregatorError::Upstream(error) => error.is_transient(),
			AggregatorError::NotFound { .. }
			| AggregatorError::InvalidFilter { .. }
			| AggregatorError::AuthExpired { .. }
			| AggregatorError::Validation(_)
			| AggregatorError::Unsupported { .. }
			| AggregatorError::Configuration(_) => false,
		}
	}

	/// Upstream HTTP status, when the failure carries one
	pub fn status_code(&self) -> Option<u16> {
		match self {
			AggregatorError::Upstream(error) => error.status_code(),
			_ => None,
		}
	}
}

/// Result type for the public operations
pub type AggregatorResult<T> = Result<T, AggregatorError>;
