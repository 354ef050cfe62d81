//! Detail aggregation results
//!
//! Partial success is a data shape here: a [`DetailResult`] always carries
//! the assembled entity together with the per-endpoint failures, and
//! [`DetailResult::partial`] exposes them as a [`PartialAggregation`] value.

use crate::{EntityKind, TransportError, TypedEntity};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Stand-in returned for secondary keys without a payload
static EMPTY_COLLECTION: Value = Value::Array(Vec::new());

/// Why one fanned-out endpoint produced no payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointFailure {
	/// Request timeout or the aggregation deadline elapsed
	Timeout { after_ms: u64 },
	/// Connection or protocol failure
	Transport { reason: String },
	/// Provider answered with an error status
	Status { status_code: u16, reason: String },
	/// Credential could not be refreshed
	Auth { reason: String },
	/// Body could not be decoded
	InvalidResponse { reason: String },
}

impl From<&TransportError> for EndpointFailure {
	fn from(error: &TransportError) -> Self {
		match error {
			TransportError::Timeout { timeout_ms } => EndpointFailure::Timeout {
				after_ms: *timeout_ms,
			},
			TransportError::Status {
				status_code,
				reason,
			} => EndpointFailure::Status {
				status_code: *status_code,
				reason: reason.clone(),
			},
			TransportError::AuthExpired { reason } => EndpointFailure::Auth {
				reason: reason.clone(),
			},
			TransportError::InvalidResponse { reason } => EndpointFailure::InvalidResponse {
				reason: reason.clone(),
			},
			TransportError::Connection(reason) => EndpointFailure::Transport {
				reason: reason.clone(),
			},
			TransportError::Http(e) => match e.status() {
				Some(status) => EndpointFailure::Status {
					status_code: status.as_u16(),
					reason: e.to_string(),
				},
				None => EndpointFailure::Transport {
					reason: e.to_string(),
				},
			},
		}
	}
}

/// Result of one fanned-out request: a payload or a failure, never both
#[derive(Debug, Clone, PartialEq)]
pub enum EndpointOutcome {
	Success(Value),
	Failure(EndpointFailure),
}

impl EndpointOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, EndpointOutcome::Success(_))
	}
}

impl From<Result<Value, TransportError>> for EndpointOutcome {
	fn from(result: Result<Value, TransportError>) -> Self {
		match result {
			Ok(payload) => EndpointOutcome::Success(payload),
			Err(error) => EndpointOutcome::Failure(EndpointFailure::from(&error)),
		}
	}
}

/// Successful payloads and failed keys of an incomplete aggregation
///
/// Lets a caller decide between serving the partial data and re-fetching
/// only the missing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialAggregation {
	pub successful: BTreeMap<String, Value>,
	pub failed_endpoints: BTreeSet<String>,
}

/// One entity assembled from its primary and secondary endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailResult {
	pub kind: EntityKind,
	pub entity: TypedEntity,
	/// Related-data payloads by endpoint key; failed keys are absent
	pub related: BTreeMap<String, Value>,
	/// Media payloads by endpoint key; failed keys are absent
	pub media: BTreeMap<String, Value>,
	/// Failure reason for every secondary or second-wave key that failed
	pub failures: BTreeMap<String, EndpointFailure>,
}

impl DetailResult {
	pub fn new(entity: TypedEntity) -> Self {
		Self {
			kind: entity.kind(),
			entity,
			related: BTreeMap::new(),
			media: BTreeMap::new(),
			failures: BTreeMap::new(),
		}
	}

	/// True exactly when no endpoint failed
	pub fn is_complete(&self) -> bool {
		self.failures.is_empty()
	}

	/// Keys of the endpoints that contributed nothing
	pub fn failed_endpoints(&self) -> BTreeSet<String> {
		self.failures.keys().cloned().collect()
	}

	/// Related payload for `key`, or an empty collection when it is missing
	pub fn related(&self, key: &str) -> &Value {
		self.related.get(key).unwrap_or(&EMPTY_COLLECTION)
	}

	/// Media payload for `key`, or an empty collection when it is missing
	pub fn media(&self, key: &str) -> &Value {
		self.media.get(key).unwrap_or(&EMPTY_COLLECTION)
	}

	/// Partial-aggregation view, present only when something failed
	pub fn partial(&self) -> Option<PartialAggregation> {
		if self.is_complete() {
			return None;
		}

		let successful = self
			.related
			.iter()
			.chain(self.media.iter())
			.map(|(key, payload)| (key.clone(), payload.clone()))
			.collect();

		Some(PartialAggregation {
			successful,
			failed_endpoints: self.failed_endpoints(),
		})
	}
}
