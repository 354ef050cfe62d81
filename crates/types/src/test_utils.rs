//! Test utilities shared across the workspace
//!
//! [`ScriptedTransport`] answers requests from a table keyed by endpoint key,
//! so aggregation and catalog behaviour can be exercised without a network.

use crate::{RequestDescriptor, Transport, TransportError, TransportResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Failure a scripted endpoint reproduces on every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
	Status(u16),
	Timeout,
	Connection(String),
	AuthExpired,
}

impl ScriptedFailure {
	fn to_error(&self) -> TransportError {
		match self {
			ScriptedFailure::Status(code) => TransportError::from_status(*code),
			ScriptedFailure::Timeout => TransportError::Timeout { timeout_ms: 5000 },
			ScriptedFailure::Connection(reason) => TransportError::Connection(reason.clone()),
			ScriptedFailure::AuthExpired => TransportError::AuthExpired {
				reason: "token refresh failed".to_string(),
			},
		}
	}
}

#[derive(Debug, Clone)]
struct Script {
	outcome: Result<Value, ScriptedFailure>,
	delay: Option<Duration>,
}

/// Transport double answering from a per-endpoint-key script
///
/// Unscripted keys answer with the default payload when one is set and with
/// a 404 otherwise.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
	scripts: HashMap<String, Script>,
	default_response: Option<Value>,
	calls: Mutex<Vec<RequestDescriptor>>,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Answer `endpoint_key` with `payload`
	pub fn respond(mut self, endpoint_key: &str, payload: Value) -> Self {
		self.scripts.insert(
			endpoint_key.to_string(),
			Script {
				outcome: Ok(payload),
				delay: None,
			},
		);
		self
	}

	/// Fail every call to `endpoint_key`
	pub fn fail(mut self, endpoint_key: &str, failure: ScriptedFailure) -> Self {
		self.scripts.insert(
			endpoint_key.to_string(),
			Script {
				outcome: Err(failure),
				delay: None,
			},
		);
		self
	}

	/// Delay the answer of an already scripted key
	pub fn delay(mut self, endpoint_key: &str, delay: Duration) -> Self {
		self.scripts
			.entry(endpoint_key.to_string())
			.or_insert_with(|| Script {
				outcome: Err(ScriptedFailure::Status(404)),
				delay: None,
			})
			.delay = Some(delay);
		self
	}

	/// Payload for keys without a script
	pub fn with_default(mut self, payload: Value) -> Self {
		self.default_response = Some(payload);
		self
	}

	/// Every request received so far, in arrival order
	pub fn calls(&self) -> Vec<RequestDescriptor> {
		self.calls
			.lock()
			.map(|calls| calls.clone())
			.unwrap_or_default()
	}

	/// Number of calls received for `endpoint_key`
	pub fn call_count(&self, endpoint_key: &str) -> usize {
		self.calls()
			.iter()
			.filter(|request| request.endpoint_key == endpoint_key)
			.count()
	}

	pub fn total_calls(&self) -> usize {
		self.calls().len()
	}

	/// Highest number of requests that were in flight at once
	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}
}

/// Releases one in-flight slot when the call finishes or is aborted
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

#[async_trait]
impl Transport for ScriptedTransport {
	async fn execute(&self, request: &RequestDescriptor) -> TransportResult<Value> {
		if let Ok(mut calls) = self.calls.lock() {
			calls.push(request.clone());
		}

		let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
		self.max_in_flight.fetch_max(current, Ordering::SeqCst);
		let _in_flight = InFlight(&self.in_flight);

		let script = self.scripts.get(&request.endpoint_key).cloned();
		if let Some(delay) = script.as_ref().and_then(|s| s.delay) {
			tokio::time::sleep(delay).await;
		}

		match script {
			Some(Script {
				outcome: Ok(payload),
				..
			}) => Ok(payload),
			Some(Script {
				outcome: Err(failure),
				..
			}) => Err(failure.to_error()),
			None => match &self.default_response {
				Some(payload) => Ok(payload.clone()),
				None => Err(TransportError::from_status(404)),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	fn request(key: &str) -> RequestDescriptor {
		RequestDescriptor::get(key, url::Url::parse("https://provider.test/x").unwrap())
	}

	#[tokio::test]
	async fn test_aborted_call_releases_in_flight_slot() {
		let transport = Arc::new(
			ScriptedTransport::new()
				.respond("slow", Value::Null)
				.delay("slow", Duration::from_secs(30))
				.respond("fast", Value::Null),
		);

		let slow = {
			let transport = Arc::clone(&transport);
			tokio::spawn(async move { transport.execute(&request("slow")).await })
		};
		while transport.total_calls() == 0 {
			tokio::task::yield_now().await;
		}
		slow.abort();
		assert!(slow.await.unwrap_err().is_cancelled());

		transport.execute(&request("fast")).await.unwrap();
		transport.execute(&request("fast")).await.unwrap();
		assert_eq!(transport.in_flight.load(Ordering::SeqCst), 0);
		assert_eq!(transport.max_in_flight(), 1);
	}
}
