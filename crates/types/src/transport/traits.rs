//! Core transport trait

use super::TransportResult;
use crate::RequestDescriptor;
use async_trait::async_trait;
use serde_json::Value;

/// Executes resolved requests against the provider
///
/// Implementations own authentication and retry policy; callers see either a
/// decoded JSON payload or the failure that remained after those were
/// exhausted. Catalog and aggregation services only ever talk to this trait,
/// so tests substitute scripted implementations.
#[async_trait]
pub trait Transport: Send + Sync {
	/// Execute one request and decode its JSON body
	async fn execute(&self, request: &RequestDescriptor) -> TransportResult<Value>;
}
