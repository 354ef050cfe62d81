//! Detail aggregation
//!
//! Assembles one entity from its primary endpoint plus every secondary and
//! phased endpoint of its kind. Requests run concurrently under a semaphore
//! ceiling and an overall deadline. A failed primary aborts the whole
//! aggregation; failed secondaries are reported in the result instead.

use crate::mapper::MapperRegistry;
use crate::payload::unwrap_data;
use async_trait::async_trait;
use realty_adapters::{DetailPlan, EndpointResolver};
use realty_types::constants::limits::{DEFAULT_AGGREGATION_DEADLINE_MS, DEFAULT_FAN_OUT_CONCURRENCY};
use realty_types::{
	AggregatorError, AggregatorResult, Bucket, DetailResult, EndpointFailure, EndpointOutcome,
	EntityKind, RequestDescriptor, Transport, TransportError, TypedEntity,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Fan-out limits of one aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationConfig {
	/// Requests in flight at once
	pub concurrency: usize,
	/// Budget for the whole aggregation; unfinished endpoints become timeouts
	pub deadline: Duration,
}

impl Default for AggregationConfig {
	fn default() -> Self {
		Self {
			concurrency: DEFAULT_FAN_OUT_CONCURRENCY,
			deadline: Duration::from_millis(DEFAULT_AGGREGATION_DEADLINE_MS),
		}
	}
}

/// Trait for detail operations
#[async_trait]
pub trait DetailServiceTrait: Send + Sync {
	/// Entity `id` of `kind` with all of its related data and media
	async fn get_detail(
		&self,
		kind: EntityKind,
		id: &str,
		city: Option<&str>,
	) -> AggregatorResult<DetailResult>;
}

/// What a non-primary payload contributes to the result
#[derive(Debug, Clone)]
enum Role {
	Secondary(Bucket),
	/// Coordinating call of `plan.phased[index]`
	Coordinator(usize),
	PhaseTwo { phased: usize, sub_key: String },
}

#[derive(Debug)]
enum Fetched {
	/// Keeps the transport error so a 404 maps to `NotFound`
	Primary {
		key: String,
		result: Result<Value, TransportError>,
	},
	Endpoint {
		key: String,
		role: Role,
		outcome: EndpointOutcome,
	},
}

/// Detail aggregation engine
#[derive(Clone)]
pub struct DetailAggregator {
	resolver: Arc<EndpointResolver>,
	transport: Arc<dyn Transport>,
	mappers: Arc<MapperRegistry>,
	config: AggregationConfig,
}

impl DetailAggregator {
	pub fn new(
		resolver: Arc<EndpointResolver>,
		transport: Arc<dyn Transport>,
		mappers: Arc<MapperRegistry>,
		config: AggregationConfig,
	) -> Self {
		Self {
			resolver,
			transport,
			mappers,
			config,
		}
	}

	pub fn config(&self) -> AggregationConfig {
		self.config
	}

	fn spawn_primary(
		&self,
		tasks: &mut JoinSet<Fetched>,
		semaphore: &Arc<Semaphore>,
		request: RequestDescriptor,
	) {
		self.spawn_fetch(tasks, semaphore, request, |key, result| {
			Fetched::Primary { key, result }
		});
	}

	fn spawn_endpoint(
		&self,
		tasks: &mut JoinSet<Fetched>,
		semaphore: &Arc<Semaphore>,
		role: Role,
		request: RequestDescriptor,
	) {
		self.spawn_fetch(tasks, semaphore, request, move |key, result| {
			Fetched::Endpoint {
				key,
				role,
				outcome: EndpointOutcome::from(result),
			}
		});
	}

	fn spawn_fetch<F>(
		&self,
		tasks: &mut JoinSet<Fetched>,
		semaphore: &Arc<Semaphore>,
		request: RequestDescriptor,
		finish: F,
	) where
		F: FnOnce(String, Result<Value, TransportError>) -> Fetched + Send + 'static,
	{
		let transport = Arc::clone(&self.transport);
		let semaphore = Arc::clone(semaphore);

		tasks.spawn(
			async move {
				let result = match semaphore.acquire_owned().await {
					Ok(_permit) => transport.execute(&request).await,
					Err(_) => Err(TransportError::Connection(
						"aggregation was cancelled".to_string(),
					)),
				};
				finish(request.endpoint_key, result)
			}
			.in_current_span(),
		);
	}

	/// Mapped primary entity; any failure cancels the remaining requests
	fn primary_entity(
		&self,
		tasks: &mut JoinSet<Fetched>,
		plan: &DetailPlan,
		key: &str,
		pending: &BTreeSet<String>,
		result: Result<Value, TransportError>,
	) -> AggregatorResult<TypedEntity> {
		let kind = plan.kind;
		let payload = match result {
			Ok(payload) => payload,
			Err(error) => {
				warn!(
					"Primary endpoint {} of {} '{}' failed: {}, cancelling {} pending requests",
					key,
					kind,
					plan.id,
					error,
					pending.len()
				);
				tasks.abort_all();
				return Err(AggregatorError::from_lookup(kind, &plan.id, error));
			},
		};

		self.mappers.map(kind, &payload).map_err(|e| {
			warn!("Primary payload of {} '{}' is unusable: {}", kind, plan.id, e);
			tasks.abort_all();
			AggregatorError::from(e)
		})
	}

	async fn aggregate(&self, plan: DetailPlan) -> AggregatorResult<DetailResult> {
		let started = Instant::now();
		let kind = plan.kind;
		let deadline = tokio::time::Instant::now() + self.config.deadline;
		let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
		let mut tasks = JoinSet::new();
		let mut pending = BTreeSet::new();

		info!(
			"Fetching {} '{}' from {} endpoints (concurrency {})",
			kind,
			plan.id,
			plan.request_count(),
			self.config.concurrency
		);

		pending.insert(plan.primary.endpoint_key.clone());
		self.spawn_primary(&mut tasks, &semaphore, plan.primary.clone());
		for secondary in &plan.secondary {
			pending.insert(secondary.request.endpoint_key.clone());
			self.spawn_endpoint(
				&mut tasks,
				&semaphore,
				Role::Secondary(secondary.bucket),
				secondary.request.clone(),
			);
		}
		for (index, phased) in plan.phased.iter().enumerate() {
			pending.insert(phased.coordinator.endpoint_key.clone());
			self.spawn_endpoint(
				&mut tasks,
				&semaphore,
				Role::Coordinator(index),
				phased.coordinator.clone(),
			);
		}

		let mut entity = None;
		let mut related = BTreeMap::new();
		let mut media = BTreeMap::new();
		let mut failures = BTreeMap::new();
		let mut merged: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();
		let mut deadline_reached = false;

		loop {
			let joined = match tokio::time::timeout_at(deadline, tasks.join_next()).await {
				Ok(Some(joined)) => joined,
				Ok(None) => break,
				Err(_) => {
					warn!(
						"Aggregation deadline reached after {}ms with {} endpoints pending",
						self.config.deadline.as_millis(),
						pending.len()
					);
					tasks.abort_all();
					deadline_reached = true;
					break;
				},
			};

			let (key, role, outcome) = match joined {
				Ok(Fetched::Endpoint { key, role, outcome }) => (key, role, outcome),
				Ok(Fetched::Primary { key, result }) => {
					pending.remove(&key);
					entity = Some(self.primary_entity(&mut tasks, &plan, &key, &pending, result)?);
					continue;
				},
				Err(e) => {
					warn!("Endpoint task for {} '{}' did not finish: {}", kind, plan.id, e);
					continue;
				},
			};
			pending.remove(&key);

			match (role, outcome) {
				(Role::Secondary(bucket), EndpointOutcome::Success(payload)) => {
					match bucket {
						Bucket::Related => &mut related,
						Bucket::Media => &mut media,
					}
					.insert(key, unwrap_data(payload));
				},
				(Role::Coordinator(index), EndpointOutcome::Success(payload)) => {
					let phased = &plan.phased[index];
					let Some(sub_keys) = sub_keys(&payload, phased.template.sub_keys_at) else {
						warn!(
							"Coordinator {} of {} '{}' has no sub-keys at {}",
							key, kind, plan.id, phased.template.sub_keys_at
						);
						failures.insert(
							key,
							EndpointFailure::InvalidResponse {
								reason: format!("no sub-keys at {}", phased.template.sub_keys_at),
							},
						);
						continue;
					};

					debug!(
						"Coordinator {} of {} '{}' yielded {} sub-keys",
						key,
						kind,
						plan.id,
						sub_keys.len()
					);
					merged.insert(index, Map::new());
					for sub_key in sub_keys {
						match self
							.resolver
							.resolve_phase_two(&plan, &phased.template, &sub_key)
						{
							Ok(request) => {
								pending.insert(request.endpoint_key.clone());
								self.spawn_endpoint(
									&mut tasks,
									&semaphore,
									Role::PhaseTwo {
										phased: index,
										sub_key,
									},
									request,
								);
							},
							Err(e) => {
								failures.insert(
									format!("{}:{}", phased.template.key, sub_key),
									EndpointFailure::InvalidResponse {
										reason: e.to_string(),
									},
								);
							},
						}
					}
				},
				(Role::PhaseTwo { phased, sub_key }, EndpointOutcome::Success(payload)) => {
					if let Some(values) = merged.get_mut(&phased) {
						values.insert(sub_key, unwrap_data(payload));
					}
				},
				(_, EndpointOutcome::Failure(failure)) => {
					warn!("Endpoint {} of {} '{}' failed: {:?}", key, kind, plan.id, failure);
					failures.insert(key, failure);
				},
			}
		}

		let deadline_ms = self.config.deadline.as_millis() as u64;
		let Some(entity) = entity else {
			return Err(if deadline_reached {
				AggregatorError::Upstream(TransportError::Timeout {
					timeout_ms: deadline_ms,
				})
			} else {
				AggregatorError::Upstream(TransportError::Connection(
					"primary request did not complete".to_string(),
				))
			});
		};

		for key in pending {
			let failure = if deadline_reached {
				EndpointFailure::Timeout {
					after_ms: deadline_ms,
				}
			} else {
				EndpointFailure::Transport {
					reason: "request did not complete".to_string(),
				}
			};
			failures.insert(key, failure);
		}

		for (index, values) in merged {
			let template = &plan.phased[index].template;
			match template.bucket {
				Bucket::Related => &mut related,
				Bucket::Media => &mut media,
			}
			.insert(template.key.to_string(), Value::Object(values));
		}

		let mut result = DetailResult::new(entity);
		result.related = related;
		result.media = media;
		result.failures = failures;

		if result.is_complete() {
			info!(
				"Detail aggregation of {} '{}' completed in {}ms",
				kind,
				plan.id,
				started.elapsed().as_millis()
			);
		} else {
			info!(
				"Detail aggregation of {} '{}' completed in {}ms with {} failed endpoints",
				kind,
				plan.id,
				started.elapsed().as_millis(),
				result.failures.len()
			);
		}

		Ok(result)
	}
}

#[async_trait]
impl DetailServiceTrait for DetailAggregator {
	async fn get_detail(
		&self,
		kind: EntityKind,
		id: &str,
		city: Option<&str>,
	) -> AggregatorResult<DetailResult> {
		let plan = self.resolver.resolve_detail_plan(kind, id, city)?;
		let span = info_span!(
			"detail",
			aggregation_id = %Uuid::new_v4(),
			kind = %kind,
			id = %plan.id
		);

		self.aggregate(plan).instrument(span).await
	}
}

/// Distinct sub-keys listed at `pointer`, or a bare array payload
fn sub_keys(payload: &Value, pointer: &str) -> Option<Vec<String>> {
	let payload = match payload {
		Value::Object(object) if object.len() == 1 && object.contains_key("data") => {
			&object["data"]
		},
		other => other,
	};
	let listed = payload
		.pointer(pointer)
		.or_else(|| payload.is_array().then_some(payload))?
		.as_array()?;

	let mut seen = BTreeSet::new();
	Some(
		listed
			.iter()
			.filter_map(|value| match value {
				Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
				Value::Number(n) => Some(n.to_string()),
				_ => None,
			})
			.filter(|key| seen.insert(key.clone()))
			.collect(),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use realty_types::test_utils::{ScriptedFailure, ScriptedTransport};
	use realty_types::ObjectTypeRegistry;
	use serde_json::json;

	fn aggregator(transport: Arc<ScriptedTransport>, config: AggregationConfig) -> DetailAggregator {
		DetailAggregator::new(
			Arc::new(EndpointResolver::new(Arc::new(ObjectTypeRegistry::new()))),
			transport,
			Arc::new(MapperRegistry::new()),
			config,
		)
	}

	fn complex_transport() -> ScriptedTransport {
		ScriptedTransport::new()
			.with_default(json!([]))
			.respond("info", json!({"id": "123", "name": "Riverside"}))
			.respond("progress", json!({"periods": []}))
	}

	#[tokio::test]
	async fn test_secondary_failure_is_reported_not_raised() {
		let transport = Arc::new(
			complex_transport()
				.respond("photos", json!([{"url": "https://cdn/1.jpg"}]))
				.fail("documents", ScriptedFailure::Timeout),
		);
		let result = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap();

		assert_eq!(result.entity.id(), "123");
		assert_eq!(result.entity.name(), Some("Riverside"));
		assert_eq!(result.media("photos"), &json!([{"url": "https://cdn/1.jpg"}]));
		assert!(!result.media.contains_key("documents"));
		assert_eq!(result.media("documents"), &json!([]));
		assert_eq!(
			result.failed_endpoints().into_iter().collect::<Vec<_>>(),
			vec!["documents".to_string()]
		);
		assert!(matches!(
			result.failures["documents"],
			EndpointFailure::Timeout { .. }
		));
		assert!(!result.is_complete());
		assert!(result.partial().is_some());
	}

	#[tokio::test]
	async fn test_complete_aggregation() {
		let transport = Arc::new(complex_transport());
		let result = aggregator(transport.clone(), AggregationConfig::default())
			.get_detail(EntityKind::Complex, "123", Some("msk"))
			.await
			.unwrap();

		assert!(result.is_complete());
		assert!(result.partial().is_none());
		assert_eq!(result.related.len() + result.media.len(), 21);
		assert_eq!(result.media("progress"), &json!({}));
		assert!(transport
			.calls()
			.iter()
			.all(|request| request.param("city") == Some("msk")));
	}

	#[tokio::test]
	async fn test_primary_not_found_wins_over_secondaries() {
		let transport = Arc::new(
			ScriptedTransport::new()
				.with_default(json!([{"ok": true}]))
				.fail("info", ScriptedFailure::Status(404)),
		);
		let err = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::Complex, "404", None)
			.await
			.unwrap_err();

		assert!(matches!(err, AggregatorError::NotFound { ref id, .. } if id == "404"));
	}

	#[tokio::test]
	async fn test_primary_failure_keeps_underlying_kind() {
		let transport = Arc::new(
			ScriptedTransport::new()
				.with_default(json!([]))
				.fail("info", ScriptedFailure::Status(500)),
		);
		let err = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::ParkingSpace, "p1", None)
			.await
			.unwrap_err();
		assert_eq!(err.status_code(), Some(500));

		let transport = Arc::new(
			ScriptedTransport::new()
				.with_default(json!([]))
				.fail("info", ScriptedFailure::AuthExpired),
		);
		let err = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::ParkingSpace, "p1", None)
			.await
			.unwrap_err();
		assert!(matches!(err, AggregatorError::AuthExpired { .. }));
	}

	#[tokio::test]
	async fn test_primary_failure_cancels_slow_secondaries() {
		let transport = Arc::new(
			complex_transport()
				.respond("reviews", json!([]))
				.delay("reviews", Duration::from_secs(30))
				.fail("info", ScriptedFailure::Status(404)),
		);
		let started = Instant::now();
		let err = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::Complex, "1", None)
			.await
			.unwrap_err();

		assert!(matches!(err, AggregatorError::NotFound { .. }));
		assert!(started.elapsed() < Duration::from_secs(5));
	}

	#[tokio::test]
	async fn test_empty_id_is_not_found_without_requests() {
		let transport = Arc::new(ScriptedTransport::new());
		let err = aggregator(transport.clone(), AggregationConfig::default())
			.get_detail(EntityKind::House, "  ", None)
			.await
			.unwrap_err();

		assert!(matches!(err, AggregatorError::NotFound { .. }));
		assert_eq!(transport.total_calls(), 0);
	}

	#[tokio::test]
	async fn test_k_of_m_secondary_failures() {
		let transport = Arc::new(
			complex_transport()
				.fail("banks", ScriptedFailure::Status(502))
				.fail("reviews", ScriptedFailure::Connection("reset".to_string()))
				.fail("plans", ScriptedFailure::Status(403)),
		);
		let result = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap();

		assert_eq!(result.failures.len(), 3);
		assert_eq!(result.related.len() + result.media.len(), 21 - 3);
		assert!(matches!(
			result.failures["plans"],
			EndpointFailure::Status {
				status_code: 403,
				..
			}
		));
		assert!(matches!(
			result.failures["reviews"],
			EndpointFailure::Transport { .. }
		));
	}

	#[tokio::test]
	async fn test_secondary_failures_keep_their_reason() {
		let transport = Arc::new(
			complex_transport()
				.fail("banks", ScriptedFailure::AuthExpired)
				.fail("videos", ScriptedFailure::Status(404))
				.fail("progress:2024", ScriptedFailure::Timeout)
				.respond("progress", json!({"periods": ["2024"]})),
		);
		let result = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap();

		assert_eq!(
			result.failures["banks"],
			EndpointFailure::Auth {
				reason: "token refresh failed".to_string()
			}
		);
		assert!(matches!(
			result.failures["videos"],
			EndpointFailure::Status {
				status_code: 404,
				..
			}
		));
		assert_eq!(
			result.failures["progress:2024"],
			EndpointFailure::Timeout { after_ms: 5000 }
		);
		assert_eq!(result.media("progress"), &json!({}));
		assert_eq!(result.failures.len(), 3);
	}

	#[tokio::test]
	async fn test_two_phase_fan_out_merges_by_sub_key() {
		let transport = Arc::new(
			complex_transport()
				.respond("progress", json!({"periods": [2022, 2023]}))
				.respond("progress:2022", json!([{"url": "https://cdn/2022.jpg"}]))
				.fail("progress:2023", ScriptedFailure::Status(500)),
		);
		let result = aggregator(transport.clone(), AggregationConfig::default())
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap();

		assert_eq!(
			result.media("progress"),
			&json!({"2022": [{"url": "https://cdn/2022.jpg"}]})
		);
		assert!(result.failed_endpoints().contains("progress:2023"));
		assert_eq!(result.failures.len(), 1);
		assert_eq!(transport.call_count("progress:2022"), 1);

		let phase_two = transport
			.calls()
			.into_iter()
			.find(|request| request.endpoint_key == "progress:2022")
			.unwrap();
		assert!(phase_two.url.path().ends_with("blocks/123/progress/2022"));
	}

	#[tokio::test]
	async fn test_failed_coordinator_skips_phase_two() {
		let transport = Arc::new(complex_transport().fail("progress", ScriptedFailure::Status(503)));
		let result = aggregator(transport.clone(), AggregationConfig::default())
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap();

		assert!(!result.media.contains_key("progress"));
		assert!(result.failed_endpoints().contains("progress"));
		assert!(transport
			.calls()
			.iter()
			.all(|request| !request.endpoint_key.starts_with("progress:")));
	}

	#[tokio::test]
	async fn test_deadline_records_pending_endpoints_as_timeouts() {
		let transport = Arc::new(
			complex_transport()
				.respond("documents", json!([]))
				.delay("documents", Duration::from_secs(10)),
		);
		let config = AggregationConfig {
			concurrency: 32,
			deadline: Duration::from_millis(200),
		};
		let result = aggregator(transport, config)
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap();

		assert_eq!(result.failed_endpoints().len(), 1);
		assert_eq!(
			result.failures["documents"],
			EndpointFailure::Timeout { after_ms: 200 }
		);
	}

	#[tokio::test]
	async fn test_deadline_before_primary_is_timeout_error() {
		let transport = Arc::new(
			complex_transport()
				.respond("info", json!({"id": "123"}))
				.delay("info", Duration::from_secs(10)),
		);
		let config = AggregationConfig {
			concurrency: 6,
			deadline: Duration::from_millis(100),
		};
		let err = aggregator(transport, config)
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap_err();

		assert!(matches!(
			err,
			AggregatorError::Upstream(TransportError::Timeout { timeout_ms: 100 })
		));
		assert!(err.is_retriable());
	}

	#[tokio::test]
	async fn test_fan_out_respects_concurrency_ceiling() {
		let mut scripted = complex_transport();
		for key in ["buildings", "advantages", "banks", "photos", "videos", "reviews"] {
			scripted = scripted
				.respond(key, json!([]))
				.delay(key, Duration::from_millis(40));
		}
		let transport = Arc::new(scripted);
		let config = AggregationConfig {
			concurrency: 3,
			..Default::default()
		};

		let result = aggregator(transport.clone(), config)
			.get_detail(EntityKind::Complex, "123", None)
			.await
			.unwrap();

		assert!(result.is_complete());
		assert!(transport.max_in_flight() <= 3);
		assert_eq!(transport.total_calls(), 22);
	}

	#[tokio::test]
	async fn test_empty_primary_payload_is_validation_error() {
		let transport = Arc::new(
			ScriptedTransport::new()
				.with_default(json!([]))
				.respond("info", json!({})),
		);
		let err = aggregator(transport, AggregationConfig::default())
			.get_detail(EntityKind::Unit, "9", None)
			.await
			.unwrap_err();
		assert!(matches!(err, AggregatorError::Validation(_)));
	}

	#[test]
	fn test_sub_keys_extraction() {
		assert_eq!(
			sub_keys(&json!({"periods": [2022, "2023", 2022, null]}), "/periods"),
			Some(vec!["2022".to_string(), "2023".to_string()])
		);
		assert_eq!(
			sub_keys(&json!({"data": {"periods": ["q1"]}}), "/periods"),
			Some(vec!["q1".to_string()])
		);
		assert_eq!(sub_keys(&json!(["a"]), "/periods"), Some(vec!["a".to_string()]));
		assert_eq!(sub_keys(&json!({"other": 1}), "/periods"), None);
	}
}
