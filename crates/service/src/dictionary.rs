//! Dictionary lookups
//!
//! Dictionaries map filter values to display labels (`rooms`, `finishing`,
//! `wall_material`, ...). They change rarely, so both single dictionaries and
//! the full set of a kind are held in short-TTL caches.

use crate::payload::unwrap_data;
use async_trait::async_trait;
use realty_adapters::EndpointResolver;
use realty_storage::TtlCache;
use realty_types::constants::limits::DEFAULT_DICTIONARY_TTL_SECONDS;
use realty_types::{
	AggregatorError, AggregatorResult, Dictionary, DictionarySet, DictionaryShape, EntityKind,
	Transport, TransportError,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Trait for dictionary operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DictionaryServiceTrait: Send + Sync {
	/// One named dictionary of `kind`
	async fn get_dictionary(&self, kind: EntityKind, key: &str) -> AggregatorResult<Dictionary>;

	/// Every dictionary of `kind`
	async fn get_all_dictionaries(&self, kind: EntityKind) -> AggregatorResult<DictionarySet>;
}

#[derive(Clone)]
pub struct DictionaryService {
	resolver: Arc<EndpointResolver>,
	transport: Arc<dyn Transport>,
	single: TtlCache<(EntityKind, String), Dictionary>,
	all: TtlCache<EntityKind, DictionarySet>,
}

impl DictionaryService {
	pub fn new(resolver: Arc<EndpointResolver>, transport: Arc<dyn Transport>) -> Self {
		Self::with_ttl(
			resolver,
			transport,
			Duration::from_secs(DEFAULT_DICTIONARY_TTL_SECONDS),
		)
	}

	pub fn with_ttl(
		resolver: Arc<EndpointResolver>,
		transport: Arc<dyn Transport>,
		ttl: Duration,
	) -> Self {
		Self {
			resolver,
			transport,
			single: TtlCache::new("dictionary", ttl),
			all: TtlCache::new("dictionaries", ttl),
		}
	}

	/// Drop expired entries of both caches
	pub fn cleanup_expired(&self) -> usize {
		self.single.cleanup_expired() + self.all.cleanup_expired()
	}

	fn shape(&self, kind: EntityKind) -> DictionaryShape {
		self.resolver.registry().config_for(kind).dictionary_shape
	}

	async fn fetch_one(&self, kind: EntityKind, key: &str) -> AggregatorResult<Dictionary> {
		let request = self.resolver.resolve_dictionary(kind, key)?;
		let payload = self
			.transport
			.execute(&request)
			.await
			.map_err(|e| AggregatorError::from_lookup(kind, key, e))?;

		let dictionary = parse_dictionary(self.shape(kind), key, payload)?;
		info!("Loaded {} dictionary '{}' ({} entries)", kind, key, dictionary.len());
		Ok(dictionary)
	}

	async fn fetch_all(&self, kind: EntityKind) -> AggregatorResult<DictionarySet> {
		let request = self.resolver.resolve_all_dictionaries(kind)?;
		let payload = self.transport.execute(&request).await?;

		let set = parse_dictionary_set(self.shape(kind), payload)?;
		info!("Loaded {} dictionaries for {}", set.len(), kind);
		Ok(set)
	}
}

#[async_trait]
impl DictionaryServiceTrait for DictionaryService {
	async fn get_dictionary(&self, kind: EntityKind, key: &str) -> AggregatorResult<Dictionary> {
		let key = key.trim();
		if let Some(dictionary) = self
			.all
			.get(&kind)
			.and_then(|set| set.get(key).cloned())
		{
			debug!("{} dictionary '{}' served from the full set", kind, key);
			return Ok(dictionary);
		}

		self.single
			.get_or_try_insert_with((kind, key.to_string()), || self.fetch_one(kind, key))
			.await
	}

	async fn get_all_dictionaries(&self, kind: EntityKind) -> AggregatorResult<DictionarySet> {
		self.all
			.get_or_try_insert_with(kind, || self.fetch_all(kind))
			.await
	}
}

fn invalid(reason: String) -> AggregatorError {
	AggregatorError::Upstream(TransportError::InvalidResponse { reason })
}

/// Dictionary body inside the envelope `shape` prescribes
///
/// `DataWrapped` payloads must carry a `data` member; the other shapes accept
/// the body bare or wrapped. An empty response is an empty body for every shape.
fn dictionary_body(shape: DictionaryShape, payload: Value) -> AggregatorResult<Value> {
	match (shape, payload) {
		(_, Value::Null) => Ok(Value::Null),
		(DictionaryShape::DataWrapped, Value::Object(mut object)) => object
			.remove("data")
			.ok_or_else(|| invalid("dictionary payload has no 'data' envelope".to_string())),
		(DictionaryShape::DataWrapped, other) => Err(invalid(format!(
			"expected a 'data' envelope, got {}",
			other
		))),
		(_, payload) => Ok(unwrap_data(payload)),
	}
}

/// Entries of the dictionary `key` from its endpoint's payload
fn parse_dictionary(
	shape: DictionaryShape,
	key: &str,
	payload: Value,
) -> AggregatorResult<Dictionary> {
	match dictionary_body(shape, payload)? {
		Value::Array(entries) => Ok(parse_entries(shape, &entries)),
		Value::Object(mut object) => match object.remove(key) {
			Some(Value::Array(entries)) => Ok(parse_entries(shape, &entries)),
			Some(Value::Object(labels)) => Ok(parse_label_map(&labels)),
			Some(other) => Err(invalid(format!(
				"dictionary '{}' is not a list: {}",
				key, other
			))),
			None => {
				if object.values().all(|v| v.is_string() || v.is_number()) {
					Ok(parse_label_map(&object))
				} else {
					Err(invalid(format!("payload has no dictionary '{}'", key)))
				}
			},
		},
		Value::Null => Ok(Dictionary::new()),
		other => Err(invalid(format!("unexpected dictionary payload: {}", other))),
	}
}

/// Every dictionary in a full-set payload; non-list members are skipped
fn parse_dictionary_set(shape: DictionaryShape, payload: Value) -> AggregatorResult<DictionarySet> {
	let object = match dictionary_body(shape, payload)? {
		Value::Object(object) => object,
		Value::Null => return Ok(DictionarySet::new()),
		other => {
			return Err(invalid(format!(
				"expected an object of dictionaries, got {}",
				other
			)))
		},
	};

	Ok(object
		.into_iter()
		.filter_map(|(name, entries)| match entries {
			Value::Array(entries) => Some((name, parse_entries(shape, &entries))),
			Value::Object(labels) => Some((name, parse_label_map(&labels))),
			_ => None,
		})
		.collect())
}

fn parse_entries(shape: DictionaryShape, entries: &[Value]) -> Dictionary {
	entries
		.iter()
		.filter_map(|entry| match (shape, entry) {
			(DictionaryShape::PairLists, Value::Array(pair)) if pair.len() >= 2 => {
				Some((scalar(&pair[0])?, scalar(&pair[1])?))
			},
			(DictionaryShape::Keyed | DictionaryShape::DataWrapped, Value::Object(fields)) => {
				let id = ["id", "_id", "value", "key", "slug"]
					.iter()
					.find_map(|k| fields.get(*k).and_then(scalar))?;
				let label = ["name", "title", "label", "text"]
					.iter()
					.find_map(|k| fields.get(*k).and_then(scalar))
					.unwrap_or_else(|| id.clone());
				Some((id, label))
			},
			(_, Value::String(s)) if !s.trim().is_empty() => Some((s.clone(), s.clone())),
			_ => {
				debug!("Skipping dictionary entry not matching {:?}: {}", shape, entry);
				None
			},
		})
		.collect()
}

fn parse_label_map(labels: &Map<String, Value>) -> Dictionary {
	labels
		.iter()
		.filter_map(|(id, label)| Some((id.clone(), scalar(label)?)))
		.collect()
}

fn scalar(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use realty_types::test_utils::{ScriptedFailure, ScriptedTransport};
	use realty_types::ObjectTypeRegistry;
	use serde_json::json;

	fn service(transport: Arc<ScriptedTransport>) -> DictionaryService {
		DictionaryService::new(
			Arc::new(EndpointResolver::new(Arc::new(ObjectTypeRegistry::new()))),
			transport,
		)
	}

	#[test]
	fn test_keyed_shape() {
		let dictionary = parse_dictionary(
			DictionaryShape::Keyed,
			"rooms",
			json!({"rooms": [{"id": 0, "name": "Studio"}, {"id": 1, "name": "1 bedroom"}]}),
		)
		.unwrap();
		assert_eq!(dictionary.get("0").map(String::as_str), Some("Studio"));
		assert_eq!(dictionary.len(), 2);
	}

	#[test]
	fn test_data_wrapped_shape() {
		let set = parse_dictionary_set(
			DictionaryShape::DataWrapped,
			json!({"data": {
				"finishing": [{"_id": "a", "title": "Turnkey"}, {"_id": "b"}],
				"version": 3
			}}),
		)
		.unwrap();
		assert_eq!(set.len(), 1);
		assert_eq!(set["finishing"]["a"], "Turnkey");
		assert_eq!(set["finishing"]["b"], "b");
	}

	#[test]
	fn test_data_wrapped_shape_requires_envelope() {
		let bare = json!({"finishing": [{"_id": "a", "title": "Turnkey"}]});
		assert!(parse_dictionary_set(DictionaryShape::DataWrapped, bare.clone()).is_err());
		assert!(parse_dictionary(DictionaryShape::DataWrapped, "finishing", bare.clone()).is_err());
		assert!(parse_dictionary(DictionaryShape::DataWrapped, "x", json!([["a", "A"]])).is_err());

		// Keyed accepts the same body bare
		let keyed = parse_dictionary(DictionaryShape::Keyed, "finishing", bare).unwrap();
		assert_eq!(keyed["a"], "Turnkey");

		let wrapped = parse_dictionary(
			DictionaryShape::DataWrapped,
			"finishing",
			json!({"data": [{"_id": "b", "title": "Rough"}]}),
		)
		.unwrap();
		assert_eq!(wrapped["b"], "Rough");

		assert!(parse_dictionary(DictionaryShape::DataWrapped, "x", Value::Null)
			.unwrap()
			.is_empty());
	}

	#[tokio::test]
	async fn test_unwrapped_payload_for_data_wrapped_kind_is_rejected() {
		let transport = Arc::new(ScriptedTransport::new().respond(
			"dictionaries",
			json!({"finishing": [{"_id": "a", "title": "Turnkey"}]}),
		));
		let service = service(transport.clone());

		let err = service
			.get_all_dictionaries(EntityKind::ParkingSpace)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			AggregatorError::Upstream(TransportError::InvalidResponse { .. })
		));

		// Not cached: a second call goes upstream again
		assert!(service.get_all_dictionaries(EntityKind::ParkingSpace).await.is_err());
		assert_eq!(transport.call_count("dictionaries"), 2);
	}

	#[test]
	fn test_pair_lists_shape() {
		let dictionary = parse_dictionary(
			DictionaryShape::PairLists,
			"wall_material",
			json!({"wall_material": [[1, "Brick"], [2, "Timber"], [3]]}),
		)
		.unwrap();
		assert_eq!(dictionary.len(), 2);
		assert_eq!(dictionary["2"], "Timber");
	}

	#[test]
	fn test_label_map_and_bare_list() {
		let labels = parse_dictionary(
			DictionaryShape::Keyed,
			"district",
			json!({"1": "Central", "2": "Northern"}),
		)
		.unwrap();
		assert_eq!(labels["1"], "Central");

		let bare = parse_dictionary(DictionaryShape::Keyed, "x", json!(["a", "b"])).unwrap();
		assert_eq!(bare.len(), 2);

		assert!(parse_dictionary(DictionaryShape::Keyed, "x", json!({"y": [1]})).is_err());
	}

	#[tokio::test]
	async fn test_concurrent_misses_fetch_once() {
		let transport = Arc::new(
			ScriptedTransport::new()
				.respond(
					"dictionary:rooms",
					json!({"rooms": [{"id": 1, "name": "One"}]}),
				)
				.delay("dictionary:rooms", Duration::from_millis(30)),
		);
		let service = service(transport.clone());

		let lookups = (0..8).map(|_| service.get_dictionary(EntityKind::Complex, "rooms"));
		let results = futures::future::join_all(lookups).await;

		assert!(results.iter().all(|r| r.as_ref().map(|d| d.len()).ok() == Some(1)));
		assert_eq!(transport.call_count("dictionary:rooms"), 1);
	}

	#[tokio::test]
	async fn test_single_lookup_served_from_full_set() {
		let transport = Arc::new(ScriptedTransport::new().respond(
			"dictionaries",
			json!({"wall_material": [[1, "Brick"]], "heating": [["gas", "Gas"]]}),
		));
		let service = service(transport.clone());

		let set = service.get_all_dictionaries(EntityKind::House).await.unwrap();
		assert_eq!(set.len(), 2);

		let heating = service.get_dictionary(EntityKind::House, "heating").await.unwrap();
		assert_eq!(heating["gas"], "Gas");
		assert_eq!(transport.total_calls(), 1);

		service.get_all_dictionaries(EntityKind::House).await.unwrap();
		assert_eq!(transport.total_calls(), 1);
	}

	#[tokio::test]
	async fn test_missing_dictionary_is_not_found_and_not_cached() {
		let transport = Arc::new(
			ScriptedTransport::new().fail("dictionary:nope", ScriptedFailure::Status(404)),
		);
		let service = service(transport.clone());

		for _ in 0..2 {
			let err = service
				.get_dictionary(EntityKind::Unit, "nope")
				.await
				.unwrap_err();
			assert!(matches!(err, AggregatorError::NotFound { .. }));
		}
		assert_eq!(transport.call_count("dictionary:nope"), 2);
	}

	#[tokio::test]
	async fn test_expired_dictionary_is_refetched() {
		let transport = Arc::new(
			ScriptedTransport::new().respond("dictionary:rooms", json!([{"id": 1, "name": "One"}])),
		);
		let service = DictionaryService::with_ttl(
			Arc::new(EndpointResolver::new(Arc::new(ObjectTypeRegistry::new()))),
			transport.clone(),
			Duration::from_millis(20),
		);

		service.get_dictionary(EntityKind::CommercialUnit, "rooms").await.unwrap();
		tokio::time::sleep(Duration::from_millis(40)).await;
		service.get_dictionary(EntityKind::CommercialUnit, "rooms").await.unwrap();
		assert_eq!(transport.call_count("dictionary:rooms"), 2);
	}
}
