//! Provider payload envelopes
//!
//! Listings arrive as a bare array or wrapped as
//! `{results|items|data|list: [...], count|total: n}`, sometimes nested one
//! level deeper under `data`. Single objects may be wrapped as `{data: {..}}`.

use realty_types::TransportError;
use serde_json::{Map, Value};

const LIST_KEYS: [&str; 5] = ["results", "items", "data", "list", "objects"];
const TOTAL_KEYS: [&str; 4] = ["count", "total", "total_count", "totalCount"];
const META_KEYS: [&str; 3] = ["meta", "pagination", "paging"];

/// Items of one listing page and the total the provider reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
	pub items: Vec<Value>,
	pub total: Option<u64>,
}

/// Strip a `{data: {...}}` envelope around a single object
pub fn unwrap_entity(payload: &Value) -> &Value {
	match payload.as_object() {
		Some(object) if object.len() == 1 => match object.get("data") {
			Some(inner @ Value::Object(_)) => inner,
			_ => payload,
		},
		_ => payload,
	}
}

/// Strip a `{data: ...}` envelope of any shape
pub fn unwrap_data(payload: Value) -> Value {
	match payload {
		Value::Object(mut object) if object.len() == 1 && object.contains_key("data") => {
			object.remove("data").unwrap_or(Value::Null)
		},
		other => other,
	}
}

/// Extract the listing from a catalog or map payload
pub fn listing(payload: Value) -> Result<Listing, TransportError> {
	match payload {
		Value::Array(items) => Ok(Listing { items, total: None }),
		Value::Object(mut object) => {
			let total = total_of(&object);

			for key in LIST_KEYS {
				match object.remove(key) {
					Some(Value::Array(items)) => return Ok(Listing { items, total }),
					Some(nested @ Value::Object(_)) => {
						let mut inner = listing(nested)?;
						inner.total = inner.total.or(total);
						return Ok(inner);
					},
					_ => {},
				}
			}

			Err(TransportError::InvalidResponse {
				reason: "listing payload has no item array".to_string(),
			})
		},
		Value::Null => Ok(Listing::default()),
		other => Err(TransportError::InvalidResponse {
			reason: format!("expected a listing, got {}", type_name(&other)),
		}),
	}
}

/// Extract a result count from a count payload
pub fn count(payload: &Value) -> Result<u64, TransportError> {
	let invalid = |reason: String| TransportError::InvalidResponse { reason };

	match payload {
		Value::Number(n) => n
			.as_u64()
			.or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
			.ok_or_else(|| invalid(format!("count must be a non-negative integer, got {}", n))),
		Value::String(s) => s
			.trim()
			.parse::<u64>()
			.map_err(|_| invalid(format!("count is not a non-negative integer: {:?}", s))),
		Value::Object(object) => {
			if let Some(data) = object.get("data") {
				return count(data);
			}
			TOTAL_KEYS
				.iter()
				.find_map(|key| object.get(*key))
				.ok_or_else(|| invalid("count payload has no count field".to_string()))
				.and_then(count)
		},
		other => Err(invalid(format!("expected a count, got {}", type_name(other)))),
	}
}

fn total_of(object: &Map<String, Value>) -> Option<u64> {
	TOTAL_KEYS
		.iter()
		.find_map(|key| object.get(*key))
		.or_else(|| {
			META_KEYS
				.iter()
				.filter_map(|meta| object.get(*meta).and_then(Value::as_object))
				.find_map(|meta| TOTAL_KEYS.iter().find_map(|key| meta.get(*key)))
		})
		.and_then(|value| count(value).ok())
}

fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_listing_shapes() {
		let bare = listing(json!([{"id": 1}, {"id": 2}])).unwrap();
		assert_eq!(bare.items.len(), 2);
		assert_eq!(bare.total, None);

		let results = listing(json!({"results": [{"id": 1}], "count": 41})).unwrap();
		assert_eq!(results.items.len(), 1);
		assert_eq!(results.total, Some(41));

		let nested = listing(json!({"data": {"items": [{"id": 1}], "total": "7"}})).unwrap();
		assert_eq!(nested.items.len(), 1);
		assert_eq!(nested.total, Some(7));

		let meta = listing(json!({"data": [], "meta": {"total": 3}})).unwrap();
		assert!(meta.items.is_empty());
		assert_eq!(meta.total, Some(3));

		assert_eq!(listing(Value::Null).unwrap(), Listing::default());
	}

	#[test]
	fn test_listing_without_items_is_invalid() {
		let err = listing(json!({"status": "ok"})).unwrap_err();
		assert!(matches!(err, TransportError::InvalidResponse { .. }));
		assert!(listing(json!("nope")).is_err());
	}

	#[test]
	fn test_count_shapes() {
		assert_eq!(count(&json!(12)).unwrap(), 12);
		assert_eq!(count(&json!("12")).unwrap(), 12);
		assert_eq!(count(&json!({"count": 5})).unwrap(), 5);
		assert_eq!(count(&json!({"data": {"total": 9}})).unwrap(), 9);
		assert!(count(&json!(-1)).is_err());
		assert!(count(&json!({"foo": 1})).is_err());
	}

	#[test]
	fn test_unwrap_entity() {
		let wrapped = json!({"data": {"id": 1}});
		assert_eq!(unwrap_entity(&wrapped), &json!({"id": 1}));

		let plain = json!({"id": 1, "data": {"x": 1}});
		assert_eq!(unwrap_entity(&plain), &plain);

		assert_eq!(unwrap_data(json!({"data": [1, 2]})), json!([1, 2]));
	}
}
