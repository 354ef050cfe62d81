//! Offline provider for demos and local development
//!
//! [`DemoTransport`] answers every endpoint key the resolver produces with a
//! small canned payload, so the whole facade runs without network access or
//! credentials.

use async_trait::async_trait;
use realty_types::{RequestDescriptor, Transport, TransportResult};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Canned responses keyed by endpoint key
#[derive(Debug, Default)]
pub struct DemoTransport {
	requests: AtomicUsize,
}

impl DemoTransport {
	pub fn new() -> Self {
		Self::default()
	}

	/// Requests answered so far
	pub fn request_count(&self) -> usize {
		self.requests.load(Ordering::Relaxed)
	}
}

#[async_trait]
impl Transport for DemoTransport {
	async fn execute(&self, request: &RequestDescriptor) -> TransportResult<Value> {
		self.requests.fetch_add(1, Ordering::Relaxed);
		debug!("Demo provider answering {} {}", request.endpoint_key, request.url);

		let key = request.endpoint_key.as_str();
		let payload = match key {
			"info" => demo_entity(&last_segment(request)),
			"catalog" => json!({
				"results": demo_listing(),
				"count": demo_listing().len(),
			}),
			"count" => json!({ "count": demo_listing().len() }),
			"map" => json!(demo_listing()),
			"dictionaries" => json!({ "data": demo_dictionaries() }),
			"progress" => json!({ "periods": ["2023", "2024"] }),
			"plans" | "photos" | "videos" | "documents" => json!([
				format!("https://cdn.demo.realty/{}/1.jpg", key),
				{
					"url": format!("https://cdn.demo.realty/{}/2.jpg", key),
					"title": "Demo",
				},
			]),
			_ => {
				if let Some(name) = key.strip_prefix("dictionary:") {
					let mut dictionaries = demo_dictionaries();
					dictionaries.retain(|dictionary, _| dictionary == name);
					json!({ "data": dictionaries })
				} else if let Some(period) = key.strip_prefix("progress:") {
					json!([format!("https://cdn.demo.realty/progress/{}.jpg", period)])
				} else {
					json!([])
				}
			},
		};

		Ok(payload)
	}
}

fn last_segment(request: &RequestDescriptor) -> String {
	request
		.url
		.path_segments()
		.and_then(|segments| segments.filter(|s| !s.is_empty()).last())
		.unwrap_or("1")
		.to_string()
}

fn demo_entity(id: &str) -> Value {
	json!({
		"id": id,
		"name": format!("Demo object {}", id),
		"address": "1 Embankment St",
		"price": {"min": 4_500_000, "max": 12_000_000},
		"area": {"min": 28.5, "max": 96.0},
		"rooms": 2,
		"floor": 7,
		"coordinates": {"lat": 59.93, "lng": 30.31},
	})
}

fn demo_listing() -> Vec<Value> {
	(1..=3)
		.map(|n| {
			json!({
				"id": n,
				"name": format!("Demo object {}", n),
				"coordinates": [59.9 + f64::from(n) / 100.0, 30.3],
			})
		})
		.collect()
}

fn demo_dictionaries() -> serde_json::Map<String, Value> {
	let mut dictionaries = serde_json::Map::new();
	dictionaries.insert(
		"rooms".to_string(),
		json!({"0": "Studio", "1": "1 bedroom", "2": "2 bedrooms"}),
	);
	dictionaries.insert(
		"finishing".to_string(),
		json!({"rough": "Rough", "turnkey": "Turnkey"}),
	);
	dictionaries
}

#[cfg(test)]
mod tests {
	use super::*;
	use url::Url;

	#[tokio::test]
	async fn test_primary_echoes_identifier() {
		let transport = DemoTransport::new();
		let request = RequestDescriptor::get(
			"info",
			Url::parse("https://demo.realty/api/v1/complexes/42").unwrap(),
		);

		let payload = transport.execute(&request).await.unwrap();
		assert_eq!(payload["id"], "42");
		assert_eq!(transport.request_count(), 1);
	}

	#[tokio::test]
	async fn test_single_dictionary_payload() {
		let transport = DemoTransport::new();
		let request = RequestDescriptor::get(
			"dictionary:rooms",
			Url::parse("https://demo.realty/api/v1/dictionaries/rooms").unwrap(),
		);

		let payload = transport.execute(&request).await.unwrap();
		assert_eq!(payload["data"]["rooms"]["0"], "Studio");
	}
}
