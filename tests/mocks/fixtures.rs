//! Provider payloads and settings shared by the integration tests

use realty_aggregator::Settings;
use realty_config::{ConfigurableValue, Credentials};
use serde_json::{json, Value};

/// Complex primary payload in the provider's `{data: {...}}` envelope
#[allow(dead_code)]
pub fn complex_payload(id: u64) -> Value {
	json!({
		"data": {
			"id": id,
			"name": "Villa Marina",
			"address": "12 Harbour Rd",
			"price": {"min": 5_200_000, "max": 18_000_000},
			"coordinates": {"lat": 59.95, "lng": 30.3},
		}
	})
}

/// Catalog page with `count` items and a provider-side total
#[allow(dead_code)]
pub fn listing_payload(count: usize, total: u64) -> Value {
	let items: Vec<Value> = (1..=count)
		.map(|n| json!({"id": n, "name": format!("Complex {}", n), "lat": 59.9, "lng": 30.3}))
		.collect();
	json!({"results": items, "count": total})
}

/// Settings with fast retries and no background sweeps
#[allow(dead_code)]
pub fn test_settings() -> Settings {
	let mut settings = Settings::default();
	settings.retry.max_attempts = 1;
	settings.retry.base_delay_ms = 10;
	settings.retry.max_delay_ms = 20;
	settings.timeouts.request_ms = 2_000;
	settings.aggregation.deadline_ms = 3_000;
	settings.cache.cleanup_interval_secs = 0;
	settings
}

/// Settings pointing every kind and the login at `base_url`
#[allow(dead_code)]
pub fn provider_settings(base_url: &str) -> Settings {
	let mut settings = test_settings();
	settings.provider.auth_url = format!("{}/auth/login", base_url);
	settings.provider.credentials = Some(Credentials::Phone {
		phone: "+70000000000".to_string(),
		password: ConfigurableValue::from_plain("secret"),
	});
	for kind in realty_aggregator::EntityKind::ALL {
		settings
			.provider
			.domain_overrides
			.insert(kind, base_url.to_string());
	}
	settings
}
