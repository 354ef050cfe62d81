//! Configuration settings structures

use crate::configurable_value::ConfigurableValue;
use realty_types::constants::limits::{
	DEFAULT_AGGREGATION_DEADLINE_MS, DEFAULT_DICTIONARY_TTL_SECONDS, DEFAULT_FAN_OUT_CONCURRENCY,
	DEFAULT_MEDIA_TTL_SECONDS, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RETRY_ATTEMPTS,
	DEFAULT_RETRY_BASE_DELAY_MS, DEFAULT_RETRY_MAX_DELAY_MS, MAX_FAN_OUT_CONCURRENCY,
	MAX_REQUEST_TIMEOUT_MS, MAX_RETRY_ATTEMPTS, MIN_REQUEST_TIMEOUT_MS,
};
use realty_types::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Main application settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
	pub provider: ProviderSettings,
	pub timeouts: TimeoutSettings,
	pub retry: RetrySettings,
	pub aggregation: AggregationSettings,
	pub cache: CacheSettings,
	pub logging: LoggingSettings,
}

/// Upstream provider access
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
	/// Login endpoint issuing bearer tokens
	pub auth_url: String,
	/// `None` sends requests without a bearer token
	pub credentials: Option<Credentials>,
	/// City applied to detail requests when the caller gives none
	pub city: Option<String>,
	/// Replacement scheme and host per kind, e.g. for a staging provider
	pub domain_overrides: HashMap<EntityKind, String>,
}

impl Default for ProviderSettings {
	fn default() -> Self {
		Self {
			auth_url: "https://api.realtyhub.io/auth/login".to_string(),
			credentials: None,
			city: None,
			domain_overrides: HashMap::new(),
		}
	}
}

/// Login credentials
///
/// ```json
/// {"type": "phone", "phone": "+70000000000", "password": {"type": "env", "value": "REALTY_PASSWORD"}}
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
	Phone {
		phone: String,
		password: ConfigurableValue,
	},
	ClientCredentials {
		client_id: String,
		client_secret: ConfigurableValue,
	},
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TimeoutSettings {
	/// Per-request timeout of the HTTP transport
	pub request_ms: u64,
}

impl Default for TimeoutSettings {
	fn default() -> Self {
		Self {
			request_ms: DEFAULT_REQUEST_TIMEOUT_MS,
		}
	}
}

/// Retry schedule for idempotent requests
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct RetrySettings {
	/// Attempts including the first
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}

impl Default for RetrySettings {
	fn default() -> Self {
		Self {
			max_attempts: DEFAULT_RETRY_ATTEMPTS,
			base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
			max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
		}
	}
}

/// Detail fan-out limits
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct AggregationSettings {
	pub concurrency: usize,
	pub deadline_ms: u64,
}

impl Default for AggregationSettings {
	fn default() -> Self {
		Self {
			concurrency: DEFAULT_FAN_OUT_CONCURRENCY,
			deadline_ms: DEFAULT_AGGREGATION_DEADLINE_MS,
		}
	}
}

impl AggregationSettings {
	pub fn deadline(&self) -> Duration {
		Duration::from_millis(self.deadline_ms)
	}
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CacheSettings {
	pub dictionary_ttl_secs: u64,
	pub media_ttl_secs: u64,
	/// Expired-entry sweep interval; 0 disables the background sweep
	pub cleanup_interval_secs: u64,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			dictionary_ttl_secs: DEFAULT_DICTIONARY_TTL_SECONDS,
			media_ttl_secs: DEFAULT_MEDIA_TTL_SECONDS,
			cleanup_interval_secs: 60,
		}
	}
}

impl CacheSettings {
	pub fn dictionary_ttl(&self) -> Duration {
		Duration::from_secs(self.dictionary_ttl_secs)
	}

	pub fn media_ttl(&self) -> Duration {
		Duration::from_secs(self.media_ttl_secs)
	}
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
	/// Default filter; `RUST_LOG` takes precedence
	pub level: String,
	pub format: LogFormat,
	pub show_target: bool,
	pub show_thread_ids: bool,
}

impl Default for LoggingSettings {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Compact,
			show_target: false,
			show_thread_ids: false,
		}
	}
}

/// Log format options
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Json,
	Pretty,
	Compact,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
	#[error("{field} must be between {min} and {max}, got {value}")]
	OutOfRange {
		field: &'static str,
		value: u64,
		min: u64,
		max: u64,
	},

	#[error("{field} is not a valid http(s) URL: {value}")]
	InvalidUrl { field: String, value: String },

	#[error("retry.base_delay_ms ({base}) exceeds retry.max_delay_ms ({max})")]
	RetryDelays { base: u64, max: u64 },
}

fn check_range(
	field: &'static str,
	value: u64,
	min: u64,
	max: u64,
) -> Result<(), ConfigValidationError> {
	if (min..=max).contains(&value) {
		Ok(())
	} else {
		Err(ConfigValidationError::OutOfRange {
			field,
			value,
			min,
			max,
		})
	}
}

fn check_url(field: String, value: &str) -> Result<(), ConfigValidationError> {
	match Url::parse(value) {
		Ok(url) if matches!(url.scheme(), "http" | "https") && url.host().is_some() => Ok(()),
		_ => Err(ConfigValidationError::InvalidUrl {
			field,
			value: value.to_string(),
		}),
	}
}

impl Settings {
	/// Reject settings outside the supported limits
	pub fn validate(&self) -> Result<(), ConfigValidationError> {
		check_range(
			"timeouts.request_ms",
			self.timeouts.request_ms,
			MIN_REQUEST_TIMEOUT_MS,
			MAX_REQUEST_TIMEOUT_MS,
		)?;
		check_range(
			"retry.max_attempts",
			u64::from(self.retry.max_attempts),
			1,
			u64::from(MAX_RETRY_ATTEMPTS),
		)?;
		if self.retry.base_delay_ms > self.retry.max_delay_ms {
			return Err(ConfigValidationError::RetryDelays {
				base: self.retry.base_delay_ms,
				max: self.retry.max_delay_ms,
			});
		}
		check_range(
			"aggregation.concurrency",
			self.aggregation.concurrency as u64,
			1,
			MAX_FAN_OUT_CONCURRENCY as u64,
		)?;
		check_range(
			"aggregation.deadline_ms",
			self.aggregation.deadline_ms,
			MIN_REQUEST_TIMEOUT_MS,
			u64::MAX,
		)?;

		check_url("provider.auth_url".to_string(), &self.provider.auth_url)?;
		for (kind, domain) in &self.provider.domain_overrides {
			check_url(format!("provider.domain_overrides.{}", kind), domain)?;
		}
		Ok(())
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.timeouts.request_ms)
	}
}
