//! HTTP client cache for connection reuse across provider origins
//!
//! The provider spreads its kinds over several hosts; each origin gets one
//! pooled client with keep-alive, recreated after a TTL so DNS changes are
//! eventually picked up. Auth headers are attached per request, never baked
//! into a cached client, because the bearer token rotates.

use dashmap::DashMap;
use realty_types::{TransportError, TransportResult};
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("realty-aggregator/", env!("CARGO_PKG_VERSION"));

/// Settings of one pooled client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientConfig {
	/// Scheme, host and port of the provider origin
	pub origin: String,
	/// Per-request timeout
	pub timeout_ms: u64,
	/// Maximum number of idle connections per host
	pub max_idle_per_host: usize,
	/// Connection keep-alive timeout
	pub keep_alive_timeout_ms: u64,
	/// Headers sent with every request
	pub headers: Vec<(String, String)>,
}

impl ClientConfig {
	/// Client settings for the origin of `url`
	pub fn for_url(url: &Url, timeout_ms: u64) -> Self {
		Self {
			origin: url.origin().ascii_serialization(),
			timeout_ms,
			max_idle_per_host: 10,
			keep_alive_timeout_ms: 90_000,
			headers: vec![
				("User-Agent".to_string(), USER_AGENT.to_string()),
				("Accept".to_string(), "application/json".to_string()),
			],
		}
	}
}

/// Cached client with creation timestamp for TTL management
#[derive(Debug, Clone)]
struct CachedClient {
	client: Arc<Client>,
	created_at: Instant,
}

impl CachedClient {
	fn new(client: Client) -> Self {
		Self {
			client: Arc::new(client),
			created_at: Instant::now(),
		}
	}

	fn is_expired(&self, ttl: Duration) -> bool {
		self.created_at.elapsed() > ttl
	}
}

/// Thread-safe cache of HTTP clients keyed by origin settings, with TTL
#[derive(Clone, Debug)]
pub struct ClientCache {
	clients: Arc<DashMap<ClientConfig, CachedClient>>,
	ttl: Duration,
}

impl ClientCache {
	/// Create a new client cache with default 30-minute TTL
	pub fn new() -> Self {
		Self::with_ttl(Duration::from_secs(30 * 60))
	}

	pub fn with_ttl(ttl: Duration) -> Self {
		Self {
			clients: Arc::new(DashMap::new()),
			ttl,
		}
	}

	/// Get or create the pooled client for `config`
	pub fn get_client(&self, config: &ClientConfig) -> TransportResult<Arc<Client>> {
		self.clients.remove_if(config, |_, cached_client| {
			let is_expired = cached_client.is_expired(self.ttl);
			if is_expired {
				warn!(
					"Client cache expired for {} (age: {:?}), will create new client",
					config.origin,
					cached_client.created_at.elapsed()
				);
			}
			is_expired
		});

		if let Some(cached_client) = self.clients.get(config) {
			debug!(
				"Reusing cached client for {} (age: {:?})",
				config.origin,
				cached_client.created_at.elapsed()
			);
			return Ok(cached_client.client.clone());
		}

		debug!("Creating new client for {}", config.origin);
		let cached_client = CachedClient::new(Self::build_client(config)?);

		use dashmap::mapref::entry::Entry;

		match self.clients.entry(config.clone()) {
			Entry::Occupied(entry) => {
				// Lost the race; keep the first client so pools are shared
				debug!(
					"Another task created client for {}, using existing",
					config.origin
				);
				Ok(entry.get().client.clone())
			},
			Entry::Vacant(entry) => {
				let client = cached_client.client.clone();
				entry.insert(cached_client);
				Ok(client)
			},
		}
	}

	fn build_client(config: &ClientConfig) -> TransportResult<Client> {
		let mut header_map = reqwest::header::HeaderMap::new();
		for (key, value) in &config.headers {
			if let (Ok(header_name), Ok(header_value)) = (
				reqwest::header::HeaderName::from_bytes(key.as_bytes()),
				reqwest::header::HeaderValue::from_str(value),
			) {
				header_map.insert(header_name, header_value);
			}
		}

		ClientBuilder::new()
			.timeout(Duration::from_millis(config.timeout_ms))
			.pool_max_idle_per_host(config.max_idle_per_host)
			.pool_idle_timeout(Duration::from_millis(config.keep_alive_timeout_ms))
			.tcp_keepalive(Duration::from_secs(60))
			.default_headers(header_map)
			.build()
			.map_err(TransportError::Http)
	}

	/// Remove all expired clients
	pub fn cleanup_expired(&self) -> usize {
		let before = self.clients.len();
		self.clients
			.retain(|_, cached_client| !cached_client.is_expired(self.ttl));
		let removed_count = before.saturating_sub(self.clients.len());

		if removed_count > 0 {
			debug!("Cleaned up {} expired clients from cache", removed_count);
		}

		removed_count
	}

	pub fn len(&self) -> usize {
		self.clients.len()
	}

	pub fn is_empty(&self) -> bool {
		self.clients.is_empty()
	}
}

impl Default for ClientCache {
	fn default() -> Self {
		Self::new()
	}
}

lazy_static::lazy_static! {
	static ref GLOBAL_CLIENT_CACHE: ClientCache = ClientCache::new();
}

/// Process-wide client cache shared by every transport that does not bring its own
pub fn global_client_cache() -> ClientCache {
	GLOBAL_CLIENT_CACHE.clone()
}
