//! Realty Aggregator
//!
//! Catalog, detail, dictionary and media views over a real-estate provider
//! that publishes eight entity kinds across many small REST endpoints.
//! [`AggregatorBuilder`] wires the routing table, login, transport, caches
//! and services together; [`RealtyAggregator`] exposes the public operations.

use realty_adapters::{
	EndpointResolver, HttpTransport, LoginAuthenticator, LoginCredentials, RetryPolicy,
	TokenManager,
};
use realty_config::{ConfigLoadError, ConfigurableValueError, Credentials, LogFormat};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

pub use realty_types::{
	AggregatorError, AggregatorResult, AreaRange, Bucket, CatalogResult, CommercialUnit, Complex,
	DetailResult, Dictionary, DictionarySet, EndpointFailure, EntityKind, GeoPoint, House,
	HouseProject, MapPoint, MappingError, MediaCategory, MediaCollection, MediaItem,
	ObjectTypeRegistry, Pagination, ParkingSpace, PartialAggregation, Plot, PriceRange,
	RequestDescriptor, Settlement, Transport, TransportError, TransportResult, TypedEntity, Unit,
};

pub use realty_adapters::Filters;

pub use realty_service::{
	AggregationConfig, CatalogService, CatalogServiceTrait, DetailAggregator, DetailServiceTrait,
	DictionaryService, DictionaryServiceTrait, EntityMapper, MapperRegistry, MediaService,
	MediaServiceTrait,
};

pub use realty_config::{
	load_config, log_service_info, log_service_shutdown, log_startup_complete, LoggingSettings,
	Settings,
};

pub mod mocks;

// Re-export external dependencies for convenience
pub use async_trait;
pub use serde_json;

/// Errors raised while assembling a [`RealtyAggregator`]
#[derive(Debug, Error)]
pub enum BuildError {
	#[error(transparent)]
	Config(#[from] ConfigLoadError),

	#[error("Invalid provider credentials: {0}")]
	Credentials(#[from] ConfigurableValueError),

	#[error("Invalid auth URL '{url}': {reason}")]
	AuthUrl { url: String, reason: String },

	#[error("Failed to set up provider login: {0}")]
	Auth(#[from] realty_types::AuthError),

	#[error("Failed to initialize logging: {0}")]
	Logging(String),
}

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Fails when a
/// subscriber is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), BuildError> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.level));

	let result = match settings.format {
		LogFormat::Json => tracing_subscriber::fmt()
			.json()
			.with_env_filter(env_filter)
			.with_target(settings.show_target)
			.with_thread_ids(settings.show_thread_ids)
			.try_init(),
		LogFormat::Pretty => tracing_subscriber::fmt()
			.pretty()
			.with_env_filter(env_filter)
			.with_target(settings.show_target)
			.with_thread_ids(settings.show_thread_ids)
			.try_init(),
		LogFormat::Compact => tracing_subscriber::fmt()
			.compact()
			.with_env_filter(env_filter)
			.with_target(settings.show_target)
			.with_thread_ids(settings.show_thread_ids)
			.try_init(),
	};
	result.map_err(|e| BuildError::Logging(e.to_string()))?;

	info!(
		"Logging configuration applied: level={}, format={:?}",
		settings.level, settings.format
	);
	Ok(())
}

/// Builder for [`RealtyAggregator`]
///
/// ```no_run
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// use realty_aggregator::{AggregatorBuilder, EntityKind, Filters};
///
/// let aggregator = AggregatorBuilder::from_config()?.build()?;
/// let page = aggregator
/// 	.get_catalog(EntityKind::Complex, &Filters::new(), 1, 20)
/// 	.await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct AggregatorBuilder {
	settings: Settings,
	transport: Option<Arc<dyn Transport>>,
	mappers: Vec<Arc<dyn EntityMapper>>,
}

impl AggregatorBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builder seeded with settings from the config file and environment
	pub fn from_config() -> Result<Self, BuildError> {
		Ok(Self::new().with_settings(load_config()?))
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = settings;
		self
	}

	/// Use `transport` instead of the authenticated HTTP transport
	pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Replace the built-in mapper of every kind `mapper` supports
	pub fn with_mapper(mut self, mapper: Arc<dyn EntityMapper>) -> Self {
		self.mappers.push(mapper);
		self
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	/// Install logging, print the startup banner and build
	pub fn start(self) -> Result<RealtyAggregator, BuildError> {
		init_tracing(&self.settings.logging)?;
		log_service_info(&self.settings);
		self.build()
	}

	/// Assemble the aggregator
	///
	/// Cache sweeps are spawned when a Tokio runtime is running.
	pub fn build(self) -> Result<RealtyAggregator, BuildError> {
		let settings = self.settings;
		settings
			.validate()
			.map_err(|e| BuildError::Config(ConfigLoadError::Validation(e)))?;

		let registry = Arc::new(ObjectTypeRegistry::with_domain_overrides(
			&settings.provider.domain_overrides,
		));
		let resolver = Arc::new(EndpointResolver::new(Arc::clone(&registry)));

		let transport = match self.transport {
			Some(transport) => transport,
			None => http_transport(&settings)?,
		};

		let mut mappers = MapperRegistry::new();
		for mapper in self.mappers {
			mappers.register(mapper);
		}
		let mappers = Arc::new(mappers);

		let dictionaries = Arc::new(DictionaryService::with_ttl(
			Arc::clone(&resolver),
			Arc::clone(&transport),
			settings.cache.dictionary_ttl(),
		));
		let media = Arc::new(MediaService::with_ttl(
			Arc::clone(&resolver),
			Arc::clone(&transport),
			settings.cache.media_ttl(),
		));
		let catalog = Arc::new(CatalogService::new(
			Arc::clone(&resolver),
			Arc::clone(&transport),
			Arc::clone(&mappers),
		));
		let detail = Arc::new(DetailAggregator::new(
			resolver,
			transport,
			mappers,
			AggregationConfig {
				concurrency: settings.aggregation.concurrency,
				deadline: settings.aggregation.deadline(),
			},
		));

		let cleanup = spawn_cache_cleanup(
			settings.cache.cleanup_interval_secs,
			Arc::clone(&dictionaries),
			Arc::clone(&media),
		);

		let kinds = registry.kinds().count();
		log_startup_complete(kinds);

		Ok(RealtyAggregator {
			catalog,
			detail,
			dictionaries,
			media,
			registry,
			default_city: settings.provider.city,
			cleanup,
		})
	}
}

fn http_transport(settings: &Settings) -> Result<Arc<dyn Transport>, BuildError> {
	let tokens = match &settings.provider.credentials {
		Some(credentials) => {
			let auth_url =
				Url::parse(&settings.provider.auth_url).map_err(|e| BuildError::AuthUrl {
					url: settings.provider.auth_url.clone(),
					reason: e.to_string(),
				})?;
			let authenticator = LoginAuthenticator::new(
				auth_url,
				login_credentials(credentials)?,
				settings.timeouts.request_ms,
			)?;
			Some(Arc::new(TokenManager::new(Arc::new(authenticator))))
		},
		None => None,
	};

	let retry = RetryPolicy {
		max_attempts: settings.retry.max_attempts,
		base_delay: Duration::from_millis(settings.retry.base_delay_ms),
		max_delay: Duration::from_millis(settings.retry.max_delay_ms),
	};

	Ok(Arc::new(
		HttpTransport::new(tokens)
			.with_retry(retry)
			.with_timeout_ms(settings.timeouts.request_ms),
	))
}

fn login_credentials(credentials: &Credentials) -> Result<LoginCredentials, BuildError> {
	Ok(match credentials {
		Credentials::Phone { phone, password } => LoginCredentials::Phone {
			phone: phone.clone(),
			password: password.resolve_secret()?,
		},
		Credentials::ClientCredentials {
			client_id,
			client_secret,
		} => LoginCredentials::ClientCredentials {
			client_id: client_id.clone(),
			client_secret: client_secret.resolve_secret()?,
		},
	})
}

fn spawn_cache_cleanup(
	interval_secs: u64,
	dictionaries: Arc<DictionaryService>,
	media: Arc<MediaService>,
) -> Option<JoinHandle<()>> {
	if interval_secs == 0 {
		return None;
	}
	let Ok(handle) = tokio::runtime::Handle::try_current() else {
		debug!("No Tokio runtime running, cache sweeps disabled");
		return None;
	};

	Some(handle.spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
		// First tick completes immediately
		interval.tick().await;
		loop {
			interval.tick().await;
			let removed = dictionaries.cleanup_expired()
				+ media.cleanup_expired()
				+ realty_adapters::global_client_cache().cleanup_expired();
			if removed > 0 {
				debug!("Removed {} expired cache entries", removed);
			}
		}
	}))
}

/// Public entry point of the aggregator
pub struct RealtyAggregator {
	catalog: Arc<dyn CatalogServiceTrait>,
	detail: Arc<dyn DetailServiceTrait>,
	dictionaries: Arc<dyn DictionaryServiceTrait>,
	media: Arc<dyn MediaServiceTrait>,
	registry: Arc<ObjectTypeRegistry>,
	default_city: Option<String>,
	cleanup: Option<JoinHandle<()>>,
}

impl RealtyAggregator {
	pub fn builder() -> AggregatorBuilder {
		AggregatorBuilder::new()
	}

	/// Routing table in use, including domain overrides
	pub fn registry(&self) -> &ObjectTypeRegistry {
		&self.registry
	}

	/// One page of `kind`'s catalog
	pub async fn get_catalog(
		&self,
		kind: EntityKind,
		filters: &Filters,
		page: u32,
		page_size: u32,
	) -> AggregatorResult<CatalogResult> {
		self.catalog.get_catalog(kind, filters, page, page_size).await
	}

	/// Number of `kind` entities matching `filters`
	pub async fn get_count(&self, kind: EntityKind, filters: &Filters) -> AggregatorResult<u64> {
		self.catalog.get_count(kind, filters).await
	}

	pub async fn get_map_points(
		&self,
		kind: EntityKind,
		filters: &Filters,
	) -> AggregatorResult<Vec<MapPoint>> {
		self.catalog.get_map_points(kind, filters).await
	}

	/// Entity with all related data and media
	///
	/// `city` falls back to the configured default city.
	pub async fn get_detail(
		&self,
		kind: EntityKind,
		id: &str,
		city: Option<&str>,
	) -> AggregatorResult<DetailResult> {
		let city = city.or(self.default_city.as_deref());
		self.detail.get_detail(kind, id, city).await
	}

	pub async fn get_dictionary(&self, kind: EntityKind, key: &str) -> AggregatorResult<Dictionary> {
		self.dictionaries.get_dictionary(kind, key).await
	}

	pub async fn get_all_dictionaries(&self, kind: EntityKind) -> AggregatorResult<DictionarySet> {
		self.dictionaries.get_all_dictionaries(kind).await
	}

	pub async fn get_media(&self, kind: EntityKind, id: &str) -> AggregatorResult<MediaCollection> {
		self.media.get_media(kind, id).await
	}

	/// Stop background cache sweeps
	pub fn shutdown(mut self) {
		if let Some(cleanup) = self.cleanup.take() {
			cleanup.abort();
		}
		log_service_shutdown();
	}
}

impl Drop for RealtyAggregator {
	fn drop(&mut self) {
		if let Some(cleanup) = self.cleanup.take() {
			cleanup.abort();
		}
	}
}
