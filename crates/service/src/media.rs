//! Media collections per entity, cached for a short TTL

use crate::payload;
use async_trait::async_trait;
use futures::future::join_all;
use realty_adapters::EndpointResolver;
use realty_storage::TtlCache;
use realty_types::constants::limits::DEFAULT_MEDIA_TTL_SECONDS;
use realty_types::{
	AggregatorError, AggregatorResult, EntityKind, MediaCollection, MediaItem, Transport,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Trait for media operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaServiceTrait: Send + Sync {
	/// Plans, photos, videos and documents of one entity
	async fn get_media(&self, kind: EntityKind, id: &str) -> AggregatorResult<MediaCollection>;
}

#[derive(Clone)]
pub struct MediaService {
	resolver: Arc<EndpointResolver>,
	transport: Arc<dyn Transport>,
	cache: TtlCache<(EntityKind, String), MediaCollection>,
}

impl MediaService {
	pub fn new(resolver: Arc<EndpointResolver>, transport: Arc<dyn Transport>) -> Self {
		Self::with_ttl(
			resolver,
			transport,
			Duration::from_secs(DEFAULT_MEDIA_TTL_SECONDS),
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
			cache: TtlCache::new("media", ttl),
		}
	}

	pub fn cleanup_expired(&self) -> usize {
		self.cache.cleanup_expired()
	}

	async fn fetch(&self, kind: EntityKind, id: &str) -> AggregatorResult<MediaCollection> {
		let requests = self.resolver.resolve_media(kind, id)?;
		debug!("Fetching {} media categories of {} '{}'", requests.len(), kind, id);

		let fetches = requests.iter().map(|(category, request)| async move {
			(*category, self.transport.execute(request).await)
		});

		let mut collection = MediaCollection::default();
		for (category, outcome) in join_all(fetches).await {
			match outcome {
				Ok(payload) => *collection.get_mut(category) = parse_items(payload)?,
				// A category the entity does not publish
				Err(error) if error.is_not_found() => {
					debug!("{} '{}' has no {}", kind, id, category.as_str());
				},
				Err(error) => return Err(AggregatorError::from(error)),
			}
		}

		info!("Loaded {} media items for {} '{}'", collection.len(), kind, id);
		Ok(collection)
	}
}

#[async_trait]
impl MediaServiceTrait for MediaService {
	async fn get_media(&self, kind: EntityKind, id: &str) -> AggregatorResult<MediaCollection> {
		let id = id.trim();
		self.cache
			.get_or_try_insert_with((kind, id.to_string()), || self.fetch(kind, id))
			.await
	}
}

fn parse_items(payload: Value) -> AggregatorResult<Vec<MediaItem>> {
	let listing = payload::listing(payload)?;
	Ok(listing.items.iter().filter_map(media_item).collect())
}

fn media_item(raw: &Value) -> Option<MediaItem> {
	let text = |keys: &[&str]| {
		keys.iter()
			.filter_map(|key| raw.get(*key)?.as_str())
			.map(str::trim)
			.find(|s| !s.is_empty())
			.map(str::to_string)
	};

	match raw {
		Value::String(url) if !url.trim().is_empty() => Some(MediaItem {
			url: url.trim().to_string(),
			title: None,
			thumbnail: None,
		}),
		Value::Object(_) => Some(MediaItem {
			url: text(&["url", "src", "file", "link", "path"])?,
			title: text(&["title", "name", "description"]),
			thumbnail: text(&["thumbnail", "thumb", "preview", "small"]),
		}),
		_ => None,
	}
}
