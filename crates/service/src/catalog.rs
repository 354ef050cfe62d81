//! Catalog listing, counting and map pins

use crate::mapper::{extract_id, Fields, MapperRegistry};
use crate::payload;
use async_trait::async_trait;
use realty_adapters::{EndpointResolver, Filters};
use realty_types::{AggregatorResult, CatalogResult, EntityKind, MapPoint, Pagination, Transport};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Trait for catalog operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogServiceTrait: Send + Sync {
	/// One page of typed entities plus the provider's total
	async fn get_catalog(
		&self,
		kind: EntityKind,
		filters: &Filters,
		page: u32,
		page_size: u32,
	) -> AggregatorResult<CatalogResult>;

	/// Number of entities matching `filters`
	async fn get_count(&self, kind: EntityKind, filters: &Filters) -> AggregatorResult<u64>;

	/// Coordinates of every entity matching `filters`
	async fn get_map_points(
		&self,
		kind: EntityKind,
		filters: &Filters,
	) -> AggregatorResult<Vec<MapPoint>>;
}

/// Catalog service over the provider's listing endpoints
#[derive(Clone)]
pub struct CatalogService {
	resolver: Arc<EndpointResolver>,
	transport: Arc<dyn Transport>,
	mappers: Arc<MapperRegistry>,
}

impl CatalogService {
	pub fn new(
		resolver: Arc<EndpointResolver>,
		transport: Arc<dyn Transport>,
		mappers: Arc<MapperRegistry>,
	) -> Self {
		Self {
			resolver,
			transport,
			mappers,
		}
	}
}

#[async_trait]
impl CatalogServiceTrait for CatalogService {
	async fn get_catalog(
		&self,
		kind: EntityKind,
		filters: &Filters,
		page: u32,
		page_size: u32,
	) -> AggregatorResult<CatalogResult> {
		let request = self
			.resolver
			.resolve_catalog(kind, filters, page, page_size)?;
		debug!("Fetching {} catalog page {} ({})", kind, page, request.full_url());

		let mut listing = payload::listing(self.transport.execute(&request).await?)?;

		let limit = page_size as usize;
		if listing.items.len() > limit {
			warn!(
				"{} catalog page {} returned {} items for page size {}, truncating",
				kind,
				page,
				listing.items.len(),
				page_size
			);
			listing.items.truncate(limit);
		}

		let items = self.mappers.normalize_many(kind, &listing.items)?;

		// Without a reported total, count what is known up to this page
		let total = listing.total.unwrap_or_else(|| {
			u64::from(page.saturating_sub(1)) * u64::from(page_size) + items.len() as u64
		});

		info!(
			"{} catalog page {}: {} of {} items",
			kind,
			page,
			items.len(),
			total
		);

		Ok(CatalogResult {
			kind,
			items,
			total,
			pagination: Pagination::new(page, page_size, total),
		})
	}

	async fn get_count(&self, kind: EntityKind, filters: &Filters) -> AggregatorResult<u64> {
		let request = self.resolver.resolve_count(kind, filters)?;
		let payload = self.transport.execute(&request).await?;
		let count = payload::count(&payload)?;

		debug!("{} count: {}", kind, count);
		Ok(count)
	}

	async fn get_map_points(
		&self,
		kind: EntityKind,
		filters: &Filters,
	) -> AggregatorResult<Vec<MapPoint>> {
		let request = self.resolver.resolve_map(kind, filters)?;
		let listing = payload::listing(self.transport.execute(&request).await?)?;
		let received = listing.items.len();

		let points: Vec<MapPoint> = listing
			.items
			.iter()
			.filter_map(|raw| {
				let id = extract_id(raw)?;
				let (_, fields) = Fields::prepare(kind, raw).ok()?;
				Some(MapPoint {
					id,
					point: fields.point()?,
					title: fields.text(&["name", "title", "number"]),
				})
			})
			.collect();

		if points.len() < received {
			debug!(
				"Skipped {} {} map items without identifier or coordinates",
				received - points.len(),
				kind
			);
		}

		Ok(points)
	}
}
