//! Catalog listing results

use crate::{EntityKind, GeoPoint, TypedEntity};
use serde::Serialize;

/// Page position of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
	/// 1-based page number
	pub page: u32,
	pub page_size: u32,
	pub total_pages: u64,
}

impl Pagination {
	pub fn new(page: u32, page_size: u32, total: u64) -> Self {
		let total_pages = if page_size == 0 {
			0
		} else {
			total.div_ceil(u64::from(page_size))
		};

		Self {
			page,
			page_size,
			total_pages,
		}
	}

	pub fn has_next(&self) -> bool {
		u64::from(self.page) < self.total_pages
	}
}

/// One page of normalized entities
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogResult {
	pub kind: EntityKind,
	pub items: Vec<TypedEntity>,
	/// Total matches as reported by the provider
	pub total: u64,
	pub pagination: Pagination,
}

/// Map pin of one entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
	pub id: String,
	pub point: GeoPoint,
	pub title: Option<String>,
}
