//! Realty Service
//!
//! Catalog listing, detail aggregation, entity normalization and the cached
//! dictionary and media accessors.

pub mod aggregator;
pub mod catalog;
pub mod dictionary;
pub mod mapper;
pub mod media;
pub mod payload;

pub use aggregator::{AggregationConfig, DetailAggregator, DetailServiceTrait};
pub use catalog::{CatalogService, CatalogServiceTrait};
pub use dictionary::{DictionaryService, DictionaryServiceTrait};
pub use mapper::{EntityMapper, MapperRegistry};
pub use media::{MediaService, MediaServiceTrait};
