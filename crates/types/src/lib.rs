//! Realty Types
//!
//! Shared models and traits for the realty aggregator: the entity kinds and
//! their routing table, request descriptors, the transport and auth seams,
//! typed entities and the result shapes of every public operation.

pub mod auth;
pub mod catalog;
pub mod constants;
pub mod detail;
pub mod entities;
pub mod errors;
pub mod kinds;
pub mod media;
pub mod models;
pub mod request;
pub mod routing;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export chrono and serde_json for convenience
pub use chrono;
pub use serde_json;

pub use auth::{AuthError, AuthResult, AuthToken, Authenticator};
pub use catalog::{CatalogResult, MapPoint, Pagination};
pub use detail::{DetailResult, EndpointFailure, EndpointOutcome, PartialAggregation};
pub use entities::{
	AreaRange, CommercialUnit, Complex, GeoPoint, House, HouseProject, ParkingSpace, Plot,
	PriceRange, Settlement, TypedEntity, Unit,
};
pub use errors::{AggregatorError, AggregatorResult, MappingError};
pub use kinds::{EntityKind, UnknownEntityKind};
pub use media::{Dictionary, DictionarySet, MediaCategory, MediaCollection, MediaItem};
pub use models::SecretString;
pub use request::{HttpMethod, RequestDescriptor};
pub use routing::{
	Bucket, DetailRoutes, DictionaryShape, EndpointTemplate, FilterEncoding, FilterSpec,
	FilterType, MediaRoutes, ObjectTypeRegistry, PhasedTemplate, RoutingConfig,
};
pub use transport::{Transport, TransportError, TransportResult};
