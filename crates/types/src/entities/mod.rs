//! Typed entities produced by normalization
//!
//! Only the identifier is guaranteed; every other field is optional because
//! the provider omits fields freely between endpoint versions.

pub mod residential;
pub mod suburban;

pub use residential::{CommercialUnit, Complex, ParkingSpace, Unit};
pub use suburban::{House, HouseProject, Plot, Settlement};

use crate::EntityKind;
use serde::{Deserialize, Serialize};

/// Price bounds in the provider's currency
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
	pub min: Option<f64>,
	pub max: Option<f64>,
}

impl PriceRange {
	pub fn is_empty(&self) -> bool {
		self.min.is_none() && self.max.is_none()
	}
}

/// Area bounds in square metres
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaRange {
	pub min: Option<f64>,
	pub max: Option<f64>,
}

/// WGS-84 coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub lat: f64,
	pub lng: f64,
}

/// Normalized entity, one variant per [`EntityKind`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypedEntity {
	Complex(Complex),
	Unit(Unit),
	ParkingSpace(ParkingSpace),
	House(House),
	Plot(Plot),
	CommercialUnit(CommercialUnit),
	HouseProject(HouseProject),
	Settlement(Settlement),
}

impl TypedEntity {
	pub fn kind(&self) -> EntityKind {
		match self {
			TypedEntity::Complex(_) => EntityKind::Complex,
			TypedEntity::Unit(_) => EntityKind::Unit,
			TypedEntity::ParkingSpace(_) => EntityKind::ParkingSpace,
			TypedEntity::House(_) => EntityKind::House,
			TypedEntity::Plot(_) => EntityKind::Plot,
			TypedEntity::CommercialUnit(_) => EntityKind::CommercialUnit,
			TypedEntity::HouseProject(_) => EntityKind::HouseProject,
			TypedEntity::Settlement(_) => EntityKind::Settlement,
		}
	}

	/// Provider identifier; never empty
	pub fn id(&self) -> &str {
		match self {
			TypedEntity::Complex(e) => &e.id,
			TypedEntity::Unit(e) => &e.id,
			TypedEntity::ParkingSpace(e) => &e.id,
			TypedEntity::House(e) => &e.id,
			TypedEntity::Plot(e) => &e.id,
			TypedEntity::CommercialUnit(e) => &e.id,
			TypedEntity::HouseProject(e) => &e.id,
			TypedEntity::Settlement(e) => &e.id,
		}
	}

	/// Display name, when the kind has one
	pub fn name(&self) -> Option<&str> {
		match self {
			TypedEntity::Complex(e) => e.name.as_deref(),
			TypedEntity::House(e) => e.name.as_deref(),
			TypedEntity::HouseProject(e) => e.name.as_deref(),
			TypedEntity::Settlement(e) => e.name.as_deref(),
			TypedEntity::Plot(e) => e.cadastral_number.as_deref(),
			TypedEntity::Unit(e) => e.number.as_deref(),
			TypedEntity::ParkingSpace(e) => e.number.as_deref(),
			TypedEntity::CommercialUnit(e) => e.number.as_deref(),
		}
	}

	/// Coordinates, when the kind is located on a map
	pub fn coordinates(&self) -> Option<GeoPoint> {
		match self {
			TypedEntity::Complex(e) => e.coordinates,
			TypedEntity::House(e) => e.coordinates,
			TypedEntity::Plot(e) => e.coordinates,
			TypedEntity::Settlement(e) => e.coordinates,
			_ => None,
		}
	}
}
