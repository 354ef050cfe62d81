//! The closed set of real-estate object categories published by the provider

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Real-estate object category
///
/// Every routing, resolution and mapping decision is keyed by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
	/// Residential complex (a group of buildings sold by one developer)
	Complex,
	/// Apartment inside a complex
	Unit,
	/// Parking space inside a complex
	ParkingSpace,
	/// Detached house
	House,
	/// Land plot
	Plot,
	/// Commercial premises inside a complex
	CommercialUnit,
	/// Catalogue house project (build-to-order design)
	HouseProject,
	/// Cottage settlement (village)
	Settlement,
}

impl EntityKind {
	/// All kinds, in routing-table order
	pub const ALL: [EntityKind; 8] = [
		EntityKind::Complex,
		EntityKind::Unit,
		EntityKind::ParkingSpace,
		EntityKind::House,
		EntityKind::Plot,
		EntityKind::CommercialUnit,
		EntityKind::HouseProject,
		EntityKind::Settlement,
	];

	/// Stable slug used in logs, cache keys and serialized output
	pub fn as_str(&self) -> &'static str {
		match self {
			EntityKind::Complex => "complex",
			EntityKind::Unit => "unit",
			EntityKind::ParkingSpace => "parking_space",
			EntityKind::House => "house",
			EntityKind::Plot => "plot",
			EntityKind::CommercialUnit => "commercial_unit",
			EntityKind::HouseProject => "house_project",
			EntityKind::Settlement => "settlement",
		}
	}

	/// Position of this kind in [`EntityKind::ALL`]
	pub(crate) fn index(self) -> usize {
		self as usize
	}
}

impl fmt::Display for EntityKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Returned when parsing an unknown kind slug
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown entity kind: {0}")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
	type Err = UnknownEntityKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		// Provider-side names are accepted alongside our own slugs
		match s.trim().to_ascii_lowercase().as_str() {
			"complex" | "block" => Ok(EntityKind::Complex),
			"unit" | "apartment" | "flat" => Ok(EntityKind::Unit),
			"parking_space" | "parking" => Ok(EntityKind::ParkingSpace),
			"house" => Ok(EntityKind::House),
			"plot" => Ok(EntityKind::Plot),
			"commercial_unit" | "commerce" | "commercial" => Ok(EntityKind::CommercialUnit),
			"house_project" | "project" => Ok(EntityKind::HouseProject),
			"settlement" | "village" => Ok(EntityKind::Settlement),
			other => Err(UnknownEntityKind(other.to_string())),
		}
	}
}
