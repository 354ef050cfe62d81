//! Entities sold inside residential complexes

use super::{AreaRange, GeoPoint, PriceRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex {
	pub id: String,
	pub name: Option<String>,
	pub address: Option<String>,
	pub district: Option<String>,
	pub developer: Option<String>,
	pub price: PriceRange,
	pub area: AreaRange,
	pub coordinates: Option<GeoPoint>,
	/// Handover deadline as published, e.g. `"Q4 2026"` or `"2026-12"`
	pub deadline: Option<String>,
	pub units_available: Option<u32>,
	pub subway: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unit {
	pub id: String,
	/// Apartment number within the building
	pub number: Option<String>,
	pub complex_id: Option<String>,
	pub complex_name: Option<String>,
	pub building: Option<String>,
	/// `0` is a studio
	pub rooms: Option<u32>,
	pub floor: Option<i32>,
	pub floors_total: Option<i32>,
	pub area_total: Option<f64>,
	pub area_kitchen: Option<f64>,
	pub price: Option<f64>,
	pub finishing: Option<String>,
	pub deadline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParkingSpace {
	pub id: String,
	pub number: Option<String>,
	pub complex_id: Option<String>,
	pub parking_type: Option<String>,
	pub level: Option<i32>,
	pub area: Option<f64>,
	pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommercialUnit {
	pub id: String,
	pub number: Option<String>,
	pub complex_id: Option<String>,
	pub purpose: Option<String>,
	pub floor: Option<i32>,
	pub area: Option<f64>,
	pub price: Option<f64>,
}
