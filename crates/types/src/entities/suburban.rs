//! Suburban entities: houses, plots, settlements and catalogue projects

use super::{AreaRange, GeoPoint, PriceRange};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct House {
	pub id: String,
	pub name: Option<String>,
	pub settlement_id: Option<String>,
	pub settlement_name: Option<String>,
	pub area: Option<f64>,
	pub plot_area: Option<f64>,
	pub floors: Option<u32>,
	pub bedrooms: Option<u32>,
	pub material: Option<String>,
	pub price: Option<f64>,
	pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plot {
	pub id: String,
	pub cadastral_number: Option<String>,
	pub settlement_id: Option<String>,
	/// Area in hundred-square-metre units (sotka), as the provider publishes it
	pub area: Option<f64>,
	pub land_category: Option<String>,
	pub price: Option<f64>,
	pub coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HouseProject {
	pub id: String,
	pub name: Option<String>,
	pub area: Option<f64>,
	pub floors: Option<u32>,
	pub bedrooms: Option<u32>,
	pub bathrooms: Option<u32>,
	pub material: Option<String>,
	pub price: Option<f64>,
	pub builder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
	pub id: String,
	pub name: Option<String>,
	pub address: Option<String>,
	pub district: Option<String>,
	pub developer: Option<String>,
	pub price: PriceRange,
	pub plot_area: AreaRange,
	pub coordinates: Option<GeoPoint>,
	pub houses_count: Option<u32>,
	pub plots_count: Option<u32>,
}
