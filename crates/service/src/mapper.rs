//! Entity normalization
//!
//! One [`EntityMapper`] per kind turns a raw provider object into its
//! [`TypedEntity`]. Only the identifier is required; every other field is
//! read leniently because the provider renames and retypes fields between
//! endpoint versions (numbers arrive as strings, nested objects as names).

use crate::payload::unwrap_entity;
use realty_types::{
	AreaRange, CommercialUnit, Complex, EntityKind, GeoPoint, House, HouseProject, MappingError,
	ParkingSpace, Plot, PriceRange, Settlement, TypedEntity, Unit,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

const ID_KEYS: [&str; 3] = ["id", "_id", "guid"];

/// Converts raw payloads of one kind into typed entities
#[cfg_attr(test, mockall::automock)]
pub trait EntityMapper: Send + Sync {
	fn kind(&self) -> EntityKind;

	fn supports(&self, kind: EntityKind) -> bool {
		kind == self.kind()
	}

	/// Map one raw object; fails only on an empty payload or missing id
	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError>;
}

/// Provider identifier from `id`, `_id` or `guid`, string or integer
pub fn extract_id(raw: &Value) -> Option<String> {
	let object = raw.as_object()?;
	ID_KEYS.iter().find_map(|key| match object.get(*key)? {
		Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
		Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
		_ => None,
	})
}

/// Validated view over one raw entity object
pub struct Fields<'a> {
	object: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
	/// Unwrap the envelope and check the payload before any field is read
	pub fn prepare(kind: EntityKind, raw: &'a Value) -> Result<(String, Self), MappingError> {
		let raw = unwrap_entity(raw);
		let object = match raw {
			Value::Null => return Err(MappingError::EmptyPayload { kind }),
			Value::String(s) if s.trim().is_empty() => {
				return Err(MappingError::EmptyPayload { kind })
			},
			Value::Object(object) if object.is_empty() => {
				return Err(MappingError::EmptyPayload { kind })
			},
			Value::Array(items) if items.is_empty() => {
				return Err(MappingError::EmptyPayload { kind })
			},
			Value::Object(object) => object,
			_ => return Err(MappingError::NotAnObject { kind }),
		};

		let id = extract_id(raw).ok_or(MappingError::MissingIdentifier { kind })?;
		Ok((id, Self { object }))
	}

	fn first(&self, keys: &[&str]) -> Option<&'a Value> {
		keys.iter()
			.filter_map(|key| self.object.get(*key))
			.find(|value| !value.is_null())
	}

	/// First non-empty text among `keys`; nested objects yield their `name`
	pub fn text(&self, keys: &[&str]) -> Option<String> {
		keys.iter()
			.filter_map(|key| self.object.get(*key))
			.find_map(as_text)
	}

	pub fn number(&self, keys: &[&str]) -> Option<f64> {
		keys.iter()
			.filter_map(|key| self.object.get(*key))
			.find_map(as_number)
	}

	pub fn count(&self, keys: &[&str]) -> Option<u32> {
		self.number(keys)
			.filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
			.map(|n| n as u32)
	}

	pub fn level(&self, keys: &[&str]) -> Option<i32> {
		self.number(keys)
			.filter(|n| n.abs() <= i32::MAX as f64)
			.map(|n| n as i32)
	}

	/// Range from `{min,max}` / `{from,to}` objects or flat bound fields
	fn bounds(
		&self,
		object_keys: &[&str],
		min_keys: &[&str],
		max_keys: &[&str],
	) -> (Option<f64>, Option<f64>) {
		if let Some(Value::Object(range)) = self.first(object_keys) {
			let nested = Fields { object: range };
			return (
				nested.number(&["min", "from"]),
				nested.number(&["max", "to"]),
			);
		}
		if let Some(single) = self.first(object_keys).and_then(as_number) {
			return (Some(single), Some(single));
		}
		(self.number(min_keys), self.number(max_keys))
	}

	pub fn price_range(&self) -> PriceRange {
		let (min, max) = self.bounds(
			&["price"],
			&["price_min", "price_from", "min_price"],
			&["price_max", "price_to", "max_price"],
		);
		PriceRange { min, max }
	}

	pub fn area_range(
		&self,
		object_keys: &[&str],
		min_keys: &[&str],
		max_keys: &[&str],
	) -> AreaRange {
		let (min, max) = self.bounds(object_keys, min_keys, max_keys);
		AreaRange { min, max }
	}

	/// Point from `coordinates`/`location`/`geo` objects or arrays, or flat `lat`/`lng`
	pub fn point(&self) -> Option<GeoPoint> {
		match self.first(&["coordinates", "location", "geo", "point"]) {
			Some(Value::Object(nested)) => Fields { object: nested }.flat_point(),
			Some(Value::Array(pair)) if pair.len() == 2 => {
				let lat = as_number(&pair[0])?;
				let lng = as_number(&pair[1])?;
				valid_point(lat, lng)
			},
			_ => self.flat_point(),
		}
	}

	fn flat_point(&self) -> Option<GeoPoint> {
		let lat = self.number(&["lat", "latitude"])?;
		let lng = self.number(&["lng", "lon", "long", "longitude"])?;
		valid_point(lat, lng)
	}
}

fn valid_point(lat: f64, lng: f64) -> Option<GeoPoint> {
	let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
	in_range.then_some(GeoPoint { lat, lng })
}

fn as_text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
		Value::Number(n) => Some(n.to_string()),
		Value::Object(nested) => ["name", "title", "value"]
			.iter()
			.filter_map(|key| nested.get(*key))
			.find_map(as_text),
		_ => None,
	}
}

fn as_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => {
			let cleaned: String = s
				.chars()
				.filter(|c| !c.is_whitespace())
				.map(|c| if c == ',' { '.' } else { c })
				.collect();
			cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
		},
		_ => None,
	}
}

pub struct ComplexMapper;

impl EntityMapper for ComplexMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::Complex
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::Complex(Complex {
			id,
			name: f.text(&["name", "title"]),
			address: f.text(&["address"]),
			district: f.text(&["district", "region"]),
			developer: f.text(&["developer", "builder"]),
			price: f.price_range(),
			area: f.area_range(&["area"], &["area_min", "area_from"], &["area_max", "area_to"]),
			coordinates: f.point(),
			deadline: f.text(&["deadline", "completion", "finish_date"]),
			units_available: f.count(&["apartments_count", "flats_count", "units_available"]),
			subway: f.text(&["subway", "metro"]),
		}))
	}
}

pub struct UnitMapper;

impl EntityMapper for UnitMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::Unit
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::Unit(Unit {
			id,
			number: f.text(&["number", "num"]),
			complex_id: f.text(&["block_id", "complex_id"]),
			complex_name: f.text(&["block_name", "complex_name", "block"]),
			building: f.text(&["building", "building_name", "corpus"]),
			rooms: f.count(&["rooms", "room"]),
			floor: f.level(&["floor"]),
			floors_total: f.level(&["floors", "floors_total"]),
			area_total: f.number(&["area_total", "area"]),
			area_kitchen: f.number(&["area_kitchen", "kitchen_area"]),
			price: f.number(&["price", "cost"]),
			finishing: f.text(&["finishing", "decoration"]),
			deadline: f.text(&["deadline", "completion"]),
		}))
	}
}

pub struct ParkingSpaceMapper;

impl EntityMapper for ParkingSpaceMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::ParkingSpace
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::ParkingSpace(ParkingSpace {
			id,
			number: f.text(&["number", "num"]),
			complex_id: f.text(&["block_id", "complex_id"]),
			parking_type: f.text(&["parking_type", "type"]),
			level: f.level(&["level", "floor"]),
			area: f.number(&["area"]),
			price: f.number(&["price", "cost"]),
		}))
	}
}

pub struct CommercialUnitMapper;

impl EntityMapper for CommercialUnitMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::CommercialUnit
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::CommercialUnit(CommercialUnit {
			id,
			number: f.text(&["number", "num"]),
			complex_id: f.text(&["block_id", "complex_id"]),
			purpose: f.text(&["purpose", "designation"]),
			floor: f.level(&["floor"]),
			area: f.number(&["area"]),
			price: f.number(&["price", "cost"]),
		}))
	}
}

pub struct HouseMapper;

impl EntityMapper for HouseMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::House
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::House(House {
			id,
			name: f.text(&["name", "title"]),
			settlement_id: f.text(&["village_id", "settlement_id"]),
			settlement_name: f.text(&["village_name", "settlement_name", "village"]),
			area: f.number(&["area", "house_area"]),
			plot_area: f.number(&["land_area", "plot_area"]),
			floors: f.count(&["floors"]),
			bedrooms: f.count(&["bedrooms"]),
			material: f.text(&["wall_material", "material"]),
			price: f.number(&["price", "cost"]),
			coordinates: f.point(),
		}))
	}
}

pub struct PlotMapper;

impl EntityMapper for PlotMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::Plot
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::Plot(Plot {
			id,
			cadastral_number: f.text(&["cadastral_number", "cadastral"]),
			settlement_id: f.text(&["village_id", "settlement_id"]),
			area: f.number(&["land_area", "area"]),
			land_category: f.text(&["land_category", "category"]),
			price: f.number(&["price", "cost"]),
			coordinates: f.point(),
		}))
	}
}

pub struct HouseProjectMapper;

impl EntityMapper for HouseProjectMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::HouseProject
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::HouseProject(HouseProject {
			id,
			name: f.text(&["name", "title"]),
			area: f.number(&["area"]),
			floors: f.count(&["floors"]),
			bedrooms: f.count(&["bedrooms"]),
			bathrooms: f.count(&["bathrooms"]),
			material: f.text(&["wall_material", "material"]),
			price: f.number(&["price", "cost"]),
			builder: f.text(&["builder", "developer"]),
		}))
	}
}

pub struct SettlementMapper;

impl EntityMapper for SettlementMapper {
	fn kind(&self) -> EntityKind {
		EntityKind::Settlement
	}

	fn map(&self, raw: &Value) -> Result<TypedEntity, MappingError> {
		let (id, f) = Fields::prepare(self.kind(), raw)?;
		Ok(TypedEntity::Settlement(Settlement {
			id,
			name: f.text(&["name", "title"]),
			address: f.text(&["address"]),
			district: f.text(&["district", "region"]),
			developer: f.text(&["developer", "builder"]),
			price: f.price_range(),
			plot_area: f.area_range(
				&["land_area", "plot_area"],
				&["land_area_min", "land_area_from"],
				&["land_area_max", "land_area_to"],
			),
			coordinates: f.point(),
			houses_count: f.count(&["houses_count"]),
			plots_count: f.count(&["plots_count", "lands_count"]),
		}))
	}
}

/// Mapper per entity kind
#[derive(Clone)]
pub struct MapperRegistry {
	mappers: HashMap<EntityKind, Arc<dyn EntityMapper>>,
}

impl std::fmt::Debug for MapperRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut kinds: Vec<_> = self.mappers.keys().collect();
		kinds.sort();
		f.debug_struct("MapperRegistry").field("kinds", &kinds).finish()
	}
}

impl Default for MapperRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl MapperRegistry {
	/// Registry with the built-in mapper of every kind
	pub fn new() -> Self {
		let builtin: [Arc<dyn EntityMapper>; 8] = [
			Arc::new(ComplexMapper),
			Arc::new(UnitMapper),
			Arc::new(ParkingSpaceMapper),
			Arc::new(HouseMapper),
			Arc::new(PlotMapper),
			Arc::new(CommercialUnitMapper),
			Arc::new(HouseProjectMapper),
			Arc::new(SettlementMapper),
		];

		let mut registry = Self::empty();
		for mapper in builtin {
			registry.register(mapper);
		}
		registry
	}

	pub fn empty() -> Self {
		Self {
			mappers: HashMap::new(),
		}
	}

	/// Register `mapper` for every kind it supports, replacing earlier ones
	pub fn register(&mut self, mapper: Arc<dyn EntityMapper>) {
		for kind in EntityKind::ALL {
			if mapper.supports(kind) {
				self.mappers.insert(kind, Arc::clone(&mapper));
			}
		}
	}

	pub fn supports(&self, kind: EntityKind) -> bool {
		self.mappers.contains_key(&kind)
	}

	pub fn map(&self, kind: EntityKind, raw: &Value) -> Result<TypedEntity, MappingError> {
		self.mappers
			.get(&kind)
			.ok_or(MappingError::Unsupported { kind })?
			.map(raw)
	}

	/// Map every item, keeping input order; the first failure aborts
	pub fn normalize_many(
		&self,
		kind: EntityKind,
		items: &[Value],
	) -> Result<Vec<TypedEntity>, MappingError> {
		let mapper = self
			.mappers
			.get(&kind)
			.ok_or(MappingError::Unsupported { kind })?;

		items.iter().map(|raw| mapper.map(raw)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_empty_and_missing_identifier() {
		let registry = MapperRegistry::new();

		assert_eq!(
			registry.map(EntityKind::Settlement, &json!({})),
			Err(MappingError::EmptyPayload {
				kind: EntityKind::Settlement
			})
		);
		assert_eq!(
			registry.map(EntityKind::Settlement, &json!({"name": "Test"})),
			Err(MappingError::MissingIdentifier {
				kind: EntityKind::Settlement
			})
		);

		let entity = registry
			.map(EntityKind::Settlement, &json!({"id": "123", "name": "Villa Marina"}))
			.unwrap();
		assert_eq!(entity.id(), "123");
		assert_eq!(entity.name(), Some("Villa Marina"));
	}

	#[test]
	fn test_every_kind_has_a_mapper() {
		let registry = MapperRegistry::new();
		for kind in EntityKind::ALL {
			assert!(registry.supports(kind));
			let entity = registry.map(kind, &json!({"id": 7})).unwrap();
			assert_eq!(entity.kind(), kind);
			assert_eq!(entity.id(), "7");
		}
	}

	#[test]
	fn test_identifier_aliases_and_envelope() {
		let registry = MapperRegistry::new();
		let by_underscore = registry.map(EntityKind::Unit, &json!({"_id": " u-1 "})).unwrap();
		assert_eq!(by_underscore.id(), "u-1");

		let by_guid = registry
			.map(EntityKind::Plot, &json!({"data": {"guid": "a1b2", "cadastral_number": "50:21"}}))
			.unwrap();
		assert_eq!(by_guid.id(), "a1b2");
		assert_eq!(by_guid.name(), Some("50:21"));

		assert_eq!(
			registry.map(EntityKind::Unit, &json!({"id": "  "})),
			Err(MappingError::MissingIdentifier {
				kind: EntityKind::Unit
			})
		);
		assert_eq!(
			registry.map(EntityKind::Unit, &json!([1, 2])),
			Err(MappingError::NotAnObject {
				kind: EntityKind::Unit
			})
		);
	}

	#[test]
	fn test_lenient_field_reading() {
		let registry = MapperRegistry::new();
		let raw = json!({
			"id": 15,
			"name": "Северный квартал",
			"developer": {"id": 3, "name": "Stroy"},
			"price": {"min": "4 500 000", "max": 9800000},
			"coordinates": [55.75, 37.61],
			"apartments_count": "120",
			"subway": null,
			"metro": "Ploshchad"
		});

		let TypedEntity::Complex(complex) = registry.map(EntityKind::Complex, &raw).unwrap() else {
			panic!("expected a complex");
		};
		assert_eq!(complex.developer.as_deref(), Some("Stroy"));
		assert_eq!(complex.price.min, Some(4_500_000.0));
		assert_eq!(complex.price.max, Some(9_800_000.0));
		assert_eq!(
			complex.coordinates,
			Some(GeoPoint {
				lat: 55.75,
				lng: 37.61
			})
		);
		assert_eq!(complex.units_available, Some(120));
		assert_eq!(complex.subway.as_deref(), Some("Ploshchad"));
		assert!(complex.area.min.is_none());
	}

	#[test]
	fn test_flat_coordinates_and_ranges() {
		let registry = MapperRegistry::new();
		let raw = json!({
			"id": "s-1",
			"lat": "55.1",
			"lng": 37.2,
			"price_from": 1000,
			"land_area": {"from": 6, "to": 15}
		});

		let TypedEntity::Settlement(settlement) = registry.map(EntityKind::Settlement, &raw).unwrap()
		else {
			panic!("expected a settlement");
		};
		assert_eq!(settlement.coordinates, Some(GeoPoint { lat: 55.1, lng: 37.2 }));
		assert_eq!(settlement.price.min, Some(1000.0));
		assert_eq!(settlement.price.max, None);
		assert_eq!(settlement.plot_area.min, Some(6.0));
		assert_eq!(settlement.plot_area.max, Some(15.0));
	}

	#[test]
	fn test_normalize_many_preserves_order_and_length() {
		let registry = MapperRegistry::new();
		assert!(registry.normalize_many(EntityKind::House, &[]).unwrap().is_empty());

		let items: Vec<Value> = (0..25).map(|i| json!({"id": i})).collect();
		let entities = registry.normalize_many(EntityKind::House, &items).unwrap();
		assert_eq!(entities.len(), items.len());
		for (i, entity) in entities.iter().enumerate() {
			assert_eq!(entity.id(), i.to_string());
		}

		let broken = vec![json!({"id": 1}), json!({"name": "no id"})];
		assert!(registry.normalize_many(EntityKind::House, &broken).is_err());
	}

	#[test]
	fn test_registered_mapper_replaces_builtin() {
		let mut mock = MockEntityMapper::new();
		mock.expect_supports()
			.returning(|kind| kind == EntityKind::HouseProject);
		mock.expect_map().times(1).returning(|_| {
			Ok(TypedEntity::HouseProject(HouseProject {
				id: "custom".to_string(),
				..Default::default()
			}))
		});

		let mut registry = MapperRegistry::new();
		registry.register(Arc::new(mock));

		let entity = registry
			.map(EntityKind::HouseProject, &json!({"id": "ignored"}))
			.unwrap();
		assert_eq!(entity.id(), "custom");

		// Other kinds keep the built-in mapper
		assert_eq!(registry.map(EntityKind::House, &json!({"id": 1})).unwrap().id(), "1");
	}

	#[test]
	fn test_empty_registry_is_unsupported() {
		let registry = MapperRegistry::empty();
		assert_eq!(
			registry.map(EntityKind::Plot, &json!({"id": 1})),
			Err(MappingError::Unsupported {
				kind: EntityKind::Plot
			})
		);
	}
}
