//! Object-type registry: the provider's routing table, built once at start-up

use super::{
	Bucket, DetailRoutes, DictionaryShape, EndpointTemplate, FilterEncoding, FilterSpec,
	FilterType, MediaRoutes, PhasedTemplate, RoutingConfig,
};
use crate::EntityKind;
use std::collections::HashMap;

const COMPLEX_DOMAIN: &str = "https://api.realtyhub.io";
const APARTMENT_DOMAIN: &str = "https://apartment-api.realtyhub.io";
const PARKING_DOMAIN: &str = "https://parkings-api.realtyhub.io";
const HOUSE_DOMAIN: &str = "https://house-api.realtyhub.io";
const COMMERCE_DOMAIN: &str = "https://commerce-api.realtyhub.io";
const PROJECTS_DOMAIN: &str = "https://projects.realtyhub.io";

const CITY: FilterSpec = FilterSpec::plain("city", FilterType::Text);
const SORT: FilterSpec = FilterSpec::plain("sort", FilterType::Text);
const SEARCH: FilterSpec = FilterSpec::new(
	"search",
	FilterType::Text,
	FilterEncoding::Renamed("query"),
);
const PRICE: FilterSpec = FilterSpec::range("price", "price_from", "price_to");
const AREA: FilterSpec = FilterSpec::range("area", "area_from", "area_to");
const COMPLEX_REF: FilterSpec = FilterSpec::new(
	"complex",
	FilterType::Integer,
	FilterEncoding::Renamed("block_id"),
);
const SETTLEMENT_REF: FilterSpec = FilterSpec::new(
	"settlement",
	FilterType::Integer,
	FilterEncoding::Renamed("village_id"),
);
const ROOMS: FilterSpec = FilterSpec::delimited("rooms", FilterType::IntegerSet, "room", ",");
const FLOOR: FilterSpec = FilterSpec::range("floor", "floor_from", "floor_to");
const DEADLINE: FilterSpec =
	FilterSpec::delimited("deadline", FilterType::TextSet, "deadline_keys", ",");
const FINISHING: FilterSpec =
	FilterSpec::delimited("finishing", FilterType::TextSet, "finishing", ",");
const DISTRICT: FilterSpec =
	FilterSpec::delimited("district", FilterType::IntegerSet, "district", ",");
const BEDROOMS: FilterSpec =
	FilterSpec::delimited("bedrooms", FilterType::IntegerSet, "bedrooms", ",");
const WALL_MATERIAL: FilterSpec =
	FilterSpec::delimited("material", FilterType::TextSet, "wall_material", "|");

const COMPLEX_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	SEARCH,
	PRICE,
	AREA,
	ROOMS,
	DEADLINE,
	FINISHING,
	DISTRICT,
	FilterSpec::delimited("builder", FilterType::IntegerSet, "builder", ","),
	FilterSpec::new(
		"mortgage",
		FilterType::Boolean,
		FilterEncoding::Flag("mortgage"),
	),
];

const UNIT_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	PRICE,
	AREA,
	COMPLEX_REF,
	ROOMS,
	FLOOR,
	DEADLINE,
	FINISHING,
	FilterSpec::delimited("building", FilterType::IntegerSet, "building", ","),
	FilterSpec::new(
		"not_first_floor",
		FilterType::Boolean,
		FilterEncoding::Flag("floor_not_first"),
	),
	FilterSpec::new(
		"not_last_floor",
		FilterType::Boolean,
		FilterEncoding::Flag("floor_not_last"),
	),
];

const PARKING_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	PRICE,
	AREA,
	COMPLEX_REF,
	FilterSpec::delimited("parking_type", FilterType::TextSet, "type", ","),
];

const HOUSE_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	PRICE,
	AREA,
	SETTLEMENT_REF,
	BEDROOMS,
	WALL_MATERIAL,
	FilterSpec::delimited("house_type", FilterType::TextSet, "house_type", "|"),
	FilterSpec::range("plot_area", "land_area_from", "land_area_to"),
];

const PLOT_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	PRICE,
	AREA,
	SETTLEMENT_REF,
	FilterSpec::delimited("land_category", FilterType::TextSet, "land_category", "|"),
	FilterSpec::delimited(
		"communications",
		FilterType::TextSet,
		"communications",
		",",
	),
];

const COMMERCE_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	PRICE,
	AREA,
	COMPLEX_REF,
	FLOOR,
	FilterSpec::delimited("purpose", FilterType::TextSet, "premise_type", ","),
];

const PROJECT_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	SEARCH,
	PRICE,
	AREA,
	BEDROOMS,
	WALL_MATERIAL,
	FilterSpec::delimited("floors", FilterType::IntegerSet, "floors", ","),
];

const SETTLEMENT_FILTERS: &[FilterSpec] = &[
	CITY,
	SORT,
	SEARCH,
	PRICE,
	DISTRICT,
	FilterSpec::range("distance", "distance_from", "distance_to"),
	FilterSpec::delimited("object_type", FilterType::TextSet, "object_type", "|"),
];

const COMPLEX_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("buildings", "blocks/{id}/buildings"),
	EndpointTemplate::related("apartments_summary", "blocks/{id}/apartments/summary"),
	EndpointTemplate::related("parkings_summary", "blocks/{id}/parkings/summary"),
	EndpointTemplate::related("commerce_summary", "blocks/{id}/commerce/summary"),
	EndpointTemplate::related("advantages", "blocks/{id}/advantages"),
	EndpointTemplate::related("infrastructure", "blocks/{id}/infrastructure"),
	EndpointTemplate::related("transport", "blocks/{id}/subways"),
	EndpointTemplate::related("mortgage", "blocks/{id}/mortgage"),
	EndpointTemplate::related("banks", "blocks/{id}/banks"),
	EndpointTemplate::related("developer", "blocks/{id}/builder"),
	EndpointTemplate::related("sales_offices", "blocks/{id}/sales-offices"),
	EndpointTemplate::related("promotions", "blocks/{id}/promotions"),
	EndpointTemplate::related("price_history", "blocks/{id}/price-history"),
	EndpointTemplate::related("reviews", "blocks/{id}/reviews"),
	EndpointTemplate::related("similar", "blocks/{id}/similar"),
	EndpointTemplate::media("plans", "blocks/{id}/plans"),
	EndpointTemplate::media("photos", "blocks/{id}/photos"),
	EndpointTemplate::media("videos", "blocks/{id}/videos"),
	EndpointTemplate::media("documents", "blocks/{id}/documents"),
	EndpointTemplate::media("panoramas", "blocks/{id}/panoramas"),
];

const CONSTRUCTION_PROGRESS: &[PhasedTemplate] = &[PhasedTemplate {
	key: "progress",
	coordinator: "blocks/{id}/progress/periods",
	item: "blocks/{id}/progress/{sub_key}",
	sub_keys_at: "/periods",
	bucket: Bucket::Media,
}];

const UNIT_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("complex", "apartments/{id}/block"),
	EndpointTemplate::related("building", "apartments/{id}/building"),
	EndpointTemplate::related("mortgage", "apartments/{id}/mortgage"),
	EndpointTemplate::related("price_history", "apartments/{id}/price-history"),
	EndpointTemplate::related("similar", "apartments/{id}/similar"),
	EndpointTemplate::media("plans", "apartments/{id}/plans"),
	EndpointTemplate::media("photos", "apartments/{id}/photos"),
	EndpointTemplate::media("documents", "apartments/{id}/documents"),
];

const PARKING_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("complex", "parkings/{id}/block"),
	EndpointTemplate::related("price_history", "parkings/{id}/price-history"),
	EndpointTemplate::media("plans", "parkings/{id}/plans"),
	EndpointTemplate::media("photos", "parkings/{id}/photos"),
];

const HOUSE_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("settlement", "houses/{id}/village"),
	EndpointTemplate::related("communications", "houses/{id}/communications"),
	EndpointTemplate::related("mortgage", "houses/{id}/mortgage"),
	EndpointTemplate::related("similar", "houses/{id}/similar"),
	EndpointTemplate::media("plans", "houses/{id}/plans"),
	EndpointTemplate::media("photos", "houses/{id}/photos"),
	EndpointTemplate::media("documents", "houses/{id}/documents"),
];

const PLOT_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("settlement", "plots/{id}/village"),
	EndpointTemplate::related("communications", "plots/{id}/communications"),
	EndpointTemplate::related("house_projects", "plots/{id}/projects"),
	EndpointTemplate::media("photos", "plots/{id}/photos"),
	EndpointTemplate::media("documents", "plots/{id}/documents"),
];

const COMMERCE_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("complex", "commerce/{id}/block"),
	EndpointTemplate::related("building", "commerce/{id}/building"),
	EndpointTemplate::media("plans", "commerce/{id}/plans"),
	EndpointTemplate::media("photos", "commerce/{id}/photos"),
	EndpointTemplate::media("documents", "commerce/{id}/documents"),
];

const PROJECT_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("floors", "projects/{id}/floors"),
	EndpointTemplate::related("materials", "projects/{id}/materials"),
	EndpointTemplate::related("equipment", "projects/{id}/equipment"),
	EndpointTemplate::related("contractors", "projects/{id}/contractors"),
	EndpointTemplate::media("plans", "projects/{id}/plans"),
	EndpointTemplate::media("photos", "projects/{id}/photos"),
	EndpointTemplate::media("videos", "projects/{id}/videos"),
];

const SETTLEMENT_SECONDARY: &[EndpointTemplate] = &[
	EndpointTemplate::related("infrastructure", "villages/{id}/infrastructure"),
	EndpointTemplate::related("communications", "villages/{id}/communications"),
	EndpointTemplate::related("houses_summary", "villages/{id}/houses/summary"),
	EndpointTemplate::related("plots_summary", "villages/{id}/plots/summary"),
	EndpointTemplate::related("developer", "villages/{id}/builder"),
	EndpointTemplate::media("photos", "villages/{id}/photos"),
	EndpointTemplate::media("videos", "villages/{id}/videos"),
	EndpointTemplate::media("documents", "villages/{id}/documents"),
];

const SETTLEMENT_PROGRESS: &[PhasedTemplate] = &[PhasedTemplate {
	key: "progress",
	coordinator: "villages/{id}/progress/periods",
	item: "villages/{id}/progress/{sub_key}",
	sub_keys_at: "/periods",
	bucket: Bucket::Media,
}];

fn default_routing(kind: EntityKind) -> RoutingConfig {
	match kind {
		EntityKind::Complex => RoutingConfig {
			kind,
			domain: COMPLEX_DOMAIN.to_string(),
			version: Some("v4_29"),
			catalog: "blocks/search",
			count: "blocks/count",
			map: Some("blocks/map"),
			dictionaries: "blocks/dictionaries",
			dictionary: "blocks/dictionaries/{key}",
			dictionary_shape: DictionaryShape::Keyed,
			extra_params: &[("show_type", "list")],
			filters: COMPLEX_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "blocks/{id}"),
				secondary: COMPLEX_SECONDARY,
				phased: CONSTRUCTION_PROGRESS,
			},
			media: MediaRoutes {
				plans: Some("blocks/{id}/plans"),
				photos: Some("blocks/{id}/photos"),
				videos: Some("blocks/{id}/videos"),
				documents: Some("blocks/{id}/documents"),
			},
		},
		EntityKind::Unit => RoutingConfig {
			kind,
			domain: APARTMENT_DOMAIN.to_string(),
			version: Some("v1"),
			catalog: "apartments/search",
			count: "apartments/count",
			map: None,
			dictionaries: "apartments/dictionaries",
			dictionary: "apartments/dictionaries/{key}",
			dictionary_shape: DictionaryShape::DataWrapped,
			extra_params: &[],
			filters: UNIT_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "apartments/{id}"),
				secondary: UNIT_SECONDARY,
				phased: &[],
			},
			media: MediaRoutes {
				plans: Some("apartments/{id}/plans"),
				photos: Some("apartments/{id}/photos"),
				videos: None,
				documents: Some("apartments/{id}/documents"),
			},
		},
		EntityKind::ParkingSpace => RoutingConfig {
			kind,
			domain: PARKING_DOMAIN.to_string(),
			version: Some("v1"),
			catalog: "parkings/search",
			count: "parkings/count",
			map: None,
			dictionaries: "parkings/dictionaries",
			dictionary: "parkings/dictionaries/{key}",
			dictionary_shape: DictionaryShape::DataWrapped,
			extra_params: &[],
			filters: PARKING_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "parkings/{id}"),
				secondary: PARKING_SECONDARY,
				phased: &[],
			},
			media: MediaRoutes {
				plans: Some("parkings/{id}/plans"),
				photos: Some("parkings/{id}/photos"),
				videos: None,
				documents: None,
			},
		},
		EntityKind::House => RoutingConfig {
			kind,
			domain: HOUSE_DOMAIN.to_string(),
			version: Some("v2"),
			catalog: "houses/search",
			count: "houses/count",
			map: Some("houses/map"),
			dictionaries: "houses/dictionaries",
			dictionary: "houses/dictionaries/{key}",
			dictionary_shape: DictionaryShape::PairLists,
			extra_params: &[("object_type", "house")],
			filters: HOUSE_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "houses/{id}"),
				secondary: HOUSE_SECONDARY,
				phased: &[],
			},
			media: MediaRoutes {
				plans: Some("houses/{id}/plans"),
				photos: Some("houses/{id}/photos"),
				videos: None,
				documents: Some("houses/{id}/documents"),
			},
		},
		EntityKind::Plot => RoutingConfig {
			kind,
			domain: HOUSE_DOMAIN.to_string(),
			version: Some("v2"),
			catalog: "plots/search",
			count: "plots/count",
			map: Some("plots/map"),
			dictionaries: "plots/dictionaries",
			dictionary: "plots/dictionaries/{key}",
			dictionary_shape: DictionaryShape::PairLists,
			extra_params: &[("object_type", "plot")],
			filters: PLOT_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "plots/{id}"),
				secondary: PLOT_SECONDARY,
				phased: &[],
			},
			media: MediaRoutes {
				plans: None,
				photos: Some("plots/{id}/photos"),
				videos: None,
				documents: Some("plots/{id}/documents"),
			},
		},
		EntityKind::CommercialUnit => RoutingConfig {
			kind,
			domain: COMMERCE_DOMAIN.to_string(),
			version: Some("v1"),
			catalog: "commerce/search",
			count: "commerce/count",
			map: None,
			dictionaries: "commerce/dictionaries",
			dictionary: "commerce/dictionaries/{key}",
			dictionary_shape: DictionaryShape::Keyed,
			extra_params: &[],
			filters: COMMERCE_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "commerce/{id}"),
				secondary: COMMERCE_SECONDARY,
				phased: &[],
			},
			media: MediaRoutes {
				plans: Some("commerce/{id}/plans"),
				photos: Some("commerce/{id}/photos"),
				videos: None,
				documents: Some("commerce/{id}/documents"),
			},
		},
		EntityKind::HouseProject => RoutingConfig {
			kind,
			domain: PROJECTS_DOMAIN.to_string(),
			version: None,
			catalog: "projects",
			count: "projects/count",
			map: None,
			dictionaries: "projects/dictionaries",
			dictionary: "projects/dictionaries/{key}",
			dictionary_shape: DictionaryShape::Keyed,
			extra_params: &[],
			filters: PROJECT_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "projects/{id}"),
				secondary: PROJECT_SECONDARY,
				phased: &[],
			},
			media: MediaRoutes {
				plans: Some("projects/{id}/plans"),
				photos: Some("projects/{id}/photos"),
				videos: Some("projects/{id}/videos"),
				documents: None,
			},
		},
		EntityKind::Settlement => RoutingConfig {
			kind,
			domain: HOUSE_DOMAIN.to_string(),
			version: Some("v2"),
			catalog: "villages/search",
			count: "villages/count",
			map: Some("villages/map"),
			dictionaries: "villages/dictionaries",
			dictionary: "villages/dictionaries/{key}",
			dictionary_shape: DictionaryShape::PairLists,
			extra_params: &[],
			filters: SETTLEMENT_FILTERS,
			detail: DetailRoutes {
				primary: EndpointTemplate::related("info", "villages/{id}"),
				secondary: SETTLEMENT_SECONDARY,
				phased: SETTLEMENT_PROGRESS,
			},
			media: MediaRoutes {
				plans: None,
				photos: Some("villages/{id}/photos"),
				videos: Some("villages/{id}/videos"),
				documents: Some("villages/{id}/documents"),
			},
		},
	}
}

/// Immutable routing table, one [`RoutingConfig`] per [`EntityKind`]
#[derive(Debug, Clone)]
pub struct ObjectTypeRegistry {
	configs: Vec<RoutingConfig>,
}

impl ObjectTypeRegistry {
	/// Build the default provider routing table
	pub fn new() -> Self {
		Self {
			configs: EntityKind::ALL.iter().map(|kind| default_routing(*kind)).collect(),
		}
	}

	/// Build the table with some kinds pointed at a different origin
	///
	/// Used to target staging hosts or a local mock server.
	pub fn with_domain_overrides(overrides: &HashMap<EntityKind, String>) -> Self {
		let mut registry = Self::new();
		for config in registry.configs.iter_mut() {
			if let Some(domain) = overrides.get(&config.kind) {
				config.domain = domain.clone();
			}
		}
		registry
	}

	/// Routing data for a kind
	pub fn config_for(&self, kind: EntityKind) -> &RoutingConfig {
		// The table is built from EntityKind::ALL, so every index is present
		&self.configs[kind.index()]
	}

	/// Iterate over every kind's routing data
	pub fn configs(&self) -> impl Iterator<Item = &RoutingConfig> {
		self.configs.iter()
	}

	/// Every routed kind, in declaration order
	pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
		self.configs.iter().map(|config| config.kind)
	}
}

impl Default for ObjectTypeRegistry {
	fn default() -> Self {
		Self::new()
	}
}
