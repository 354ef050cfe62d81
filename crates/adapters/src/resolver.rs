//! Endpoint resolver
//!
//! Turns `(kind, id, city, filters)` into concrete [`RequestDescriptor`]s using
//! the routing table. Filter validation happens here so an invalid key or
//! value fails before any network call is issued.

use realty_types::{
	AggregatorError, AggregatorResult, Bucket, EntityKind, FilterEncoding, FilterSpec,
	FilterType, MediaCategory, ObjectTypeRegistry, PhasedTemplate, RequestDescriptor,
	RoutingConfig,
};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Caller-supplied catalog filters, keyed by filter name
pub type Filters = BTreeMap<String, Value>;

/// A secondary request of a detail plan
#[derive(Debug, Clone)]
pub struct SecondaryRequest {
	pub bucket: Bucket,
	pub request: RequestDescriptor,
}

/// The coordinating request of a two-phase endpoint
#[derive(Debug, Clone)]
pub struct PhasedRequest {
	pub template: PhasedTemplate,
	pub coordinator: RequestDescriptor,
}

/// Every first-wave request of one detail call
#[derive(Debug, Clone)]
pub struct DetailPlan {
	pub kind: EntityKind,
	pub id: String,
	pub city: Option<String>,
	pub primary: RequestDescriptor,
	pub secondary: Vec<SecondaryRequest>,
	pub phased: Vec<PhasedRequest>,
}

impl DetailPlan {
	/// Number of first-wave requests
	pub fn request_count(&self) -> usize {
		1 + self.secondary.len() + self.phased.len()
	}

	/// First-wave requests keyed by endpoint key
	pub fn into_requests(self) -> BTreeMap<String, RequestDescriptor> {
		let mut requests = BTreeMap::new();
		requests.insert(self.primary.endpoint_key.clone(), self.primary);
		for secondary in self.secondary {
			requests.insert(secondary.request.endpoint_key.clone(), secondary.request);
		}
		for phased in self.phased {
			requests.insert(phased.coordinator.endpoint_key.clone(), phased.coordinator);
		}
		requests
	}
}

#[derive(Default)]
struct PathVars<'a> {
	id: Option<&'a str>,
	key: Option<&'a str>,
	sub_key: Option<&'a str>,
}

/// Validated filter value, before provider-specific encoding
#[derive(Debug, Clone, PartialEq)]
enum FilterValue {
	Single(String),
	Many(Vec<String>),
	Range(Option<String>, Option<String>),
	Flag(bool),
}

/// Builds request descriptors from the routing table
#[derive(Debug, Clone)]
pub struct EndpointResolver {
	registry: Arc<ObjectTypeRegistry>,
}

impl EndpointResolver {
	pub fn new(registry: Arc<ObjectTypeRegistry>) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &ObjectTypeRegistry {
		&self.registry
	}

	/// Listing request for one page of a kind's catalog
	pub fn resolve_catalog(
		&self,
		kind: EntityKind,
		filters: &Filters,
		page: u32,
		page_size: u32,
	) -> AggregatorResult<RequestDescriptor> {
		if page == 0 {
			return Err(AggregatorError::invalid_filter(
				kind,
				"page",
				"page numbers start at 1",
			));
		}
		if page_size == 0 {
			return Err(AggregatorError::invalid_filter(
				kind,
				"page_size",
				"page size must be positive",
			));
		}

		let config = self.registry.config_for(kind);
		let params = encode_filters(config, filters)?;
		let url = build_url(config, config.catalog, &PathVars::default())?;

		Ok(self
			.descriptor(config, "catalog", url)
			.with_params(params)
			.with_param("page", page.to_string())
			.with_param("per_page", page_size.to_string()))
	}

	/// Count request sharing the catalog filter path
	pub fn resolve_count(
		&self,
		kind: EntityKind,
		filters: &Filters,
	) -> AggregatorResult<RequestDescriptor> {
		let config = self.registry.config_for(kind);
		let params = encode_filters(config, filters)?;
		let url = build_url(config, config.count, &PathVars::default())?;

		Ok(self.descriptor(config, "count", url).with_params(params))
	}

	/// Map-pin request sharing the catalog filter path
	pub fn resolve_map(
		&self,
		kind: EntityKind,
		filters: &Filters,
	) -> AggregatorResult<RequestDescriptor> {
		let config = self.registry.config_for(kind);
		let template = config.map.ok_or(AggregatorError::Unsupported {
			kind,
			operation: "map",
		})?;
		let params = encode_filters(config, filters)?;
		let url = build_url(config, template, &PathVars::default())?;

		Ok(self.descriptor(config, "map", url).with_params(params))
	}

	/// First-wave detail requests keyed by endpoint key
	pub fn resolve_detail(
		&self,
		kind: EntityKind,
		id: &str,
		city: Option<&str>,
	) -> AggregatorResult<BTreeMap<String, RequestDescriptor>> {
		Ok(self.resolve_detail_plan(kind, id, city)?.into_requests())
	}

	/// First-wave detail requests, grouped by role
	pub fn resolve_detail_plan(
		&self,
		kind: EntityKind,
		id: &str,
		city: Option<&str>,
	) -> AggregatorResult<DetailPlan> {
		let id = checked_id(kind, id)?;
		let config = self.registry.config_for(kind);
		let city = city.map(str::trim).filter(|c| !c.is_empty());
		let vars = PathVars {
			id: Some(id),
			..Default::default()
		};

		let routes = &config.detail;
		let primary = self.detail_descriptor(
			config,
			routes.primary.key,
			routes.primary.path,
			&vars,
			city,
		)?;

		let secondary = routes
			.secondary
			.iter()
			.map(|endpoint| -> AggregatorResult<SecondaryRequest> {
				Ok(SecondaryRequest {
					bucket: endpoint.bucket,
					request: self.detail_descriptor(
						config,
						endpoint.key,
						endpoint.path,
						&vars,
						city,
					)?,
				})
			})
			.collect::<AggregatorResult<Vec<_>>>()?;

		let phased = routes
			.phased
			.iter()
			.map(|template| -> AggregatorResult<PhasedRequest> {
				Ok(PhasedRequest {
					template: *template,
					coordinator: self.detail_descriptor(
						config,
						template.key,
						template.coordinator,
						&vars,
						city,
					)?,
				})
			})
			.collect::<AggregatorResult<Vec<_>>>()?;

		Ok(DetailPlan {
			kind,
			id: id.to_string(),
			city: city.map(str::to_string),
			primary,
			secondary,
			phased,
		})
	}

	/// Second-wave request for one sub-key of a phased endpoint
	///
	/// The endpoint key is `"<phased key>:<sub_key>"`.
	pub fn resolve_phase_two(
		&self,
		plan: &DetailPlan,
		template: &PhasedTemplate,
		sub_key: &str,
	) -> AggregatorResult<RequestDescriptor> {
		let config = self.registry.config_for(plan.kind);
		let vars = PathVars {
			id: Some(&plan.id),
			sub_key: Some(sub_key),
			..Default::default()
		};
		let endpoint_key = format!("{}:{}", template.key, sub_key);

		self.detail_descriptor(
			config,
			&endpoint_key,
			template.item,
			&vars,
			plan.city.as_deref(),
		)
	}

	/// Request for one named dictionary of a kind
	pub fn resolve_dictionary(
		&self,
		kind: EntityKind,
		key: &str,
	) -> AggregatorResult<RequestDescriptor> {
		let key = key.trim();
		if key.is_empty() {
			return Err(AggregatorError::invalid_filter(
				kind,
				"dictionary",
				"dictionary key must not be empty",
			));
		}

		let config = self.registry.config_for(kind);
		let vars = PathVars {
			key: Some(key),
			..Default::default()
		};
		let url = build_url(config, config.dictionary, &vars)?;

		Ok(self.descriptor(config, &format!("dictionary:{}", key), url))
	}

	/// Request for every dictionary of a kind in one payload
	pub fn resolve_all_dictionaries(&self, kind: EntityKind) -> AggregatorResult<RequestDescriptor> {
		let config = self.registry.config_for(kind);
		let url = build_url(config, config.dictionaries, &PathVars::default())?;

		Ok(self.descriptor(config, "dictionaries", url))
	}

	/// Requests for every media category the kind publishes
	pub fn resolve_media(
		&self,
		kind: EntityKind,
		id: &str,
	) -> AggregatorResult<Vec<(MediaCategory, RequestDescriptor)>> {
		let id = checked_id(kind, id)?;
		let config = self.registry.config_for(kind);
		let vars = PathVars {
			id: Some(id),
			..Default::default()
		};

		MediaCategory::ALL
			.iter()
			.filter_map(|category| {
				let template = match category {
					MediaCategory::Plans => config.media.plans,
					MediaCategory::Photos => config.media.photos,
					MediaCategory::Videos => config.media.videos,
					MediaCategory::Documents => config.media.documents,
				}?;
				Some((*category, template))
			})
			.map(|(category, template)| -> AggregatorResult<(MediaCategory, RequestDescriptor)> {
				let url = build_url(config, template, &vars)?;
				Ok((category, self.descriptor(config, category.as_str(), url)))
			})
			.collect()
	}

	fn descriptor(&self, config: &RoutingConfig, endpoint_key: &str, url: Url) -> RequestDescriptor {
		RequestDescriptor::get(endpoint_key, url).with_params(config.extra_params.iter().copied())
	}

	fn detail_descriptor(
		&self,
		config: &RoutingConfig,
		endpoint_key: &str,
		template: &str,
		vars: &PathVars<'_>,
		city: Option<&str>,
	) -> AggregatorResult<RequestDescriptor> {
		let url = build_url(config, template, vars)?;
		let request = self.descriptor(config, endpoint_key, url);

		Ok(match city {
			Some(city) => request.with_param("city", city),
			None => request,
		})
	}
}

/// Empty identifiers can never exist upstream
fn checked_id(kind: EntityKind, id: &str) -> AggregatorResult<&str> {
	let trimmed = id.trim();
	if trimmed.is_empty() {
		return Err(AggregatorError::NotFound {
			kind,
			id: id.to_string(),
		});
	}
	Ok(trimmed)
}

/// Join a path template onto the kind's versioned origin
///
/// Placeholders must fill a whole segment; their values are percent-encoded
/// so an identifier can never add path segments or a query.
fn build_url(config: &RoutingConfig, template: &str, vars: &PathVars<'_>) -> AggregatorResult<Url> {
	let base = config.base_url();
	let mut url = Url::parse(&base).map_err(|e| {
		AggregatorError::Configuration(format!(
			"Invalid base URL '{}' for {}: {}",
			base, config.kind, e
		))
	})?;

	{
		let mut segments = url.path_segments_mut().map_err(|_| {
			AggregatorError::Configuration(format!(
				"Base URL '{}' for {} cannot carry a path",
				base, config.kind
			))
		})?;
		segments.pop_if_empty();

		for segment in template.split('/').filter(|s| !s.is_empty()) {
			let value = match segment {
				"{id}" => vars.id,
				"{key}" => vars.key,
				"{sub_key}" => vars.sub_key,
				literal if literal.contains('{') => None,
				literal => Some(literal),
			};
			let value = value.ok_or_else(|| {
				AggregatorError::Configuration(format!(
					"Unresolved segment '{}' in template '{}' for {}",
					segment, template, config.kind
				))
			})?;
			segments.push(value);
		}
	}

	Ok(url)
}

/// Validate every filter and encode it into query parameters
fn encode_filters(
	config: &RoutingConfig,
	filters: &Filters,
) -> AggregatorResult<Vec<(String, String)>> {
	let mut params = Vec::new();

	for (key, value) in filters {
		if value.is_null() {
			continue;
		}

		let spec = config.filter(key).ok_or_else(|| {
			AggregatorError::invalid_filter(config.kind, key, "unknown filter for this kind")
		})?;
		let value = validate(spec, value).map_err(|reason| {
			AggregatorError::invalid_filter(
				config.kind,
				key,
				format!("expected {}, {}", spec.value_type.describe(), reason),
			)
		})?;

		encode(spec, value, &mut params);
	}

	Ok(params)
}

fn validate(spec: &FilterSpec, value: &Value) -> Result<FilterValue, String> {
	match spec.value_type {
		FilterType::Text => text(value).map(FilterValue::Single),
		FilterType::Integer => integer(value).map(FilterValue::Single),
		FilterType::Boolean => boolean(value).map(FilterValue::Flag),
		FilterType::TextSet => set(value, text).map(FilterValue::Many),
		FilterType::IntegerSet => set(value, integer).map(FilterValue::Many),
		FilterType::Range => range(value),
	}
}

fn text(value: &Value) -> Result<String, String> {
	match value {
		Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
		Value::String(_) => Err("got an empty string".to_string()),
		Value::Number(n) => Ok(number_param(n)),
		other => Err(format!("got {}", json_type(other))),
	}
}

fn integer(value: &Value) -> Result<String, String> {
	match value {
		Value::Number(n) => n
			.as_i64()
			.map(|i| i.to_string())
			.ok_or_else(|| format!("got non-integer number {}", n)),
		Value::String(s) => s
			.trim()
			.parse::<i64>()
			.map(|i| i.to_string())
			.map_err(|_| format!("got '{}'", s)),
		other => Err(format!("got {}", json_type(other))),
	}
}

fn boolean(value: &Value) -> Result<bool, String> {
	match value {
		Value::Bool(b) => Ok(*b),
		Value::String(s) => match s.trim() {
			"true" | "1" => Ok(true),
			"false" | "0" => Ok(false),
			other => Err(format!("got '{}'", other)),
		},
		Value::Number(n) => match n.as_i64() {
			Some(1) => Ok(true),
			Some(0) => Ok(false),
			_ => Err(format!("got {}", n)),
		},
		other => Err(format!("got {}", json_type(other))),
	}
}

fn set(value: &Value, item: fn(&Value) -> Result<String, String>) -> Result<Vec<String>, String> {
	match value {
		Value::Array(items) => items.iter().map(item).collect(),
		single => item(single).map(|v| vec![v]),
	}
}

fn range(value: &Value) -> Result<FilterValue, String> {
	let bounds = value
		.as_object()
		.ok_or_else(|| format!("got {}", json_type(value)))?;

	if let Some(extra) = bounds.keys().find(|k| *k != "min" && *k != "max") {
		return Err(format!("got unexpected bound '{}'", extra));
	}

	let bound = |name: &str| -> Result<Option<Number>, String> {
		match bounds.get(name) {
			None | Some(Value::Null) => Ok(None),
			Some(Value::Number(n)) => Ok(Some(n.clone())),
			Some(Value::String(s)) => s
				.trim()
				.parse::<f64>()
				.ok()
				.and_then(Number::from_f64)
				.map(Some)
				.ok_or_else(|| format!("got non-numeric {} '{}'", name, s)),
			Some(other) => Err(format!("got {} for {}", json_type(other), name)),
		}
	};

	let (min, max) = (bound("min")?, bound("max")?);
	if min.is_none() && max.is_none() {
		return Err("got neither min nor max".to_string());
	}
	if let (Some(lo), Some(hi)) = (&min, &max) {
		if lo.as_f64() > hi.as_f64() {
			return Err(format!("got min {} above max {}", lo, hi));
		}
	}

	Ok(FilterValue::Range(
		min.as_ref().map(number_param),
		max.as_ref().map(number_param),
	))
}

fn encode(spec: &FilterSpec, value: FilterValue, params: &mut Vec<(String, String)>) {
	match (spec.encoding, value) {
		(FilterEncoding::Flag(param), FilterValue::Flag(on)) => {
			if on {
				params.push((param.to_string(), "1".to_string()));
			}
		},
		(FilterEncoding::Delimited { param, separator }, FilterValue::Many(values)) => {
			if !values.is_empty() {
				params.push((param.to_string(), values.join(separator)));
			}
		},
		(FilterEncoding::Range { min_param, max_param }, FilterValue::Range(min, max)) => {
			if let Some(min) = min {
				params.push((min_param.to_string(), min));
			}
			if let Some(max) = max {
				params.push((max_param.to_string(), max));
			}
		},
		(encoding, value) => {
			let name = match encoding {
				FilterEncoding::Renamed(param)
				| FilterEncoding::Flag(param)
				| FilterEncoding::Delimited { param, .. } => param,
				FilterEncoding::Range { min_param, .. } => min_param,
				FilterEncoding::Plain => spec.key,
			};
			match value {
				FilterValue::Single(v) => params.push((name.to_string(), v)),
				FilterValue::Many(values) => {
					params.extend(values.into_iter().map(|v| (name.to_string(), v)))
				},
				FilterValue::Flag(on) => {
					params.push((name.to_string(), if on { "1" } else { "0" }.to_string()))
				},
				FilterValue::Range(min, max) => {
					if let Some(min) = min {
						params.push((format!("{}_from", name), min));
					}
					if let Some(max) = max {
						params.push((format!("{}_to", name), max));
					}
				},
			}
		},
	}
}

/// Render integral numbers without a fractional part
fn number_param(n: &Number) -> String {
	if let Some(i) = n.as_i64() {
		return i.to_string();
	}
	match n.as_f64() {
		Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
		_ => n.to_string(),
	}
}

fn json_type(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}
