//! Static routing data for every entity kind
//!
//! A [`RoutingConfig`] describes where the provider publishes a kind: its
//! origin, API version segment, endpoint path templates and the filter
//! vocabulary the catalog accepts. Path templates use `{id}`, `{key}` and
//! `{sub_key}` placeholders which the resolver substitutes as whole,
//! percent-encoded path segments.

pub mod filters;
pub mod registry;

pub use filters::{FilterEncoding, FilterSpec, FilterType};
pub use registry::ObjectTypeRegistry;

use crate::EntityKind;
use serde::Serialize;

/// Where an assembled secondary payload lands in a detail result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
	/// Related data (buildings, mortgage programs, developer info, ...)
	Related,
	/// Media (plans, photos, videos, documents, ...)
	Media,
}

/// A single named endpoint of a detail strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointTemplate {
	/// Key under which the payload is stored and failures are reported
	pub key: &'static str,
	/// Path template relative to the versioned origin
	pub path: &'static str,
	/// Destination bucket for secondary endpoints
	pub bucket: Bucket,
}

impl EndpointTemplate {
	pub const fn related(key: &'static str, path: &'static str) -> Self {
		Self {
			key,
			path,
			bucket: Bucket::Related,
		}
	}

	pub const fn media(key: &'static str, path: &'static str) -> Self {
		Self {
			key,
			path,
			bucket: Bucket::Media,
		}
	}
}

/// An endpoint fetched in two waves
///
/// The coordinator call returns the set of sub-keys (e.g. the years that have
/// construction-progress photos); one item call per sub-key follows and the
/// results are merged under `key`, keyed by sub-key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhasedTemplate {
	pub key: &'static str,
	/// Path template of the coordinating call
	pub coordinator: &'static str,
	/// Path template of one item call; contains `{sub_key}`
	pub item: &'static str,
	/// JSON pointer to the sub-key array inside the coordinator payload
	pub sub_keys_at: &'static str,
	pub bucket: Bucket,
}

/// Detail assembly strategy of one kind
#[derive(Debug, Clone, Copy)]
pub struct DetailRoutes {
	/// Endpoint carrying the canonical entity
	pub primary: EndpointTemplate,
	pub secondary: &'static [EndpointTemplate],
	pub phased: &'static [PhasedTemplate],
}

impl DetailRoutes {
	/// Number of first-wave requests a detail call issues
	pub fn first_wave_len(&self) -> usize {
		1 + self.secondary.len() + self.phased.len()
	}
}

/// Media sub-collection endpoints of one kind
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaRoutes {
	pub plans: Option<&'static str>,
	pub photos: Option<&'static str>,
	pub videos: Option<&'static str>,
	pub documents: Option<&'static str>,
}

/// How a kind's dictionary endpoint lays out its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DictionaryShape {
	/// `{"rooms": [{"id": 1, "name": "Studio"}], ...}`, optionally inside `data`
	Keyed,
	/// `{"data": {"rooms": [{"_id": "a", "title": "Studio"}]}}`; a bare body is rejected
	DataWrapped,
	/// `{"rooms": [[1, "Studio"], [2, "1 bedroom"]]}`
	PairLists,
}

/// Routing data for one entity kind
#[derive(Debug, Clone)]
pub struct RoutingConfig {
	pub kind: EntityKind,
	/// Scheme and host, e.g. `https://api.realtyhub.io`
	pub domain: String,
	/// Optional API version path segment
	pub version: Option<&'static str>,
	pub catalog: &'static str,
	pub count: &'static str,
	pub map: Option<&'static str>,
	/// All dictionaries of the kind in one payload
	pub dictionaries: &'static str,
	/// One dictionary; contains `{key}`
	pub dictionary: &'static str,
	pub dictionary_shape: DictionaryShape,
	/// Fixed query parameters appended to every request of this kind
	pub extra_params: &'static [(&'static str, &'static str)],
	pub filters: &'static [FilterSpec],
	pub detail: DetailRoutes,
	pub media: MediaRoutes,
}

impl RoutingConfig {
	/// Look up the filter declaration for a caller-supplied key
	pub fn filter(&self, key: &str) -> Option<&FilterSpec> {
		self.filters.iter().find(|spec| spec.key == key)
	}

	/// Origin plus version segment, without a trailing slash
	pub fn base_url(&self) -> String {
		let domain = self.domain.trim_end_matches('/');
		match self.version {
			Some(version) => format!("{}/{}", domain, version),
			None => domain.to_string(),
		}
	}
}
