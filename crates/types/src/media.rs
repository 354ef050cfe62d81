//! Media collections and dictionaries

use serde::Serialize;
use std::collections::BTreeMap;

/// Dictionary entries, value identifier to display label
pub type Dictionary = BTreeMap<String, String>;

/// Every dictionary of a kind, keyed by dictionary name
pub type DictionarySet = BTreeMap<String, Dictionary>;

/// Media category of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
	Plans,
	Photos,
	Videos,
	Documents,
}

impl MediaCategory {
	pub const ALL: [MediaCategory; 4] = [
		MediaCategory::Plans,
		MediaCategory::Photos,
		MediaCategory::Videos,
		MediaCategory::Documents,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			MediaCategory::Plans => "plans",
			MediaCategory::Photos => "photos",
			MediaCategory::Videos => "videos",
			MediaCategory::Documents => "documents",
		}
	}
}

/// One media file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
	pub url: String,
	pub title: Option<String>,
	pub thumbnail: Option<String>,
}

/// All media of one entity; absent categories are empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaCollection {
	pub plans: Vec<MediaItem>,
	pub photos: Vec<MediaItem>,
	pub videos: Vec<MediaItem>,
	pub documents: Vec<MediaItem>,
}

impl MediaCollection {
	pub fn get(&self, category: MediaCategory) -> &[MediaItem] {
		match category {
			MediaCategory::Plans => &self.plans,
			MediaCategory::Photos => &self.photos,
			MediaCategory::Videos => &self.videos,
			MediaCategory::Documents => &self.documents,
		}
	}

	pub fn get_mut(&mut self, category: MediaCategory) -> &mut Vec<MediaItem> {
		match category {
			MediaCategory::Plans => &mut self.plans,
			MediaCategory::Photos => &mut self.photos,
			MediaCategory::Videos => &mut self.videos,
			MediaCategory::Documents => &mut self.documents,
		}
	}

	pub fn len(&self) -> usize {
		MediaCategory::ALL.iter().map(|c| self.get(*c).len()).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
