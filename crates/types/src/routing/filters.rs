//! Filter vocabulary declarations

/// Value type a filter key accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
	/// Free text
	Text,
	/// Whole number (JSON integer or numeric string)
	Integer,
	/// Boolean (JSON bool, `"true"`/`"false"`, `0`/`1`)
	Boolean,
	/// One or more text values
	TextSet,
	/// One or more whole numbers
	IntegerSet,
	/// `{"min": n, "max": n}` with at least one bound
	Range,
}

impl FilterType {
	pub fn describe(&self) -> &'static str {
		match self {
			FilterType::Text => "text",
			FilterType::Integer => "integer",
			FilterType::Boolean => "boolean",
			FilterType::TextSet => "list of text values",
			FilterType::IntegerSet => "list of integers",
			FilterType::Range => "range object with min and/or max",
		}
	}
}

/// How a validated filter value is written into the provider's query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEncoding {
	/// `key=value`, repeated for sets
	Plain,
	/// Same as `Plain` under a provider-specific parameter name
	Renamed(&'static str),
	/// Set collapsed into one parameter joined by `separator`
	Delimited {
		param: &'static str,
		separator: &'static str,
	},
	/// Range split into two optional bound parameters
	Range {
		min_param: &'static str,
		max_param: &'static str,
	},
	/// Boolean written as `param=1` when true and omitted when false
	Flag(&'static str),
}

/// One accepted catalog filter key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
	pub key: &'static str,
	pub value_type: FilterType,
	pub encoding: FilterEncoding,
}

impl FilterSpec {
	pub const fn new(key: &'static str, value_type: FilterType, encoding: FilterEncoding) -> Self {
		Self {
			key,
			value_type,
			encoding,
		}
	}

	pub const fn plain(key: &'static str, value_type: FilterType) -> Self {
		Self::new(key, value_type, FilterEncoding::Plain)
	}

	pub const fn delimited(
		key: &'static str,
		value_type: FilterType,
		param: &'static str,
		separator: &'static str,
	) -> Self {
		Self::new(
			key,
			value_type,
			FilterEncoding::Delimited { param, separator },
		)
	}

	pub const fn range(key: &'static str, min_param: &'static str, max_param: &'static str) -> Self {
		Self::new(
			key,
			FilterType::Range,
			FilterEncoding::Range {
				min_param,
				max_param,
			},
		)
	}
}
