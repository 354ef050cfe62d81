//! Outbound request descriptors produced by the resolver

use serde_json::Value;
use std::fmt;
use url::Url;

/// HTTP method of an outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
	Get,
	Post,
}

impl fmt::Display for HttpMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HttpMethod::Get => f.write_str("GET"),
			HttpMethod::Post => f.write_str("POST"),
		}
	}
}

/// A fully resolved outbound call
///
/// Produced by the resolver, consumed by a [`crate::Transport`]. The URL never
/// carries a query string; parameters live in `query` so they can be
/// inspected and are encoded exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
	/// Name of the logical endpoint (`"info"`, `"photos"`, `"progress:2023"`, `"catalog"`)
	pub endpoint_key: String,
	pub method: HttpMethod,
	pub url: Url,
	pub query: Vec<(String, String)>,
	pub body: Option<Value>,
}

impl RequestDescriptor {
	/// Create a GET descriptor
	pub fn get(endpoint_key: impl Into<String>, url: Url) -> Self {
		Self {
			endpoint_key: endpoint_key.into(),
			method: HttpMethod::Get,
			url,
			query: Vec::new(),
			body: None,
		}
	}

	/// Create a POST descriptor with a JSON body
	pub fn post(endpoint_key: impl Into<String>, url: Url, body: Value) -> Self {
		Self {
			endpoint_key: endpoint_key.into(),
			method: HttpMethod::Post,
			url,
			query: Vec::new(),
			body: Some(body),
		}
	}

	/// Append a query parameter
	pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));
		self
	}

	/// Append several query parameters, keeping their order
	pub fn with_params<I, K, V>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.query
			.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
		self
	}

	/// Value of the first query parameter named `name`
	pub fn param(&self, name: &str) -> Option<&str> {
		self.query
			.iter()
			.find(|(key, _)| key == name)
			.map(|(_, value)| value.as_str())
	}

	/// Reads may be retried; writes may not
	pub fn is_idempotent(&self) -> bool {
		self.method == HttpMethod::Get
	}

	/// URL with the query string rendered
	pub fn full_url(&self) -> Url {
		let mut url = self.url.clone();
		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}
		url
	}
}

impl fmt::Display for RequestDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} [{}]", self.method, self.url, self.endpoint_key)
	}
}
