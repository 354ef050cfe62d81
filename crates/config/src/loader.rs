//! Configuration loading utilities
//!
//! `config/config.{toml,json,yaml}` is optional; `REALTY__`-prefixed
//! environment variables override it, with `__` separating nested keys
//! (`REALTY__AGGREGATION__CONCURRENCY=8`).

use crate::settings::ConfigValidationError;
use crate::Settings;
use config::{Config, ConfigError, Environment, File};
use thiserror::Error;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config/config";
const ENV_PREFIX: &str = "REALTY";

#[derive(Debug, Error)]
pub enum ConfigLoadError {
	#[error("Failed to read configuration: {0}")]
	Source(#[from] ConfigError),

	#[error("Invalid configuration: {0}")]
	Validation(#[from] ConfigValidationError),
}

/// Load and validate settings from the default location and the environment
pub fn load_config() -> Result<Settings, ConfigLoadError> {
	let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
	load_config_from(&path)
}

/// Load and validate settings from `path` (extension optional) and the environment
pub fn load_config_from(path: &str) -> Result<Settings, ConfigLoadError> {
	debug!("Loading configuration from {} and {}__* variables", path, ENV_PREFIX);

	let settings: Settings = Config::builder()
		.add_source(File::with_name(path).required(false))
		.add_source(
			Environment::with_prefix(ENV_PREFIX)
				.prefix_separator("__")
				.separator("__")
				.try_parsing(true),
		)
		.build()?
		.try_deserialize()?;

	settings.validate()?;
	Ok(settings)
}
