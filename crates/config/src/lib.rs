//! Realty Configuration
//!
//! Layered settings (config file plus `REALTY__` environment variables),
//! credential values and startup logging for the realty aggregator.

pub mod configurable_value;
pub mod loader;
pub mod settings;
pub mod startup_logger;

pub use configurable_value::{ConfigurableValue, ConfigurableValueError, ValueType};
pub use loader::{load_config, load_config_from, ConfigLoadError};
pub use settings::{
	AggregationSettings, CacheSettings, ConfigValidationError, Credentials, LogFormat,
	LoggingSettings, ProviderSettings, RetrySettings, Settings, TimeoutSettings,
};
pub use startup_logger::{log_service_info, log_service_shutdown, log_startup_complete};
