//! Startup and shutdown banners for the realty aggregator

use crate::{Credentials, Settings};
use std::env;
use tracing::{info, warn};

/// Log service, platform and provider information at startup
pub fn log_service_info(settings: &Settings) {
	let service_name = "realty-aggregator";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Realty Aggregator Starting ===");
	info!("🚀 Service: {} v{}", service_name, service_version);
	info!("💻 Platform: {} / {}", env::consts::OS, env::consts::ARCH);

	if let Ok(cwd) = env::current_dir() {
		info!("📁 Working Directory: {}", cwd.display());
	}
	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("🔧 Log Level: {} (RUST_LOG)", rust_log);
	}
	if let Ok(config_path) = env::var("CONFIG_PATH") {
		info!("📋 Config Path: {}", config_path);
	}

	match &settings.provider.credentials {
		Some(Credentials::Phone { password, .. }) => {
			info!("🔑 Provider login: phone, password from {}", password.description());
			if password.is_inline() {
				warn!("Provider password is stored inline in the configuration file");
			}
		},
		Some(Credentials::ClientCredentials { client_id, client_secret }) => {
			info!(
				"🔑 Provider login: client '{}', secret from {}",
				client_id,
				client_secret.description()
			);
			if client_secret.is_inline() {
				warn!("Provider client secret is stored inline in the configuration file");
			}
		},
		None => warn!("No provider credentials configured, requests are sent unauthenticated"),
	}

	if let Some(city) = &settings.provider.city {
		info!("🏙️ Default city: {}", city);
	}
	for (kind, domain) in &settings.provider.domain_overrides {
		info!("🌐 {} served from {}", kind, domain);
	}

	info!(
		"⚙️ Fan-out: {} concurrent requests, {}ms deadline, {}ms per request, {} attempts",
		settings.aggregation.concurrency,
		settings.aggregation.deadline_ms,
		settings.timeouts.request_ms,
		settings.retry.max_attempts
	);
	info!(
		"🕒 Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Log that the aggregator is ready
pub fn log_startup_complete(kinds: usize) {
	info!("✅ Realty Aggregator ready, {} entity kinds routed", kinds);
}

/// Log service shutdown information
pub fn log_service_shutdown() {
	info!("🛑 Realty Aggregator shutting down");
	info!(
		"🕒 Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}
