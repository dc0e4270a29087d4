// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Layered configuration for the migrations operator.
//!
//! Sources are applied in precedence order: built-in defaults, then the TOML
//! file (`/etc/migrations-operator/config.toml` unless another path is given),
//! then `MIGRATOR_*` environment variables.
//!
//! ```ignore
//! use migrator_config::load_config;
//!
//! let config = load_config()?;
//! println!("Readiness Query on {}", config.http.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::OperatorConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use tracing::{debug, info};

/// Fully resolved operator configuration.
#[derive(Debug, Clone, Default)]
pub struct OperatorConfig {
	pub http: HttpConfig,
	pub webhook: WebhookConfig,
	pub waiter: WaiterConfig,
	pub controller: ControllerConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
pub fn load_config() -> Result<OperatorConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource::process()),
	])
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<OperatorConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource::process()),
	])
}

/// Merge `sources` lowest precedence first and finalize the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<OperatorConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = OperatorConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: OperatorConfigLayer) -> Result<OperatorConfig, ConfigError> {
	let config = OperatorConfig {
		http: layer.http.unwrap_or_default().finalize(),
		webhook: layer.webhook.unwrap_or_default().finalize(),
		waiter: layer.waiter.unwrap_or_default().finalize(),
		controller: layer.controller.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		http = %config.http.socket_addr(),
		webhook_enabled = config.webhook.enabled,
		webhook = %config.webhook.socket_addr(),
		webhook_tls = config.webhook.tls_enabled,
		waiter_image = %config.waiter.image,
		api_hostname = %config.waiter.api_hostname,
		controller_enabled = config.controller.enabled,
		skip_forbidden_owners = config.controller.skip_forbidden_owners,
		"Operator configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &OperatorConfig) -> Result<(), ConfigError> {
	if config.webhook.enabled {
		if config.waiter.image.is_empty() {
			return Err(ConfigError::Validation(
				"the webhook is enabled but no waiter image is set \
				 (MIGRATOR_WAITER_IMAGE or waiter.image)"
					.to_string(),
			));
		}
		if config.waiter.api_hostname.is_empty() {
			return Err(ConfigError::Validation(
				"the webhook is enabled but no API hostname is set \
				 (MIGRATOR_API_HOSTNAME or waiter.api_hostname)"
					.to_string(),
			));
		}
		if config.webhook.tls_enabled
			&& (config.webhook.tls_cert.as_os_str().is_empty()
				|| config.webhook.tls_key.as_os_str().is_empty())
		{
			return Err(ConfigError::Validation(
				"webhook TLS is enabled but the certificate or key path is empty".to_string(),
			));
		}
	}

	Ok(())
}
