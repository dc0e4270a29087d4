// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::OperatorConfigLayer;
use crate::sections::{
	ControllerConfigLayer, HttpConfigLayer, LoggingConfigLayer, WaiterConfigLayer,
	WebhookConfigLayer,
};

/// Default location of the operator's config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/migrations-operator/config.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<OperatorConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<OperatorConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(OperatorConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file yields an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<OperatorConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(OperatorConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: OperatorConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `MIGRATOR_<SECTION>_<FIELD>`. The unprefixed variables of
/// earlier releases (`API_LISTEN`, `WAITER_IMAGE`, `API_HOSTNAME`) are read
/// when their prefixed counterparts are unset.
#[derive(Default)]
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Read from the process environment.
	pub fn process() -> Self {
		Self::default()
	}

	/// Read from a fixed set of variables instead of the process environment.
	pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<String>,
	{
		Self {
			vars: Some(
				vars.into_iter()
					.map(|(k, v)| (k.into(), v.into()))
					.collect(),
			),
		}
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn bool(&self, name: &str) -> Result<Option<bool>, ConfigError> {
		match self.var(name) {
			Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => Ok(Some(true)),
			Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => Ok(Some(false)),
			Some(v) => Err(ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid bool value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn u16(&self, name: &str) -> Result<Option<u16>, ConfigError> {
		self.parsed(name, "u16")
	}

	fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		self.parsed(name, "u64")
	}

	fn parsed<T: std::str::FromStr>(
		&self,
		name: &str,
		kind: &str,
	) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {kind} value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn load_http(&self) -> Result<HttpConfigLayer, ConfigError> {
		let (legacy_host, legacy_port) = match self.var("API_LISTEN") {
			Some(listen) => parse_listen("API_LISTEN", &listen)?,
			None => (None, None),
		};
		Ok(HttpConfigLayer {
			host: self.var("MIGRATOR_HTTP_HOST").or(legacy_host),
			port: self.u16("MIGRATOR_HTTP_PORT")?.or(legacy_port),
		})
	}

	fn load_webhook(&self) -> Result<WebhookConfigLayer, ConfigError> {
		Ok(WebhookConfigLayer {
			enabled: self.bool("MIGRATOR_WEBHOOK_ENABLED")?,
			host: self.var("MIGRATOR_WEBHOOK_HOST"),
			port: self.u16("MIGRATOR_WEBHOOK_PORT")?,
			tls_enabled: self.bool("MIGRATOR_WEBHOOK_TLS_ENABLED")?,
			tls_cert: self.var("MIGRATOR_WEBHOOK_TLS_CERT").map(PathBuf::from),
			tls_key: self.var("MIGRATOR_WEBHOOK_TLS_KEY").map(PathBuf::from),
		})
	}

	fn load_waiter(&self) -> WaiterConfigLayer {
		WaiterConfigLayer {
			image: self
				.var("MIGRATOR_WAITER_IMAGE")
				.or_else(|| self.var("WAITER_IMAGE")),
			api_hostname: self
				.var("MIGRATOR_API_HOSTNAME")
				.or_else(|| self.var("API_HOSTNAME")),
			command: self.var("MIGRATOR_WAITER_COMMAND"),
			memory_request: self.var("MIGRATOR_WAITER_MEMORY_REQUEST"),
			cpu_request: self.var("MIGRATOR_WAITER_CPU_REQUEST"),
		}
	}

	fn load_controller(&self) -> Result<ControllerConfigLayer, ConfigError> {
		Ok(ControllerConfigLayer {
			enabled: self.bool("MIGRATOR_CONTROLLER_ENABLED")?,
			stale_requeue_ms: self.u64("MIGRATOR_STALE_REQUEUE_MS")?,
			error_requeue_secs: self.u64("MIGRATOR_ERROR_REQUEUE_SECS")?,
			skip_forbidden_owners: self.bool("MIGRATOR_SKIP_FORBIDDEN_OWNERS")?,
		})
	}

	fn load_logging(&self) -> LoggingConfigLayer {
		LoggingConfigLayer {
			level: self.var("MIGRATOR_LOG_LEVEL"),
		}
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<OperatorConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(OperatorConfigLayer {
			http: Some(self.load_http()?),
			webhook: Some(self.load_webhook()?),
			waiter: Some(self.load_waiter()),
			controller: Some(self.load_controller()?),
			logging: Some(self.load_logging()),
		})
	}
}

/// Split a `[host]:port` listen address.
fn parse_listen(key: &str, listen: &str) -> Result<(Option<String>, Option<u16>), ConfigError> {
	let invalid = || ConfigError::InvalidValue {
		key: key.to_string(),
		message: format!("expected [host]:port, got '{listen}'"),
	};
	let (host, port) = listen.rsplit_once(':').ok_or_else(invalid)?;
	let port = port.parse::<u16>().map_err(|_| invalid())?;
	let host = host.trim_start_matches('[').trim_end_matches(']');
	let host = (!host.is_empty()).then(|| host.to_string());
	Ok((host, Some(port)))
}
