// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Admission webhook listener configuration.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_CERT_DIR: &str = "/tmp/k8s-webhook-server/serving-certs";

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
	pub enabled: bool,
	pub host: String,
	pub port: u16,
	pub tls_enabled: bool,
	pub tls_cert: PathBuf,
	pub tls_key: PathBuf,
}

impl WebhookConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.host, self.port)
	}
}

impl Default for WebhookConfig {
	fn default() -> Self {
		WebhookConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub host: Option<String>,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub tls_enabled: Option<bool>,
	#[serde(default)]
	pub tls_cert: Option<PathBuf>,
	#[serde(default)]
	pub tls_key: Option<PathBuf>,
}

impl WebhookConfigLayer {
	pub fn merge(&mut self, other: WebhookConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.tls_enabled.is_some() {
			self.tls_enabled = other.tls_enabled;
		}
		if other.tls_cert.is_some() {
			self.tls_cert = other.tls_cert;
		}
		if other.tls_key.is_some() {
			self.tls_key = other.tls_key;
		}
	}

	pub fn finalize(self) -> WebhookConfig {
		WebhookConfig {
			enabled: self.enabled.unwrap_or(true),
			host: self.host.unwrap_or_else(|| "0.0.0.0".to_string()),
			port: self.port.unwrap_or(9443),
			tls_enabled: self.tls_enabled.unwrap_or(true),
			tls_cert: self
				.tls_cert
				.unwrap_or_else(|| PathBuf::from(DEFAULT_CERT_DIR).join("tls.crt")),
			tls_key: self
				.tls_key
				.unwrap_or_else(|| PathBuf::from(DEFAULT_CERT_DIR).join("tls.key")),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = WebhookConfig::default();
		assert!(config.enabled);
		assert!(config.tls_enabled);
		assert_eq!(config.socket_addr(), "0.0.0.0:9443");
		assert_eq!(
			config.tls_cert,
			PathBuf::from("/tmp/k8s-webhook-server/serving-certs/tls.crt")
		);
		assert_eq!(
			config.tls_key,
			PathBuf::from("/tmp/k8s-webhook-server/serving-certs/tls.key")
		);
	}

	#[test]
	fn test_merge_overwrites() {
		let mut base = WebhookConfigLayer {
			port: Some(8443),
			tls_enabled: Some(true),
			..Default::default()
		};
		base.merge(WebhookConfigLayer {
			tls_enabled: Some(false),
			..Default::default()
		});
		let config = base.finalize();
		assert_eq!(config.port, 8443);
		assert!(!config.tls_enabled);
	}
}
