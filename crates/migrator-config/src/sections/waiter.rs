// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Settings for the wait step injected into admitted pods.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct WaiterConfig {
	/// Image of the wait step. Must be set when the webhook is enabled.
	pub image: String,
	/// Host (and optional port) of the Readiness Query service, as seen from pods.
	pub api_hostname: String,
	pub command: String,
	pub memory_request: String,
	pub cpu_request: String,
}

impl Default for WaiterConfig {
	fn default() -> Self {
		WaiterConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WaiterConfigLayer {
	#[serde(default)]
	pub image: Option<String>,
	#[serde(default)]
	pub api_hostname: Option<String>,
	#[serde(default)]
	pub command: Option<String>,
	#[serde(default)]
	pub memory_request: Option<String>,
	#[serde(default)]
	pub cpu_request: Option<String>,
}

impl WaiterConfigLayer {
	pub fn merge(&mut self, other: WaiterConfigLayer) {
		if other.image.is_some() {
			self.image = other.image;
		}
		if other.api_hostname.is_some() {
			self.api_hostname = other.api_hostname;
		}
		if other.command.is_some() {
			self.command = other.command;
		}
		if other.memory_request.is_some() {
			self.memory_request = other.memory_request;
		}
		if other.cpu_request.is_some() {
			self.cpu_request = other.cpu_request;
		}
	}

	pub fn finalize(self) -> WaiterConfig {
		WaiterConfig {
			image: self.image.unwrap_or_default(),
			api_hostname: self.api_hostname.unwrap_or_default(),
			command: self.command.unwrap_or_else(|| "/waiter".to_string()),
			memory_request: self.memory_request.unwrap_or_else(|| "16M".to_string()),
			cpu_request: self.cpu_request.unwrap_or_else(|| "10m".to_string()),
		}
	}
}
