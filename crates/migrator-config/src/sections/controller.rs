// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Migrator controller configuration.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
	pub enabled: bool,
	/// Delay before re-examining a migrator whose stale job was just deleted.
	pub stale_requeue: Duration,
	/// Delay before retrying a reconcile that failed.
	pub error_requeue: Duration,
	/// End the owner walk at the last readable object on 403 instead of failing.
	pub skip_forbidden_owners: bool,
}

impl Default for ControllerConfig {
	fn default() -> Self {
		ControllerConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControllerConfigLayer {
	#[serde(default)]
	pub enabled: Option<bool>,
	#[serde(default)]
	pub stale_requeue_ms: Option<u64>,
	#[serde(default)]
	pub error_requeue_secs: Option<u64>,
	#[serde(default)]
	pub skip_forbidden_owners: Option<bool>,
}

impl ControllerConfigLayer {
	pub fn merge(&mut self, other: ControllerConfigLayer) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.stale_requeue_ms.is_some() {
			self.stale_requeue_ms = other.stale_requeue_ms;
		}
		if other.error_requeue_secs.is_some() {
			self.error_requeue_secs = other.error_requeue_secs;
		}
		if other.skip_forbidden_owners.is_some() {
			self.skip_forbidden_owners = other.skip_forbidden_owners;
		}
	}

	pub fn finalize(self) -> ControllerConfig {
		ControllerConfig {
			enabled: self.enabled.unwrap_or(true),
			stale_requeue: Duration::from_millis(self.stale_requeue_ms.unwrap_or(1000)),
			error_requeue: Duration::from_secs(self.error_requeue_secs.unwrap_or(10)),
			skip_forbidden_owners: self.skip_forbidden_owners.unwrap_or(true),
		}
	}
}
