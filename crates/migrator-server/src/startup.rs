// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Conversions from resolved configuration into component settings.

use migrator_config::{ControllerConfig, WaiterConfig};
use migrator_controller::{ReconcilerOptions, ResolverOptions};
use migrator_webhook::WaitStepConfig;

pub fn wait_step_config(waiter: &WaiterConfig) -> WaitStepConfig {
	WaitStepConfig {
		image: waiter.image.clone(),
		command: waiter.command.clone(),
		api_hostname: waiter.api_hostname.clone(),
		memory_request: waiter.memory_request.clone(),
		cpu_request: waiter.cpu_request.clone(),
	}
}

pub fn reconciler_options(controller: &ControllerConfig) -> ReconcilerOptions {
	ReconcilerOptions {
		stale_requeue: controller.stale_requeue,
		resolver: ResolverOptions {
			skip_forbidden_owners: controller.skip_forbidden_owners,
		},
		..Default::default()
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn test_wait_step_config_copies_waiter_settings() {
		let waiter = WaiterConfig {
			image: "waiter:1".to_string(),
			api_hostname: "operator.kube-system:5000".to_string(),
			..Default::default()
		};
		let config = wait_step_config(&waiter);
		assert_eq!(config.image, "waiter:1");
		assert_eq!(config.api_hostname, "operator.kube-system:5000");
		assert_eq!(config.command, "/waiter");
		assert_eq!(config.memory_request, "16M");
		assert_eq!(config.cpu_request, "10m");
	}

	#[test]
	fn test_reconciler_options_from_controller_config() {
		let controller = ControllerConfig {
			stale_requeue: Duration::from_millis(250),
			skip_forbidden_owners: false,
			..Default::default()
		};
		let options = reconciler_options(&controller);
		assert_eq!(options.stale_requeue, Duration::from_millis(250));
		assert_eq!(options.conflict_requeue, Duration::from_secs(1));
		assert!(!options.resolver.skip_forbidden_owners);
	}
}
