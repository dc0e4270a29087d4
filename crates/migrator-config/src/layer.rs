// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	ControllerConfigLayer, HttpConfigLayer, LoggingConfigLayer, WaiterConfigLayer,
	WebhookConfigLayer,
};

/// Operator configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperatorConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub webhook: Option<WebhookConfigLayer>,
	#[serde(default)]
	pub waiter: Option<WaiterConfigLayer>,
	#[serde(default)]
	pub controller: Option<ControllerConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl OperatorConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: OperatorConfigLayer) {
		merge_option(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_option(&mut self.webhook, other.webhook, WebhookConfigLayer::merge);
		merge_option(&mut self.waiter, other.waiter, WaiterConfigLayer::merge);
		merge_option(
			&mut self.controller,
			other.controller,
			ControllerConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = OperatorConfigLayer::default();
		base.merge(OperatorConfigLayer::default());
		assert!(base.http.is_none());
		assert!(base.waiter.is_none());
	}

	#[test]
	fn test_merge_preserves_base_when_other_empty() {
		let mut base = OperatorConfigLayer {
			http: Some(HttpConfigLayer {
				port: Some(6000),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(OperatorConfigLayer::default());
		assert_eq!(base.http.as_ref().unwrap().port, Some(6000));
	}

	#[test]
	fn test_merge_fills_missing_sections() {
		let mut base = OperatorConfigLayer::default();
		base.merge(OperatorConfigLayer {
			waiter: Some(WaiterConfigLayer {
				image: Some("ghcr.io/example/waiter:1".to_string()),
				..Default::default()
			}),
			..Default::default()
		});
		assert_eq!(
			base.waiter.unwrap().image.as_deref(),
			Some("ghcr.io/example/waiter:1")
		);
	}

	#[test]
	fn test_deserialize_from_toml() {
		let layer: OperatorConfigLayer = toml::from_str(
			r#"
[http]
port = 5001

[controller]
skip_forbidden_owners = false
"#,
		)
		.unwrap();
		assert_eq!(layer.http.unwrap().port, Some(5001));
		assert_eq!(layer.controller.unwrap().skip_forbidden_owners, Some(false));
		assert!(layer.webhook.is_none());
	}
}
