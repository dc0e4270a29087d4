// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Status conditions for the `Migrator` resource.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tri-state condition status, serialized the Kubernetes way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ConditionStatus {
	True,
	False,
	Unknown,
}

/// A single named condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
	#[serde(rename = "type")]
	pub type_: String,
	pub status: ConditionStatus,
	#[serde(default)]
	pub reason: String,
	#[serde(default)]
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
	pub fn new(
		type_: impl Into<String>,
		status: ConditionStatus,
		reason: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			type_: type_.into(),
			status,
			reason: reason.into(),
			message: message.into(),
			last_transition_time: None,
		}
	}
}

/// Insert or update a condition, keeping the list deduplicated by type.
///
/// The transition time only moves when the status changes. Returns true when
/// anything in the list changed.
pub fn set_condition(conditions: &mut Vec<Condition>, update: Condition, now: DateTime<Utc>) -> bool {
	match conditions.iter_mut().find(|c| c.type_ == update.type_) {
		Some(existing) => {
			let mut changed = false;
			if existing.status != update.status {
				existing.status = update.status;
				existing.last_transition_time = Some(now);
				changed = true;
			}
			if existing.reason != update.reason {
				existing.reason = update.reason;
				changed = true;
			}
			if existing.message != update.message {
				existing.message = update.message;
				changed = true;
			}
			changed
		}
		None => {
			conditions.push(Condition {
				last_transition_time: Some(now),
				..update
			});
			true
		}
	}
}

/// Find a condition by type.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
	conditions.iter().find(|c| c.type_ == type_)
}
