// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Status changes produced by a reconcile cycle.

use chrono::{DateTime, Utc};
use migrator_api::condition::set_condition;
use migrator_api::names::{MigrationReason, MIGRATIONS_READY_CONDITION, READY_CONDITION};
use migrator_api::{Condition, ConditionStatus, MigratorStatus};

/// Everything one reconcile cycle wants to change on a migrator's status.
///
/// The decision procedure only builds this value; the caller applies it once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPatch {
	pub conditions: Vec<Condition>,
	pub last_successful_migration: Option<String>,
}

impl StatusPatch {
	/// A patch setting the `MigrationsReady` condition and its `Ready` mirror.
	pub fn ready(status: ConditionStatus, reason: MigrationReason, message: impl Into<String>) -> Self {
		let migrations_ready = Condition::new(MIGRATIONS_READY_CONDITION, status, reason.as_str(), message);
		let ready = Condition {
			type_: READY_CONDITION.to_string(),
			..migrations_ready.clone()
		};
		Self {
			conditions: vec![migrations_ready, ready],
			last_successful_migration: None,
		}
	}

	pub fn with_last_successful_migration(mut self, image: impl Into<String>) -> Self {
		self.last_successful_migration = Some(image.into());
		self
	}

	/// The status that results from applying this patch to `base`.
	pub fn apply_to(&self, base: Option<&MigratorStatus>, now: DateTime<Utc>) -> MigratorStatus {
		let mut status = base.cloned().unwrap_or_default();
		for condition in &self.conditions {
			set_condition(&mut status.conditions, condition.clone(), now);
		}
		if let Some(image) = &self.last_successful_migration {
			status.last_successful_migration = Some(image.clone());
		}
		status
	}
}
