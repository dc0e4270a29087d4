// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The `Migrator` custom resource.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::condition::{find_condition, Condition, ConditionStatus};
use crate::names;

/// Desired configuration of a migrator.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
	group = "migrations.coderanger.net",
	version = "v1beta1",
	kind = "Migrator",
	namespaced,
	status = "MigratorStatus",
	derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct MigratorSpec {
	/// Pods governed by this migrator. Absent matches every pod in the namespace.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub selector: Option<LabelSelector>,
	/// Which governed pod to use as the job template. Absent matches all.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub template_selector: Option<LabelSelector>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub command: Option<Vec<String>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub args: Option<Vec<String>>,
	/// Container to treat as the migration target. Empty means the first one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub container: Option<String>,
	/// Extra labels applied to the migration job and its pod.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub labels: Option<BTreeMap<String, String>>,
}

/// Observed state of a migrator.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MigratorStatus {
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub conditions: Vec<Condition>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub last_successful_migration: Option<String>,
}

impl MigratorStatus {
	pub fn condition(&self, type_: &str) -> Option<&Condition> {
		find_condition(&self.conditions, type_)
	}

	pub fn ready_condition(&self) -> Option<&Condition> {
		self.condition(names::MIGRATIONS_READY_CONDITION)
	}

	/// Whether both readiness conditions are `True`.
	pub fn is_ready(&self) -> bool {
		[names::MIGRATIONS_READY_CONDITION, names::READY_CONDITION]
			.iter()
			.all(|t| self.condition(t).is_some_and(|c| c.status == ConditionStatus::True))
	}
}

impl MigratorSpec {
	/// Configured container override, treating an empty string as unset.
	pub fn container_override(&self) -> Option<&str> {
		self.container.as_deref().filter(|c| !c.is_empty())
	}

	/// Configured image override, treating an empty string as unset.
	pub fn image_override(&self) -> Option<&str> {
		self.image.as_deref().filter(|i| !i.is_empty())
	}
}

impl Migrator {
	/// Image recorded by the last successful migration, if any.
	pub fn last_successful_migration(&self) -> Option<&str> {
		self
			.status
			.as_ref()
			.and_then(|s| s.last_successful_migration.as_deref())
	}

	/// Whether the migration for `image` is known to have completed.
	pub fn is_migrated(&self, image: &str) -> bool {
		self.last_successful_migration() == Some(image)
	}
}
