// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Well-known names shared by the controller, the admission gate and the waiter.

/// Pods annotated with this set to `"true"` must match at least one migrator.
pub const REQUIRE_MIGRATOR_ANNOTATION: &str = "migrations.coderanger.net/required";

/// Pods annotated with this set to `"true"` are admitted without wait steps.
pub const NOWAIT_MIGRATOR_ANNOTATION: &str = "migrations.coderanger.net/no-wait";

/// Label placed on migration jobs and their pods, valued with the migrator name.
pub const MIGRATIONS_LABEL: &str = "migrations";

/// Condition type carrying the readiness signal.
pub const MIGRATIONS_READY_CONDITION: &str = "MigrationsReady";

/// Generic readiness condition, kept in step with [`MIGRATIONS_READY_CONDITION`].
pub const READY_CONDITION: &str = "Ready";

/// Name of the single container inside a migration job.
pub const MIGRATION_CONTAINER_NAME: &str = "migrations";

const JOB_NAME_SUFFIX: &str = "-migrations";
const WAIT_STEP_PREFIX: &str = "migrate-wait-";

/// Deterministic job name for a migrator.
pub fn job_name(migrator_name: &str) -> String {
	format!("{migrator_name}{JOB_NAME_SUFFIX}")
}

/// Init container name injected for a migrator.
pub fn wait_step_name(migrator_name: &str) -> String {
	format!("{WAIT_STEP_PREFIX}{migrator_name}")
}

/// Whether an init container name belongs to an injected wait step.
pub fn is_wait_step(container_name: &str) -> bool {
	container_name.starts_with(WAIT_STEP_PREFIX)
}

/// Reasons recorded on the `MigrationsReady` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationReason {
	UpToDate,
	Running,
	StaleJob,
	Succeeded,
	Failed,
	CreateError,
}

impl MigrationReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			MigrationReason::UpToDate => "MigrationsUpToDate",
			MigrationReason::Running => "MigrationsRunning",
			MigrationReason::StaleJob => "StaleJob",
			MigrationReason::Succeeded => "MigrationsSucceeded",
			MigrationReason::Failed => "MigrationsFailed",
			MigrationReason::CreateError => "CreateError",
		}
	}
}

impl std::fmt::Display for MigrationReason {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn job_and_wait_step_names_derive_from_migrator() {
		assert_eq!(job_name("testing"), "testing-migrations");
		assert_eq!(wait_step_name("testing"), "migrate-wait-testing");
		assert!(is_wait_step("migrate-wait-testing"));
		assert!(!is_wait_step("init"));
	}

	#[test]
	fn reasons_render_as_condition_reasons() {
		assert_eq!(MigrationReason::StaleJob.to_string(), "StaleJob");
		assert_eq!(MigrationReason::Running.as_str(), "MigrationsRunning");
	}
}
