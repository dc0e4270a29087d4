// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The migration state machine.
//!
//! One cycle per migrator:
//!
//! 1. Find the governed pods and the template pod among them.
//! 2. Resolve the authoritative pod template and synthesize the desired job.
//! 3. Re-read the migrator uncached; stop if its last successful migration
//!    already matches the desired image.
//! 4. Otherwise drive the job named after the migrator: create it, replace it
//!    when stale, retire it on success, or leave it in place on failure.
//!
//! Job side effects happen during the cycle. Status changes are collected in a
//! [`StatusPatch`] and written once at the end, so an early return never
//! leaves a half-updated status behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use migrator_api::names::MigrationReason;
use migrator_api::{ConditionStatus, Migrator, MigratorStatus, Selector};
use migrator_k8s::{DeletePropagation, K8sClient};
use tracing::{debug, info, instrument, warn};

use crate::error::ReconcileError;
use crate::job::{job_image, synthesize_job, MigrationJob};
use crate::resolver::{ResolverOptions, TemplateKinds, TemplateResolver};
use crate::status::StatusPatch;

const DEFAULT_STALE_REQUEUE: Duration = Duration::from_secs(1);
const DEFAULT_CONFLICT_REQUEUE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
	/// Delay before recreating a job after deleting a stale one.
	pub stale_requeue: Duration,
	/// Delay before retrying after losing a job creation race.
	pub conflict_requeue: Duration,
	pub resolver: ResolverOptions,
}

impl Default for ReconcilerOptions {
	fn default() -> Self {
		Self {
			stale_requeue: DEFAULT_STALE_REQUEUE,
			conflict_requeue: DEFAULT_CONFLICT_REQUEUE,
			resolver: ResolverOptions::default(),
		}
	}
}

/// Where a reconcile cycle ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationState {
	/// No pod matches the selector.
	NoPods,
	/// The migrator disappeared before the uncached read.
	Gone,
	/// The desired image was already migrated.
	UpToDate,
	Created,
	/// Another reconcile created the job first.
	CreateConflict,
	StaleReplaced,
	Succeeded,
	Failed,
	Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
	Never,
	After(Duration),
}

/// Outcome of one cycle: the state reached and the status change to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
	pub state: MigrationState,
	pub patch: StatusPatch,
	/// Status the patch applies to, taken from the uncached read.
	pub base: Option<MigratorStatus>,
	pub requeue: Requeue,
}

impl Decision {
	fn noop(state: MigrationState) -> Self {
		Self {
			state,
			patch: StatusPatch::default(),
			base: None,
			requeue: Requeue::Never,
		}
	}
}

pub struct Reconciler {
	client: Arc<dyn K8sClient>,
	resolver: TemplateResolver,
	options: ReconcilerOptions,
}

impl Reconciler {
	pub fn new(client: Arc<dyn K8sClient>, options: ReconcilerOptions) -> Self {
		Self::with_kinds(client, TemplateKinds::default(), options)
	}

	pub fn with_kinds(
		client: Arc<dyn K8sClient>,
		kinds: TemplateKinds,
		options: ReconcilerOptions,
	) -> Self {
		let resolver = TemplateResolver::new(client.clone(), kinds, options.resolver.clone());
		Self {
			client,
			resolver,
			options,
		}
	}

	/// Run one cycle and write the resulting status.
	#[instrument(skip(self, migrator), fields(migrator = %migrator.name_any(), namespace = ?migrator.namespace()))]
	pub async fn reconcile(&self, migrator: &Migrator) -> Result<Decision, ReconcileError> {
		let decision = self.decide(migrator).await?;
		self.apply(migrator, &decision).await?;
		Ok(decision)
	}

	/// Write the decision's status patch. Returns whether anything was written.
	pub async fn apply(&self, migrator: &Migrator, decision: &Decision) -> Result<bool, ReconcileError> {
		if decision.patch == StatusPatch::default() {
			return Ok(false);
		}
		let updated = decision.patch.apply_to(decision.base.as_ref(), Utc::now());
		if decision.base.as_ref() == Some(&updated) {
			debug!("Status unchanged, skipping write");
			return Ok(false);
		}
		let name = migrator.name_any();
		let namespace = migrator
			.namespace()
			.ok_or_else(|| ReconcileError::MissingNamespace(name.clone()))?;
		self
			.client
			.patch_migrator_status(&namespace, &name, &updated)
			.await?;
		Ok(true)
	}

	/// Run the decision procedure, performing job side effects.
	pub async fn decide(&self, migrator: &Migrator) -> Result<Decision, ReconcileError> {
		let name = migrator.name_any();
		let namespace = migrator
			.namespace()
			.ok_or_else(|| ReconcileError::MissingNamespace(name.clone()))?;

		let selector = Selector::from_label_selector(migrator.spec.selector.as_ref())
			.map_err(|source| ReconcileError::Selector {
				field: "selector",
				source,
			})?;
		let template_selector =
			Selector::from_label_selector(migrator.spec.template_selector.as_ref()).map_err(
				|source| ReconcileError::Selector {
					field: "templateSelector",
					source,
				},
			)?;

		let pods = self.client.list_pods(&namespace).await?;
		let Some(template_pod) = pick_template_pod(&pods, &selector, &template_selector) else {
			debug!("No pods match selector");
			return Ok(Decision::noop(MigrationState::NoPods));
		};
		let template_pod = template_pod.ok_or_else(|| ReconcileError::NoTemplateFound {
			namespace: namespace.clone(),
			name: name.clone(),
		})?;

		let template = self.resolver.resolve(template_pod).await?;
		let desired = synthesize_job(migrator, &template)?;

		// The cached object can lag behind a success recorded by the previous
		// cycle, so the up-to-date check reads from the API server.
		let latest = match self.client.get_migrator(&namespace, &name).await {
			Ok(latest) => latest,
			Err(e) if e.is_not_found() => {
				debug!("Migrator deleted during reconcile");
				return Ok(Decision::noop(MigrationState::Gone));
			}
			Err(e) => return Err(e.into()),
		};
		let base = latest.status.clone();

		if latest.is_migrated(&desired.image) {
			let already_ready = base.as_ref().is_some_and(MigratorStatus::is_ready);
			let patch = if already_ready {
				StatusPatch::default()
			} else {
				StatusPatch::ready(
					ConditionStatus::True,
					MigrationReason::UpToDate,
					format!("Migration {} already run", desired.image),
				)
			};
			return Ok(Decision {
				state: MigrationState::UpToDate,
				patch,
				base,
				requeue: Requeue::Never,
			});
		}

		let job_name = desired.name();
		let existing = match self.client.get_job(&namespace, &job_name).await {
			Ok(job) => job,
			Err(e) if e.is_not_found() => return self.create_job(&namespace, desired, base).await,
			Err(e) => return Err(e.into()),
		};

		let existing_image = job_image(&existing).to_string();
		if existing_image.is_empty() || existing_image != desired.image {
			self
				.delete_job(&namespace, &job_name, DeletePropagation::Foreground)
				.await?;
			info!(
				job = %job_name,
				image = %existing_image,
				desired = %desired.image,
				"Deleted stale migration job"
			);
			return Ok(Decision {
				state: MigrationState::StaleReplaced,
				patch: StatusPatch::ready(
					ConditionStatus::False,
					MigrationReason::StaleJob,
					format!("Deleted stale migration job {namespace}/{job_name} ({existing_image})"),
				),
				base,
				requeue: Requeue::After(self.options.stale_requeue),
			});
		}

		let job_status = existing.status.as_ref();
		let succeeded = job_status.and_then(|s| s.succeeded).unwrap_or(0);
		let failed = job_status.and_then(|s| s.failed).unwrap_or(0);

		if succeeded > 0 {
			self
				.delete_job(&namespace, &job_name, DeletePropagation::Background)
				.await?;
			info!(job = %job_name, image = %existing_image, "Migration job succeeded");
			return Ok(Decision {
				state: MigrationState::Succeeded,
				patch: StatusPatch::ready(
					ConditionStatus::True,
					MigrationReason::Succeeded,
					format!(
						"Migration job {namespace}/{job_name} using image {existing_image} succeeded"
					),
				)
				.with_last_successful_migration(desired.image),
				base,
				requeue: Requeue::Never,
			});
		}

		if failed > 0 {
			warn!(job = %job_name, image = %existing_image, "Migration job failed");
			return Ok(Decision {
				state: MigrationState::Failed,
				patch: StatusPatch::ready(
					ConditionStatus::False,
					MigrationReason::Failed,
					format!("Migration job {namespace}/{job_name} using image {existing_image} failed"),
				),
				base,
				requeue: Requeue::Never,
			});
		}

		Ok(Decision {
			state: MigrationState::Running,
			patch: StatusPatch::ready(
				ConditionStatus::False,
				MigrationReason::Running,
				format!(
					"Migration job {namespace}/{job_name} using image {existing_image} still running"
				),
			),
			base,
			requeue: Requeue::Never,
		})
	}

	async fn create_job(
		&self,
		namespace: &str,
		desired: MigrationJob,
		base: Option<MigratorStatus>,
	) -> Result<Decision, ReconcileError> {
		let job_name = desired.name();
		match self.client.create_job(namespace, &desired.job).await {
			Ok(_) => {
				info!(job = %job_name, image = %desired.image, "Started migration job");
				Ok(Decision {
					state: MigrationState::Created,
					patch: StatusPatch::ready(
						ConditionStatus::False,
						MigrationReason::Running,
						format!(
							"Started migration job {namespace}/{job_name} using image {}",
							desired.image
						),
					),
					base,
					requeue: Requeue::Never,
				})
			}
			Err(e) if e.is_conflict() => {
				warn!(job = %job_name, error = %e, "Migration job creation conflicted");
				Ok(Decision {
					state: MigrationState::CreateConflict,
					patch: StatusPatch::ready(
						ConditionStatus::Unknown,
						MigrationReason::CreateError,
						format!("Error on create, possible conflict: {e}"),
					),
					base,
					requeue: Requeue::After(self.options.conflict_requeue),
				})
			}
			Err(e) => Err(e.into()),
		}
	}

	async fn delete_job(
		&self,
		namespace: &str,
		name: &str,
		propagation: DeletePropagation,
	) -> Result<(), ReconcileError> {
		match self.client.delete_job(namespace, name, propagation).await {
			Ok(()) => Ok(()),
			Err(e) if e.is_not_found() => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}

/// Partition pods into governed ones and pick the first template candidate.
///
/// `None` means no pod is governed; `Some(None)` means pods are governed but
/// none matches the template selector.
fn pick_template_pod<'a>(
	pods: &'a [Pod],
	selector: &Selector,
	template_selector: &Selector,
) -> Option<Option<&'a Pod>> {
	let mut governed = pods
		.iter()
		.filter(|p| selector.matches(p.metadata.labels.as_ref()))
		.peekable();
	governed.peek()?;
	Some(governed.find(|p| template_selector.matches(p.metadata.labels.as_ref())))
}
