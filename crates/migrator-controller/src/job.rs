// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Migration job synthesis.

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use migrator_api::names::{
	is_wait_step, job_name, MIGRATIONS_LABEL, MIGRATION_CONTAINER_NAME, NOWAIT_MIGRATOR_ANNOTATION,
};
use migrator_api::Migrator;

use crate::error::JobError;

const RESTART_POLICY_NEVER: &str = "Never";

/// A desired migration job together with the image it migrates to.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationJob {
	pub job: Job,
	pub image: String,
}

impl MigrationJob {
	pub fn name(&self) -> String {
		self.job.name_any()
	}
}

/// Image of the first container of a job's pod template, empty when unset.
pub fn job_image(job: &Job) -> &str {
	job
		.spec
		.as_ref()
		.and_then(|s| s.template.spec.as_ref())
		.and_then(|s| s.containers.first())
		.and_then(|c| c.image.as_deref())
		.unwrap_or_default()
}

/// Build the migration job for `migrator` from a resolved pod template.
pub fn synthesize_job(migrator: &Migrator, template: &PodSpec) -> Result<MigrationJob, JobError> {
	let spec = &migrator.spec;

	let mut container = spec
		.container_override()
		.and_then(|name| template.containers.iter().find(|c| c.name == name))
		.or_else(|| template.containers.first())
		.cloned()
		.ok_or(JobError::NoContainers)?;

	container.name = MIGRATION_CONTAINER_NAME.to_string();
	if let Some(image) = spec.image_override() {
		container.image = Some(image.to_string());
	}
	if let Some(command) = spec.command.as_ref().filter(|c| !c.is_empty()) {
		container.command = Some(command.clone());
	}
	if let Some(args) = spec.args.as_ref().filter(|a| !a.is_empty()) {
		container.args = Some(args.clone());
	}
	container.readiness_probe = None;
	container.liveness_probe = None;
	container.startup_probe = None;

	let image = container.image.clone().unwrap_or_default();

	let mut pod_spec = template.clone();
	pod_spec.containers = vec![container];
	pod_spec.restart_policy = Some(RESTART_POLICY_NEVER.to_string());
	pod_spec.init_containers = pod_spec.init_containers.map(|inits| {
		inits
			.into_iter()
			.filter(|c| !is_wait_step(&c.name))
			.collect()
	});

	let mut labels: BTreeMap<String, String> = spec.labels.clone().unwrap_or_default();
	labels.insert(MIGRATIONS_LABEL.to_string(), migrator.name_any());

	let owner = migrator
		.controller_owner_ref(&())
		.ok_or_else(|| JobError::MissingOwner(migrator.name_any()))?;

	let job = Job {
		metadata: ObjectMeta {
			name: Some(job_name(&migrator.name_any())),
			namespace: migrator.namespace(),
			labels: Some(labels.clone()),
			owner_references: Some(vec![owner]),
			..Default::default()
		},
		spec: Some(JobSpec {
			template: PodTemplateSpec {
				metadata: Some(ObjectMeta {
					labels: Some(labels),
					annotations: Some(BTreeMap::from([(
						NOWAIT_MIGRATOR_ANNOTATION.to_string(),
						"true".to_string(),
					)])),
					..Default::default()
				}),
				spec: Some(pod_spec),
			},
			..Default::default()
		}),
		status: None,
	};

	Ok(MigrationJob { job, image })
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::api::core::v1::{Container, Probe};
	use migrator_api::MigratorSpec;

	fn migrator(spec: MigratorSpec) -> Migrator {
		let mut m = Migrator::new("testing", spec);
		m.metadata.namespace = Some("default".to_string());
		m.metadata.uid = Some("migrator-uid".to_string());
		m
	}

	fn container(name: &str, image: &str) -> Container {
		Container {
			name: name.to_string(),
			image: Some(image.to_string()),
			readiness_probe: Some(Probe::default()),
			liveness_probe: Some(Probe::default()),
			startup_probe: Some(Probe::default()),
			..Default::default()
		}
	}

	fn template() -> PodSpec {
		PodSpec {
			containers: vec![container("main", "bar"), container("second", "foo")],
			init_containers: Some(vec![
				container("migrate-wait-testing", "waiter"),
				container("setup", "setup-image"),
			]),
			restart_policy: Some("Always".to_string()),
			service_account_name: Some("web".to_string()),
			..Default::default()
		}
	}

	fn job_pod_spec(job: &MigrationJob) -> &PodSpec {
		job.job.spec.as_ref().unwrap().template.spec.as_ref().unwrap()
	}

	#[test]
	fn test_synthesize_job_defaults_to_first_container() {
		let job = synthesize_job(&migrator(MigratorSpec::default()), &template()).unwrap();
		assert_eq!(job.image, "bar");
		assert_eq!(job.name(), "testing-migrations");
		let spec = job_pod_spec(&job);
		assert_eq!(spec.containers.len(), 1);
		assert_eq!(spec.containers[0].name, "migrations");
		assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
		assert_eq!(spec.service_account_name.as_deref(), Some("web"));
	}

	#[test]
	fn test_synthesize_job_selects_named_container() {
		let spec = MigratorSpec {
			container: Some("second".to_string()),
			..Default::default()
		};
		let job = synthesize_job(&migrator(spec), &template()).unwrap();
		assert_eq!(job.image, "foo");
	}

	#[test]
	fn test_synthesize_job_missing_container_falls_back_to_first() {
		let spec = MigratorSpec {
			container: Some("nope".to_string()),
			..Default::default()
		};
		let job = synthesize_job(&migrator(spec), &template()).unwrap();
		assert_eq!(job.image, "bar");
	}

	#[test]
	fn test_synthesize_job_applies_overrides() {
		let spec = MigratorSpec {
			image: Some("migrate:v2".to_string()),
			command: Some(vec!["rake".to_string()]),
			args: Some(vec!["db:migrate".to_string()]),
			..Default::default()
		};
		let job = synthesize_job(&migrator(spec), &template()).unwrap();
		assert_eq!(job.image, "migrate:v2");
		assert_eq!(job_image(&job.job), "migrate:v2");
		let c = &job_pod_spec(&job).containers[0];
		assert_eq!(c.command.as_deref(), Some(&["rake".to_string()][..]));
		assert_eq!(c.args.as_deref(), Some(&["db:migrate".to_string()][..]));
	}

	#[test]
	fn test_synthesize_job_strips_probes() {
		let job = synthesize_job(&migrator(MigratorSpec::default()), &template()).unwrap();
		let c = &job_pod_spec(&job).containers[0];
		assert!(c.readiness_probe.is_none());
		assert!(c.liveness_probe.is_none());
		assert!(c.startup_probe.is_none());
	}

	#[test]
	fn test_synthesize_job_drops_wait_steps_only() {
		let job = synthesize_job(&migrator(MigratorSpec::default()), &template()).unwrap();
		let inits: Vec<&str> = job_pod_spec(&job)
			.init_containers
			.as_ref()
			.unwrap()
			.iter()
			.map(|c| c.name.as_str())
			.collect();
		assert_eq!(inits, vec!["setup"]);
	}

	#[test]
	fn test_synthesize_job_labels_annotations_and_owner() {
		let spec = MigratorSpec {
			labels: Some(BTreeMap::from([("team".to_string(), "db".to_string())])),
			..Default::default()
		};
		let job = synthesize_job(&migrator(spec), &template()).unwrap();
		let template_meta = job.job.spec.as_ref().unwrap().template.metadata.as_ref().unwrap();
		let labels = template_meta.labels.as_ref().unwrap();
		assert_eq!(labels.get("migrations").map(String::as_str), Some("testing"));
		assert_eq!(labels.get("team").map(String::as_str), Some("db"));
		assert_eq!(
			template_meta
				.annotations
				.as_ref()
				.unwrap()
				.get("migrations.coderanger.net/no-wait")
				.map(String::as_str),
			Some("true")
		);
		let owners = job.job.metadata.owner_references.as_ref().unwrap();
		assert_eq!(owners[0].kind, "Migrator");
		assert_eq!(owners[0].controller, Some(true));
		assert_eq!(job.job.metadata.namespace.as_deref(), Some("default"));
	}

	#[test]
	fn test_synthesize_job_requires_containers() {
		let err = synthesize_job(&migrator(MigratorSpec::default()), &PodSpec::default()).unwrap_err();
		assert!(matches!(err, JobError::NoContainers));
	}

	#[test]
	fn test_synthesize_job_requires_owner_uid() {
		let mut m = migrator(MigratorSpec::default());
		m.metadata.uid = None;
		assert!(matches!(
			synthesize_job(&m, &template()).unwrap_err(),
			JobError::MissingOwner(_)
		));
	}
}
