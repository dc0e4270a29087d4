// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use migrator_api::{Migrator, MigratorStatus};

use crate::error::K8sError;

/// How dependents of a deleted job are cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePropagation {
	/// Dependents are removed before the job itself disappears.
	Foreground,
	/// The job disappears immediately and dependents are collected later.
	Background,
}

/// Trait for K8s client operations.
///
/// This is the object store seam: the state machine, the admission gate and
/// the readiness query only talk to the cluster through it, so tests can swap
/// in an in-memory implementation.
#[async_trait]
pub trait K8sClient: Send + Sync {
	/// List every pod in a namespace.
	async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sError>;

	/// List every migrator in a namespace.
	async fn list_migrators(&self, namespace: &str) -> Result<Vec<Migrator>, K8sError>;

	/// Read a migrator straight from the API server, bypassing any cache.
	async fn get_migrator(&self, namespace: &str, name: &str) -> Result<Migrator, K8sError>;

	/// Replace the status subresource of a migrator.
	async fn patch_migrator_status(
		&self,
		namespace: &str,
		name: &str,
		status: &MigratorStatus,
	) -> Result<(), K8sError>;

	async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, K8sError>;

	/// Create a job. An existing job with the same name yields `K8sError::Conflict`.
	async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, K8sError>;

	async fn delete_job(
		&self,
		namespace: &str,
		name: &str,
		propagation: DeletePropagation,
	) -> Result<(), K8sError>;

	/// Fetch the object an owner reference points at, whatever its kind.
	async fn get_owner(
		&self,
		namespace: &str,
		owner: &OwnerReference,
	) -> Result<DynamicObject, K8sError>;
}
