// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{
	api::{
		Api, ApiResource, DeleteParams, DynamicObject, GroupVersionKind, ListParams, Patch,
		PatchParams, PostParams, PropagationPolicy,
	},
	Client,
};
use migrator_api::{Migrator, MigratorStatus};
use serde_json::json;
use tracing::{debug, instrument};

use crate::client::{DeletePropagation, K8sClient};
use crate::error::K8sError;

/// Production K8s client implementation using the kube crate.
#[derive(Clone)]
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> Result<Self, K8sError> {
		let client = Client::try_default().await?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	pub fn from_client(client: Client) -> Self {
		Self { client }
	}

	/// The underlying kube client, for wiring watchers and controllers.
	pub fn client(&self) -> Client {
		self.client.clone()
	}
}

/// Split an `apiVersion` into group and version. The core group is empty.
pub(crate) fn parse_api_version(api_version: &str) -> (&str, &str) {
	match api_version.split_once('/') {
		Some((group, version)) => (group, version),
		None => ("", api_version),
	}
}

#[async_trait]
impl K8sClient for KubeClient {
	async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sError> {
		let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
		let pod_list = pods.list(&ListParams::default()).await?;
		Ok(pod_list.items)
	}

	async fn list_migrators(&self, namespace: &str) -> Result<Vec<Migrator>, K8sError> {
		let migrators: Api<Migrator> = Api::namespaced(self.client.clone(), namespace);
		let list = migrators.list(&ListParams::default()).await?;
		Ok(list.items)
	}

	async fn get_migrator(&self, namespace: &str, name: &str) -> Result<Migrator, K8sError> {
		let migrators: Api<Migrator> = Api::namespaced(self.client.clone(), namespace);
		migrators
			.get(name)
			.await
			.map_err(|e| K8sError::for_object(e, "Migrator", name))
	}

	#[instrument(skip(self, status), fields(namespace = %namespace, migrator = %name))]
	async fn patch_migrator_status(
		&self,
		namespace: &str,
		name: &str,
		status: &MigratorStatus,
	) -> Result<(), K8sError> {
		let migrators: Api<Migrator> = Api::namespaced(self.client.clone(), namespace);
		let patch = json!({ "status": status });
		migrators
			.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
			.await
			.map_err(|e| K8sError::for_object(e, "Migrator", name))?;
		Ok(())
	}

	async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, K8sError> {
		let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
		jobs
			.get(name)
			.await
			.map_err(|e| K8sError::for_object(e, "Job", name))
	}

	async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, K8sError> {
		let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
		let name = job.metadata.name.clone().unwrap_or_default();
		jobs
			.create(&PostParams::default(), job)
			.await
			.map_err(|e| K8sError::for_object(e, "Job", &name))
	}

	async fn delete_job(
		&self,
		namespace: &str,
		name: &str,
		propagation: DeletePropagation,
	) -> Result<(), K8sError> {
		let jobs: Api<Job> = Api::namespaced(self.client.clone(), namespace);
		let dp = DeleteParams {
			propagation_policy: Some(match propagation {
				DeletePropagation::Foreground => PropagationPolicy::Foreground,
				DeletePropagation::Background => PropagationPolicy::Background,
			}),
			..Default::default()
		};
		jobs
			.delete(name, &dp)
			.await
			.map_err(|e| K8sError::for_object(e, "Job", name))?;
		Ok(())
	}

	async fn get_owner(
		&self,
		namespace: &str,
		owner: &OwnerReference,
	) -> Result<DynamicObject, K8sError> {
		let (group, version) = parse_api_version(&owner.api_version);
		let gvk = GroupVersionKind::gvk(group, version, &owner.kind);
		let resource = ApiResource::from_gvk(&gvk);
		let api: Api<DynamicObject> =
			Api::namespaced_with(self.client.clone(), namespace, &resource);
		api
			.get(&owner.name)
			.await
			.map_err(|e| K8sError::for_object(e, &owner.kind, &owner.name))
	}
}
