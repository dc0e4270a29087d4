// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory `K8sClient` for tests.
//!
//! Objects live in per-kind maps keyed by `(namespace, name)`. Every trait call
//! is appended to a call log so tests can assert exactly which reads and writes
//! a reconcile performed.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use kube::ResourceExt;
use migrator_api::{Migrator, MigratorStatus};
use serde::Serialize;

use crate::client::{DeletePropagation, K8sClient};
use crate::error::K8sError;

type Key = (String, String);

/// A recorded trait call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
	ListPods { namespace: String },
	ListMigrators { namespace: String },
	GetMigrator { namespace: String, name: String },
	PatchMigratorStatus { namespace: String, name: String },
	GetJob { namespace: String, name: String },
	CreateJob { namespace: String, name: String },
	DeleteJob {
		namespace: String,
		name: String,
		propagation: DeletePropagation,
	},
	GetOwner {
		namespace: String,
		kind: String,
		name: String,
	},
}

#[derive(Default)]
pub struct MockK8sClient {
	pods: Mutex<BTreeMap<Key, Pod>>,
	migrators: Mutex<BTreeMap<Key, Migrator>>,
	jobs: Mutex<BTreeMap<Key, Job>>,
	owners: Mutex<BTreeMap<(String, String, String), DynamicObject>>,
	forbidden_kinds: Mutex<HashSet<String>>,
	conflict_on_create: Mutex<bool>,
	calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
	m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key(namespace: &str, name: &str) -> Key {
	(namespace.to_string(), name.to_string())
}

fn namespace_of<K: ResourceExt>(obj: &K) -> String {
	obj.namespace().unwrap_or_else(|| "default".to_string())
}

impl MockK8sClient {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert_pod(&self, pod: Pod) {
		lock(&self.pods).insert(key(&namespace_of(&pod), &pod.name_any()), pod);
	}

	pub fn insert_migrator(&self, migrator: Migrator) {
		lock(&self.migrators).insert(key(&namespace_of(&migrator), &migrator.name_any()), migrator);
	}

	pub fn insert_job(&self, job: Job) {
		lock(&self.jobs).insert(key(&namespace_of(&job), &job.name_any()), job);
	}

	/// Register an object that owner references can resolve to.
	pub fn insert_owner<K>(&self, obj: &K) -> Result<(), K8sError>
	where
		K: ResourceExt + Serialize,
	{
		let dynamic: DynamicObject = serde_json::from_value(serde_json::to_value(obj)?)?;
		let kind = dynamic
			.types
			.as_ref()
			.map(|t| t.kind.clone())
			.unwrap_or_default();
		lock(&self.owners).insert((namespace_of(obj), kind, obj.name_any()), dynamic);
		Ok(())
	}

	/// Make every owner lookup of `kind` fail with `Forbidden`.
	pub fn forbid_kind(&self, kind: &str) {
		lock(&self.forbidden_kinds).insert(kind.to_string());
	}

	/// Make the next job creations fail with `Conflict`.
	pub fn set_conflict_on_create(&self, conflict: bool) {
		*lock(&self.conflict_on_create) = conflict;
	}

	pub fn migrator(&self, namespace: &str, name: &str) -> Option<Migrator> {
		lock(&self.migrators).get(&key(namespace, name)).cloned()
	}

	pub fn job(&self, namespace: &str, name: &str) -> Option<Job> {
		lock(&self.jobs).get(&key(namespace, name)).cloned()
	}

	pub fn jobs(&self) -> Vec<Job> {
		lock(&self.jobs).values().cloned().collect()
	}

	pub fn calls(&self) -> Vec<MockCall> {
		lock(&self.calls).clone()
	}

	pub fn clear_calls(&self) {
		lock(&self.calls).clear();
	}

	fn record(&self, call: MockCall) {
		lock(&self.calls).push(call);
	}
}

#[async_trait]
impl K8sClient for MockK8sClient {
	async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, K8sError> {
		self.record(MockCall::ListPods {
			namespace: namespace.to_string(),
		});
		Ok(
			lock(&self.pods)
				.iter()
				.filter(|((ns, _), _)| ns == namespace)
				.map(|(_, pod)| pod.clone())
				.collect(),
		)
	}

	async fn list_migrators(&self, namespace: &str) -> Result<Vec<Migrator>, K8sError> {
		self.record(MockCall::ListMigrators {
			namespace: namespace.to_string(),
		});
		Ok(
			lock(&self.migrators)
				.iter()
				.filter(|((ns, _), _)| ns == namespace)
				.map(|(_, m)| m.clone())
				.collect(),
		)
	}

	async fn get_migrator(&self, namespace: &str, name: &str) -> Result<Migrator, K8sError> {
		self.record(MockCall::GetMigrator {
			namespace: namespace.to_string(),
			name: name.to_string(),
		});
		lock(&self.migrators)
			.get(&key(namespace, name))
			.cloned()
			.ok_or_else(|| K8sError::NotFound {
				kind: "Migrator".into(),
				name: name.into(),
			})
	}

	async fn patch_migrator_status(
		&self,
		namespace: &str,
		name: &str,
		status: &MigratorStatus,
	) -> Result<(), K8sError> {
		self.record(MockCall::PatchMigratorStatus {
			namespace: namespace.to_string(),
			name: name.to_string(),
		});
		let mut migrators = lock(&self.migrators);
		let migrator = migrators
			.get_mut(&key(namespace, name))
			.ok_or_else(|| K8sError::NotFound {
				kind: "Migrator".into(),
				name: name.into(),
			})?;
		migrator.status = Some(status.clone());
		Ok(())
	}

	async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, K8sError> {
		self.record(MockCall::GetJob {
			namespace: namespace.to_string(),
			name: name.to_string(),
		});
		lock(&self.jobs)
			.get(&key(namespace, name))
			.cloned()
			.ok_or_else(|| K8sError::NotFound {
				kind: "Job".into(),
				name: name.into(),
			})
	}

	async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job, K8sError> {
		let name = job.name_any();
		self.record(MockCall::CreateJob {
			namespace: namespace.to_string(),
			name: name.clone(),
		});
		let mut jobs = lock(&self.jobs);
		if *lock(&self.conflict_on_create) || jobs.contains_key(&key(namespace, &name)) {
			return Err(K8sError::Conflict {
				kind: "Job".into(),
				name,
			});
		}
		let mut created = job.clone();
		created.metadata.namespace = Some(namespace.to_string());
		jobs.insert(key(namespace, &name), created.clone());
		Ok(created)
	}

	async fn delete_job(
		&self,
		namespace: &str,
		name: &str,
		propagation: DeletePropagation,
	) -> Result<(), K8sError> {
		self.record(MockCall::DeleteJob {
			namespace: namespace.to_string(),
			name: name.to_string(),
			propagation,
		});
		lock(&self.jobs)
			.remove(&key(namespace, name))
			.map(|_| ())
			.ok_or_else(|| K8sError::NotFound {
				kind: "Job".into(),
				name: name.into(),
			})
	}

	async fn get_owner(
		&self,
		namespace: &str,
		owner: &OwnerReference,
	) -> Result<DynamicObject, K8sError> {
		self.record(MockCall::GetOwner {
			namespace: namespace.to_string(),
			kind: owner.kind.clone(),
			name: owner.name.clone(),
		});
		if lock(&self.forbidden_kinds).contains(&owner.kind) {
			return Err(K8sError::Forbidden {
				kind: owner.kind.clone(),
				name: owner.name.clone(),
			});
		}
		lock(&self.owners)
			.get(&(namespace.to_string(), owner.kind.clone(), owner.name.clone()))
			.cloned()
			.ok_or_else(|| K8sError::NotFound {
				kind: owner.kind.clone(),
				name: owner.name.clone(),
			})
	}
}
