// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use kube::runtime::reflector::ObjectRef;
use kube::ResourceExt;
use migrator_api::Migrator;
use migrator_k8s::migrator_matches;

/// Migrators to reconcile when `pod` changes: those in the pod's namespace
/// whose selector matches its labels.
pub fn migrators_for_pod(pod: &Pod, migrators: &[Arc<Migrator>]) -> Vec<ObjectRef<Migrator>> {
	let namespace = pod.namespace();
	migrators
		.iter()
		.filter(|m| m.namespace() == namespace)
		.filter(|m| migrator_matches(m, pod.metadata.labels.as_ref()))
		.map(|m| ObjectRef::from_obj(m.as_ref()))
		.collect()
}
