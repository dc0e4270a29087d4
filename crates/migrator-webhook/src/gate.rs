// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::{Container, Pod, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use kube::ResourceExt;
use migrator_api::names::{wait_step_name, NOWAIT_MIGRATOR_ANNOTATION, REQUIRE_MIGRATOR_ANNOTATION};
use migrator_k8s::{list_matching_migrators, K8sClient, K8sError};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::patch::{InitContainerPatch, PatchError};

const NO_MATCHING_MIGRATORS: &str = "no migrators found matching pod";

#[derive(Debug, Error)]
pub enum GateError {
	#[error("error listing matching migrators: {0}")]
	K8s(#[from] K8sError),

	#[error("error building init container patch: {0}")]
	Patch(#[from] PatchError),
}

/// How injected wait steps are built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitStepConfig {
	pub image: String,
	/// Path of the waiter binary inside `image`.
	pub command: String,
	/// `host[:port]` the waiter polls for readiness.
	pub api_hostname: String,
	pub memory_request: String,
	pub cpu_request: String,
}

impl WaitStepConfig {
	/// The wait step for the migrator `namespace`/`name`, blocking on `target_image`.
	pub fn container(&self, target_image: &str, namespace: &str, name: &str) -> Container {
		Container {
			name: wait_step_name(name),
			image: Some(self.image.clone()),
			command: Some(vec![
				self.command.clone(),
				target_image.to_string(),
				namespace.to_string(),
				name.to_string(),
				self.api_hostname.clone(),
			]),
			resources: Some(ResourceRequirements {
				requests: Some(BTreeMap::from([
					("memory".to_string(), Quantity(self.memory_request.clone())),
					("cpu".to_string(), Quantity(self.cpu_request.clone())),
				])),
				..Default::default()
			}),
			..Default::default()
		}
	}
}

/// What to do with an admitted pod.
#[derive(Debug, Clone, PartialEq)]
pub enum AdmissionDecision {
	/// Admit unchanged.
	Allow,
	/// Admit with wait steps appended.
	Patch(json_patch::Patch),
	/// Reject with a message.
	Deny(String),
}

pub struct AdmissionGate {
	client: Arc<dyn K8sClient>,
	config: WaitStepConfig,
}

fn annotation_is_true(pod: &Pod, key: &str) -> bool {
	pod
		.metadata
		.annotations
		.as_ref()
		.and_then(|a| a.get(key))
		.is_some_and(|v| v == "true")
}

/// Image of the container named `container` if the pod has one, else of the
/// first container.
fn observed_image<'a>(pod: &'a Pod, container: Option<&str>) -> &'a str {
	let containers = pod
		.spec
		.as_ref()
		.map(|s| s.containers.as_slice())
		.unwrap_or_default();
	container
		.and_then(|name| containers.iter().find(|c| c.name == name))
		.or_else(|| containers.first())
		.and_then(|c| c.image.as_deref())
		.unwrap_or_default()
}

impl AdmissionGate {
	pub fn new(client: Arc<dyn K8sClient>, config: WaitStepConfig) -> Self {
		Self { client, config }
	}

	/// Decide how to admit `pod` into `namespace`.
	#[instrument(skip(self, pod), fields(pod = %pod.name_any(), namespace = %namespace))]
	pub async fn admit(&self, pod: &Pod, namespace: &str) -> Result<AdmissionDecision, GateError> {
		if annotation_is_true(pod, NOWAIT_MIGRATOR_ANNOTATION) {
			debug!("Skipping migration wait due to annotation");
			return Ok(AdmissionDecision::Allow);
		}

		let migrators =
			list_matching_migrators(self.client.as_ref(), namespace, pod.metadata.labels.as_ref())
				.await?;

		if migrators.is_empty() {
			if annotation_is_true(pod, REQUIRE_MIGRATOR_ANNOTATION) {
				info!("Rejecting pod that requires a migrator");
				return Ok(AdmissionDecision::Deny(NO_MATCHING_MIGRATORS.to_string()));
			}
			return Ok(AdmissionDecision::Allow);
		}

		let mut patch = InitContainerPatch::for_existing(
			pod.spec.as_ref().and_then(|s| s.init_containers.as_deref()),
		);
		for migrator in &migrators {
			let name = migrator.name_any();
			let migrator_namespace = migrator.namespace().unwrap_or_else(|| namespace.to_string());
			if patch.contains(&wait_step_name(&name)) {
				debug!(migrator = %name, "Wait step already present");
				continue;
			}
			let image = observed_image(pod, migrator.spec.container_override());
			patch.append(self.config.container(image, &migrator_namespace, &name))?;
			info!(
				migrator = %format!("{migrator_namespace}/{name}"),
				image = %image,
				"Injecting wait step"
			);
		}

		if patch.is_empty() {
			return Ok(AdmissionDecision::Allow);
		}
		Ok(AdmissionDecision::Patch(patch.build()?))
	}

	/// Answer an admission request for a pod.
	pub async fn review(&self, req: &AdmissionRequest<Pod>) -> AdmissionResponse {
		if req.operation != Operation::Create {
			debug!(operation = ?req.operation, name = %req.name, "Ignoring non-create pod operation");
			return AdmissionResponse::from(req);
		}
		let Some(pod) = req.object.as_ref() else {
			return AdmissionResponse::from(req);
		};
		let namespace = req
			.namespace
			.clone()
			.or_else(|| pod.namespace())
			.unwrap_or_default();

		match self.admit(pod, &namespace).await {
			Ok(AdmissionDecision::Allow) => AdmissionResponse::from(req),
			Ok(AdmissionDecision::Patch(patch)) => match AdmissionResponse::from(req).with_patch(patch) {
				Ok(resp) => resp,
				Err(e) => {
					warn!(error = %e, "Failed to encode admission patch");
					AdmissionResponse::from(req).deny(e.to_string())
				}
			},
			Ok(AdmissionDecision::Deny(reason)) => AdmissionResponse::from(req).deny(reason),
			Err(e) => {
				warn!(error = %e, "Admission failed");
				AdmissionResponse::from(req).deny(e.to_string())
			}
		}
	}
}
