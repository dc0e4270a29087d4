// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Template resolution through the controller-owner chain.
//!
//! A pod created by a deployment is owned by a replica set, which is owned by
//! the deployment. The authoritative template is the one on the oldest
//! ancestor that exposes one, so the walk collects the whole chain first and
//! then scans it from the top down.
//!
//! Which kinds expose a template, and where, lives in [`TemplateKinds`]. The
//! walk itself never looks at kinds.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use kube::ResourceExt;
use migrator_k8s::K8sClient;
use tracing::{debug, instrument, warn};

use crate::error::ResolveError;

/// Upper bound on owner hops from a pod.
pub const MAX_OWNER_DEPTH: usize = 16;

/// Capability table: which kinds carry a pod template and where.
///
/// Entries are keyed by API group (empty for the core group) and kind, and map
/// to a JSON pointer into the object's body (everything but `metadata`).
#[derive(Debug, Clone)]
pub struct TemplateKinds {
	paths: HashMap<(String, String), String>,
}

impl Default for TemplateKinds {
	fn default() -> Self {
		let mut kinds = Self {
			paths: HashMap::new(),
		};
		kinds.register("", "Pod", "/spec");
		kinds.register("apps", "Deployment", "/spec/template/spec");
		kinds.register("apps", "ReplicaSet", "/spec/template/spec");
		kinds.register("apps", "StatefulSet", "/spec/template/spec");
		kinds.register("apps", "DaemonSet", "/spec/template/spec");
		kinds.register("batch", "Job", "/spec/template/spec");
		kinds.register("batch", "CronJob", "/spec/jobTemplate/spec/template/spec");
		kinds.register("argoproj.io", "Rollout", "/spec/template/spec");
		kinds
	}
}

impl TemplateKinds {
	/// Register (or replace) where `group`/`kind` keeps its pod template.
	pub fn register(&mut self, group: &str, kind: &str, pointer: &str) -> &mut Self {
		self
			.paths
			.insert((group.to_string(), kind.to_string()), pointer.to_string());
		self
	}

	/// The pod template exposed by `obj`, if its kind has one and it is set.
	pub fn template_for(&self, obj: &DynamicObject) -> Result<Option<PodSpec>, ResolveError> {
		let Some(types) = obj.types.as_ref() else {
			return Ok(None);
		};
		let group = types
			.api_version
			.split_once('/')
			.map(|(group, _)| group)
			.unwrap_or("");
		let Some(pointer) = self.paths.get(&(group.to_string(), types.kind.clone())) else {
			return Ok(None);
		};
		let Some(raw) = obj.data.pointer(pointer) else {
			return Ok(None);
		};
		if raw.is_null() {
			return Ok(None);
		}
		serde_json::from_value(raw.clone())
			.map(Some)
			.map_err(|e| ResolveError::InvalidTemplate {
				kind: types.kind.clone(),
				name: obj.name_any(),
				message: e.to_string(),
			})
	}
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
	/// End the walk at the last readable object when an owner is forbidden.
	pub skip_forbidden_owners: bool,
}

impl Default for ResolverOptions {
	fn default() -> Self {
		Self {
			skip_forbidden_owners: true,
		}
	}
}

/// Walks controller-owner chains through a [`K8sClient`].
#[derive(Clone)]
pub struct TemplateResolver {
	client: Arc<dyn K8sClient>,
	kinds: TemplateKinds,
	options: ResolverOptions,
}

fn controller_of(obj: &DynamicObject) -> Option<&OwnerReference> {
	obj
		.metadata
		.owner_references
		.iter()
		.flatten()
		.find(|r| r.controller == Some(true))
}

impl TemplateResolver {
	pub fn new(client: Arc<dyn K8sClient>, kinds: TemplateKinds, options: ResolverOptions) -> Self {
		Self {
			client,
			kinds,
			options,
		}
	}

	/// Objects from `pod` up its controller-owner chain, oldest ancestor first.
	pub async fn owner_chain(&self, pod: &Pod) -> Result<Vec<DynamicObject>, ResolveError> {
		let namespace = pod.namespace().unwrap_or_default();
		let pod_name = pod.name_any();
		let mut chain: Vec<DynamicObject> = vec![serde_json::from_value(serde_json::to_value(pod)?)?];
		let mut seen: HashSet<(String, String)> = HashSet::new();

		while let Some(owner) = chain.last().and_then(controller_of).cloned() {
			if chain.len() > MAX_OWNER_DEPTH {
				return Err(ResolveError::ChainTooDeep {
					pod: pod_name,
					max: MAX_OWNER_DEPTH,
				});
			}
			if !seen.insert((owner.kind.clone(), owner.name.clone())) {
				return Err(ResolveError::Cycle {
					pod: pod_name,
					kind: owner.kind,
					name: owner.name,
				});
			}

			match self.client.get_owner(&namespace, &owner).await {
				Ok(obj) => {
					debug!(kind = %owner.kind, owner = %owner.name, "Followed controller reference");
					chain.push(obj);
				}
				Err(e) if e.is_forbidden() && self.options.skip_forbidden_owners => {
					warn!(
						pod = %pod_name,
						kind = %owner.kind,
						owner = %owner.name,
						"Owner is not readable, resolving from the readable part of the chain"
					);
					break;
				}
				Err(source) => {
					return Err(ResolveError::OwnerLookup {
						kind: owner.kind,
						name: owner.name,
						source,
					});
				}
			}
		}

		chain.reverse();
		Ok(chain)
	}

	/// The authoritative pod template for `pod`.
	#[instrument(skip(self, pod), fields(pod = %pod.name_any()))]
	pub async fn resolve(&self, pod: &Pod) -> Result<PodSpec, ResolveError> {
		let chain = self.owner_chain(pod).await?;
		for obj in &chain {
			if let Some(spec) = self.kinds.template_for(obj)? {
				debug!(
					kind = %obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or_default(),
					source = %obj.name_any(),
					"Resolved pod template"
				);
				return Ok(spec);
			}
		}
		Err(ResolveError::NoTemplate {
			pod: pod.name_any(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, ReplicaSet, ReplicaSetSpec};
	use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
	use kube::api::ObjectMeta;
	use migrator_k8s::mock::MockK8sClient;

	fn owner_ref(api_version: &str, kind: &str, name: &str, controller: bool) -> OwnerReference {
		OwnerReference {
			api_version: api_version.to_string(),
			kind: kind.to_string(),
			name: name.to_string(),
			uid: format!("{name}-uid"),
			controller: Some(controller),
			..Default::default()
		}
	}

	fn meta(name: &str, owners: Vec<OwnerReference>) -> ObjectMeta {
		ObjectMeta {
			name: Some(name.to_string()),
			namespace: Some("default".to_string()),
			owner_references: if owners.is_empty() { None } else { Some(owners) },
			..Default::default()
		}
	}

	fn pod_spec(image: &str) -> PodSpec {
		PodSpec {
			containers: vec![Container {
				name: "main".to_string(),
				image: Some(image.to_string()),
				..Default::default()
			}],
			..Default::default()
		}
	}

	fn template(image: &str) -> PodTemplateSpec {
		PodTemplateSpec {
			metadata: None,
			spec: Some(pod_spec(image)),
		}
	}

	fn pod(owners: Vec<OwnerReference>, image: &str) -> Pod {
		Pod {
			metadata: meta("web-abc-xyz", owners),
			spec: Some(pod_spec(image)),
			status: None,
		}
	}

	fn replica_set(owners: Vec<OwnerReference>, image: &str) -> ReplicaSet {
		ReplicaSet {
			metadata: meta("web-abc", owners),
			spec: Some(ReplicaSetSpec {
				selector: LabelSelector::default(),
				template: Some(template(image)),
				..Default::default()
			}),
			status: None,
		}
	}

	fn deployment(image: &str) -> Deployment {
		Deployment {
			metadata: meta("web", vec![]),
			spec: Some(DeploymentSpec {
				selector: LabelSelector::default(),
				template: template(image),
				..Default::default()
			}),
			status: None,
		}
	}

	fn image_of(spec: &PodSpec) -> Option<&str> {
		spec.containers.first().and_then(|c| c.image.as_deref())
	}

	fn resolver(client: Arc<MockK8sClient>, options: ResolverOptions) -> TemplateResolver {
		TemplateResolver::new(client, TemplateKinds::default(), options)
	}

	#[tokio::test]
	async fn bare_pod_resolves_to_its_own_spec() {
		let client = Arc::new(MockK8sClient::new());
		let spec = resolver(client, ResolverOptions::default())
			.resolve(&pod(vec![], "myapp:pod"))
			.await
			.unwrap();
		assert_eq!(image_of(&spec), Some("myapp:pod"));
	}

	#[tokio::test]
	async fn deployment_template_wins_over_replica_set() {
		let client = Arc::new(MockK8sClient::new());
		client.insert_owner(&deployment("myapp:v1")).unwrap();
		client
			.insert_owner(&replica_set(
				vec![owner_ref("apps/v1", "Deployment", "web", true)],
				"myapp:rs-local",
			))
			.unwrap();
		let pod = pod(vec![owner_ref("apps/v1", "ReplicaSet", "web-abc", true)], "myapp:pod");

		let spec = resolver(client, ResolverOptions::default())
			.resolve(&pod)
			.await
			.unwrap();
		assert_eq!(image_of(&spec), Some("myapp:v1"));
	}

	#[tokio::test]
	async fn only_controlling_owner_is_followed() {
		let client = Arc::new(MockK8sClient::new());
		client.insert_owner(&deployment("myapp:v1")).unwrap();
		let pod = pod(vec![owner_ref("apps/v1", "Deployment", "web", false)], "myapp:pod");

		let spec = resolver(client.clone(), ResolverOptions::default())
			.resolve(&pod)
			.await
			.unwrap();
		assert_eq!(image_of(&spec), Some("myapp:pod"));
		assert!(client.calls().is_empty());
	}

	#[tokio::test]
	async fn missing_owner_is_a_lookup_error() {
		let client = Arc::new(MockK8sClient::new());
		let pod = pod(vec![owner_ref("apps/v1", "ReplicaSet", "gone", true)], "myapp:pod");
		let err = resolver(client, ResolverOptions::default())
			.resolve(&pod)
			.await
			.unwrap_err();
		assert!(matches!(err, ResolveError::OwnerLookup { ref kind, .. } if kind == "ReplicaSet"));
	}

	#[tokio::test]
	async fn forbidden_owner_falls_back_when_skipping() {
		let client = Arc::new(MockK8sClient::new());
		client.insert_owner(&deployment("myapp:v1")).unwrap();
		client
			.insert_owner(&replica_set(
				vec![owner_ref("apps/v1", "Deployment", "web", true)],
				"myapp:rs-local",
			))
			.unwrap();
		client.forbid_kind("Deployment");
		let pod = pod(vec![owner_ref("apps/v1", "ReplicaSet", "web-abc", true)], "myapp:pod");

		let spec = resolver(client, ResolverOptions::default())
			.resolve(&pod)
			.await
			.unwrap();
		assert_eq!(image_of(&spec), Some("myapp:rs-local"));
	}

	#[tokio::test]
	async fn forbidden_owner_is_fatal_when_not_skipping() {
		let client = Arc::new(MockK8sClient::new());
		client.forbid_kind("ReplicaSet");
		let pod = pod(vec![owner_ref("apps/v1", "ReplicaSet", "web-abc", true)], "myapp:pod");
		let err = resolver(
			client,
			ResolverOptions {
				skip_forbidden_owners: false,
			},
		)
		.resolve(&pod)
		.await
		.unwrap_err();
		match err {
			ResolveError::OwnerLookup { source, .. } => assert!(source.is_forbidden()),
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn cycles_are_detected() {
		let client = Arc::new(MockK8sClient::new());
		let mut rs = replica_set(vec![owner_ref("apps/v1", "ReplicaSet", "web-abc", true)], "x");
		rs.metadata.name = Some("web-abc".to_string());
		client.insert_owner(&rs).unwrap();
		let pod = pod(vec![owner_ref("apps/v1", "ReplicaSet", "web-abc", true)], "myapp:pod");

		let err = resolver(client, ResolverOptions::default())
			.resolve(&pod)
			.await
			.unwrap_err();
		assert!(matches!(err, ResolveError::Cycle { .. }));
	}

	#[tokio::test]
	async fn owner_chain_is_ordered_oldest_first() {
		let client = Arc::new(MockK8sClient::new());
		client.insert_owner(&deployment("myapp:v1")).unwrap();
		client
			.insert_owner(&replica_set(
				vec![owner_ref("apps/v1", "Deployment", "web", true)],
				"myapp:v1",
			))
			.unwrap();
		let pod = pod(vec![owner_ref("apps/v1", "ReplicaSet", "web-abc", true)], "myapp:v1");

		let chain = resolver(client, ResolverOptions::default())
			.owner_chain(&pod)
			.await
			.unwrap();
		let names: Vec<String> = chain.iter().map(|o| o.name_any()).collect();
		assert_eq!(names, vec!["web", "web-abc", "web-abc-xyz"]);
	}

	#[test]
	fn rollout_with_workload_ref_has_no_template() {
		let rollout: DynamicObject = serde_json::from_value(serde_json::json!({
			"apiVersion": "argoproj.io/v1alpha1",
			"kind": "Rollout",
			"metadata": {"name": "web", "namespace": "default"},
			"spec": {"workloadRef": {"apiVersion": "apps/v1", "kind": "Deployment", "name": "web"}}
		}))
		.unwrap();
		assert!(TemplateKinds::default().template_for(&rollout).unwrap().is_none());
	}

	#[test]
	fn cron_job_template_is_nested_in_job_template() {
		let cron: DynamicObject = serde_json::from_value(serde_json::json!({
			"apiVersion": "batch/v1",
			"kind": "CronJob",
			"metadata": {"name": "nightly", "namespace": "default"},
			"spec": {
				"schedule": "0 0 * * *",
				"jobTemplate": {"spec": {"template": {"spec": {
					"containers": [{"name": "main", "image": "myapp:cron"}]
				}}}}
			}
		}))
		.unwrap();
		let spec = TemplateKinds::default().template_for(&cron).unwrap().unwrap();
		assert_eq!(image_of(&spec), Some("myapp:cron"));
	}

	#[test]
	fn registered_kinds_expose_their_template() {
		let widget: DynamicObject = serde_json::from_value(serde_json::json!({
			"apiVersion": "example.com/v1",
			"kind": "Widget",
			"metadata": {"name": "w", "namespace": "default"},
			"spec": {"podTemplate": {"spec": {
				"containers": [{"name": "main", "image": "myapp:widget"}]
			}}}
		}))
		.unwrap();
		let mut kinds = TemplateKinds::default();
		assert!(kinds.template_for(&widget).unwrap().is_none());
		kinds.register("example.com", "Widget", "/spec/podTemplate/spec");
		let spec = kinds.template_for(&widget).unwrap().unwrap();
		assert_eq!(image_of(&spec), Some("myapp:widget"));
	}

	#[test]
	fn unknown_kinds_expose_no_template() {
		let obj: DynamicObject = serde_json::from_value(serde_json::json!({
			"apiVersion": "example.com/v1",
			"kind": "Widget",
			"metadata": {"name": "w"},
			"spec": {"template": {"spec": {"containers": []}}}
		}))
		.unwrap();
		assert!(TemplateKinds::default().template_for(&obj).unwrap().is_none());
	}

	mod proptests {
		use super::*;
		use proptest::prelude::*;

		fn link(index: usize, controlled: bool) -> DynamicObject {
			let owners = if controlled {
				serde_json::json!([{
					"apiVersion": "example.com/v1",
					"kind": "Link",
					"name": format!("link-{}", index + 1),
					"uid": format!("link-{}-uid", index + 1),
					"controller": true
				}])
			} else {
				serde_json::Value::Null
			};
			serde_json::from_value(serde_json::json!({
				"apiVersion": "example.com/v1",
				"kind": "Link",
				"metadata": {
					"name": format!("link-{index}"),
					"namespace": "default",
					"ownerReferences": owners
				},
				"spec": {"template": {"spec": {
					"containers": [{"name": "main", "image": format!("img-{index}")}]
				}}}
			}))
			.unwrap()
		}

		fn resolve_chain(depth: usize) -> Result<PodSpec, ResolveError> {
			let client = Arc::new(MockK8sClient::new());
			for index in 0..depth {
				client.insert_owner(&link(index, index + 1 < depth)).unwrap();
			}
			let owners = if depth == 0 {
				vec![]
			} else {
				vec![owner_ref("example.com/v1", "Link", "link-0", true)]
			};
			let mut kinds = TemplateKinds::default();
			kinds.register("example.com", "Link", "/spec/template/spec");
			let resolver = TemplateResolver::new(client, kinds, ResolverOptions::default());
			tokio::runtime::Builder::new_current_thread()
				.build()
				.unwrap()
				.block_on(resolver.resolve(&pod(owners, "img-pod")))
		}

		proptest! {
			#[test]
			fn oldest_ancestor_wins_until_depth_limit(depth in 0usize..=24) {
				match resolve_chain(depth) {
					Ok(spec) => {
						prop_assert!(depth <= MAX_OWNER_DEPTH);
						let expected = if depth == 0 {
							"img-pod".to_string()
						} else {
							format!("img-{}", depth - 1)
						};
						prop_assert_eq!(image_of(&spec), Some(expected.as_str()));
					}
					Err(ResolveError::ChainTooDeep { max, .. }) => {
						prop_assert!(depth > MAX_OWNER_DEPTH);
						prop_assert_eq!(max, MAX_OWNER_DEPTH);
					}
					Err(other) => prop_assert!(false, "unexpected error: {}", other),
				}
			}
		}
	}
}
