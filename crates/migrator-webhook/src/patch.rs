// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Typed JSON patches over a pod's init container list.
//!
//! Only `add` operations are ever produced, so fields of existing init
//! containers (including ones this crate does not model) are never rewritten.

use std::collections::HashSet;

use k8s_openapi::api::core::v1::Container;
use serde_json::{json, Value};
use thiserror::Error;

const INIT_CONTAINERS_PATH: &str = "/spec/initContainers";
const INIT_CONTAINERS_APPEND_PATH: &str = "/spec/initContainers/-";

#[derive(Debug, Error)]
pub enum PatchError {
	#[error("init container name must not be empty")]
	EmptyName,

	#[error("init container {0} has no image")]
	MissingImage(String),

	#[error("init container {0} is already present")]
	DuplicateName(String),

	#[error("error serializing patch: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// One operation on `/spec/initContainers`.
#[derive(Debug, Clone, PartialEq)]
pub enum InitContainerOp {
	/// Create an empty list where there was none.
	CreateList,
	/// Append a container to the end of the list.
	Append(Container),
}

impl InitContainerOp {
	fn to_json(&self) -> Result<Value, PatchError> {
		Ok(match self {
			InitContainerOp::CreateList => json!({
				"op": "add",
				"path": INIT_CONTAINERS_PATH,
				"value": [],
			}),
			InitContainerOp::Append(container) => json!({
				"op": "add",
				"path": INIT_CONTAINERS_APPEND_PATH,
				"value": serde_json::to_value(container)?,
			}),
		})
	}
}

/// Builder for an append-only init container patch.
#[derive(Debug, Clone, Default)]
pub struct InitContainerPatch {
	list_exists: bool,
	names: HashSet<String>,
	appended: Vec<Container>,
}

impl InitContainerPatch {
	/// Start a patch against a pod whose current init containers are `existing`.
	pub fn for_existing(existing: Option<&[Container]>) -> Self {
		Self {
			list_exists: existing.is_some(),
			names: existing
				.into_iter()
				.flatten()
				.map(|c| c.name.clone())
				.collect(),
			appended: Vec::new(),
		}
	}

	/// Whether an init container named `name` exists or is queued.
	pub fn contains(&self, name: &str) -> bool {
		self.names.contains(name)
	}

	/// Queue `container` for appending, validating it first.
	pub fn append(&mut self, container: Container) -> Result<&mut Self, PatchError> {
		if container.name.is_empty() {
			return Err(PatchError::EmptyName);
		}
		if container.image.as_deref().map_or(true, str::is_empty) {
			return Err(PatchError::MissingImage(container.name));
		}
		if !self.names.insert(container.name.clone()) {
			return Err(PatchError::DuplicateName(container.name));
		}
		self.appended.push(container);
		Ok(self)
	}

	pub fn is_empty(&self) -> bool {
		self.appended.is_empty()
	}

	/// The operations this patch consists of, in application order.
	pub fn operations(&self) -> Vec<InitContainerOp> {
		let mut ops = Vec::with_capacity(self.appended.len() + 1);
		if !self.list_exists && !self.appended.is_empty() {
			ops.push(InitContainerOp::CreateList);
		}
		ops.extend(self.appended.iter().cloned().map(InitContainerOp::Append));
		ops
	}

	/// Serialize into an RFC 6902 patch.
	pub fn build(&self) -> Result<json_patch::Patch, PatchError> {
		let ops = self
			.operations()
			.iter()
			.map(InitContainerOp::to_json)
			.collect::<Result<Vec<_>, _>>()?;
		Ok(serde_json::from_value(Value::Array(ops))?)
	}
}
