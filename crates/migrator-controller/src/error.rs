// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use migrator_api::SelectorError;
use migrator_k8s::K8sError;
use thiserror::Error;

/// Errors raised while walking a pod's owner chain.
#[derive(Debug, Error)]
pub enum ResolveError {
	#[error("error looking up owner {kind} {name}: {source}")]
	OwnerLookup {
		kind: String,
		name: String,
		#[source]
		source: K8sError,
	},

	#[error("owner chain of pod {pod} exceeds {max} hops")]
	ChainTooDeep { pod: String, max: usize },

	#[error("owner chain of pod {pod} revisits {kind} {name}")]
	Cycle {
		pod: String,
		kind: String,
		name: String,
	},

	#[error("invalid pod template on {kind} {name}: {message}")]
	InvalidTemplate {
		kind: String,
		name: String,
		message: String,
	},

	#[error("error finding pod spec for pod {pod}")]
	NoTemplate { pod: String },

	#[error("invalid pod object: {0}")]
	Serialization(#[from] serde_json::Error),
}

/// Errors raised while building a migration job.
#[derive(Debug, Error)]
pub enum JobError {
	#[error("template pod spec has no containers")]
	NoContainers,

	#[error("migrator {0} has no uid to own the migration job")]
	MissingOwner(String),
}

/// Errors surfaced from a reconcile to the controller's error policy.
#[derive(Debug, Error)]
pub enum ReconcileError {
	#[error("invalid {field}: {source}")]
	Selector {
		field: &'static str,
		#[source]
		source: SelectorError,
	},

	#[error("no template pods found for migrator {namespace}/{name}")]
	NoTemplateFound { namespace: String, name: String },

	#[error("migrator {0} has no namespace")]
	MissingNamespace(String),

	#[error("error finding template pod spec: {0}")]
	Resolve(#[from] ResolveError),

	#[error("error building migration job: {0}")]
	Job(#[from] JobError),

	#[error(transparent)]
	K8s(#[from] K8sError),
}

impl ReconcileError {
	/// Errors that only a change to the migrator itself can fix.
	pub fn needs_spec_change(&self) -> bool {
		matches!(self, ReconcileError::Selector { .. })
	}
}
