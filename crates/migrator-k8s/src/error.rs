// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Errors that can occur during K8s operations.
#[derive(Error, Debug)]
pub enum K8sError {
	#[error("K8s API error: {message}")]
	ApiError { message: String },

	#[error("{kind} not found: {name}")]
	NotFound { kind: String, name: String },

	#[error("{kind} {name} already exists or was modified concurrently")]
	Conflict { kind: String, name: String },

	#[error("access to {kind} {name} is forbidden")]
	Forbidden { kind: String, name: String },

	#[error("invalid object: {message}")]
	InvalidObject { message: String },
}

impl K8sError {
	/// Map a kube error for a named object, classifying the status codes the
	/// operator reacts to.
	pub(crate) fn for_object(err: kube::Error, kind: &str, name: &str) -> Self {
		match err {
			kube::Error::Api(resp) if resp.code == 404 => K8sError::NotFound {
				kind: kind.into(),
				name: name.into(),
			},
			kube::Error::Api(resp) if resp.code == 409 => K8sError::Conflict {
				kind: kind.into(),
				name: name.into(),
			},
			kube::Error::Api(resp) if resp.code == 403 => K8sError::Forbidden {
				kind: kind.into(),
				name: name.into(),
			},
			other => other.into(),
		}
	}

	pub fn is_not_found(&self) -> bool {
		matches!(self, K8sError::NotFound { .. })
	}

	pub fn is_conflict(&self) -> bool {
		matches!(self, K8sError::Conflict { .. })
	}

	pub fn is_forbidden(&self) -> bool {
		matches!(self, K8sError::Forbidden { .. })
	}
}

impl From<kube::Error> for K8sError {
	fn from(err: kube::Error) -> Self {
		K8sError::ApiError {
			message: err.to_string(),
		}
	}
}

impl From<serde_json::Error> for K8sError {
	fn from(err: serde_json::Error) -> Self {
		K8sError::InvalidObject {
			message: err.to_string(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use kube::core::ErrorResponse;

	fn api_error(code: u16) -> kube::Error {
		kube::Error::Api(ErrorResponse {
			status: "Failure".to_string(),
			message: "boom".to_string(),
			reason: "Test".to_string(),
			code,
		})
	}

	#[test]
	fn classifies_status_codes() {
		assert!(K8sError::for_object(api_error(404), "Job", "x").is_not_found());
		assert!(K8sError::for_object(api_error(409), "Job", "x").is_conflict());
		assert!(K8sError::for_object(api_error(403), "ReplicaSet", "x").is_forbidden());
		assert!(matches!(
			K8sError::for_object(api_error(500), "Job", "x"),
			K8sError::ApiError { .. }
		));
	}

	#[test]
	fn not_found_message_names_kind_and_object() {
		let err = K8sError::for_object(api_error(404), "Migrator", "testing");
		assert_eq!(err.to_string(), "Migrator not found: testing");
	}
}
