// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
};
use migrator_config::ConfigError;
use migrator_k8s::K8sError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error(transparent)]
	K8s(#[from] K8sError),

	#[error("TLS setup failed for {path}: {message}")]
	Tls { path: String, message: String },

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		error!(error = %self, "Request failed");
		(StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
	}
}
