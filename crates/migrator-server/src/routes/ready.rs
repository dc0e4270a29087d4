// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Readiness Query handler.

use axum::{
	body::Bytes,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use migrator_api::ReadyRequest;
use tracing::{debug, instrument};

use crate::api::ApiState;
use crate::error::ServerError;

/// POST /api/ready - whether the migration for an image has completed.
///
/// Answers with a plain-text `true` or `false`. A migrator that does not exist
/// is reported as not ready. Malformed bodies are rejected with 400 and the
/// decode error as body.
#[instrument(skip_all)]
pub async fn migration_ready(State(state): State<ApiState>, body: Bytes) -> Response {
	let req: ReadyRequest = match serde_json::from_slice(&body) {
		Ok(req) => req,
		Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
	};

	match is_ready(&state, &req).await {
		Ok(ready) => ready.to_string().into_response(),
		Err(e) => e.into_response(),
	}
}

async fn is_ready(state: &ApiState, req: &ReadyRequest) -> Result<bool, ServerError> {
	let migrator = match state
		.client
		.get_migrator(&req.migrator_namespace, &req.migrator_name)
		.await
	{
		Ok(migrator) => migrator,
		Err(e) if e.is_not_found() => {
			debug!(
				namespace = %req.migrator_namespace,
				migrator = %req.migrator_name,
				"Readiness query for unknown migrator"
			);
			return Ok(false);
		}
		Err(e) => return Err(e.into()),
	};

	let ready = migrator.is_migrated(&req.target_image);
	debug!(
		namespace = %req.migrator_namespace,
		migrator = %req.migrator_name,
		image = %req.target_image,
		ready,
		"Answered readiness query"
	);
	Ok(ready)
}
