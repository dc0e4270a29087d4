// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Pod admission handler.

use axum::{body::Bytes, extract::State, Json};
use k8s_openapi::api::core::v1::Pod;
use kube::core::{
	admission::{AdmissionRequest, AdmissionResponse, AdmissionReview},
	DynamicObject,
};
use tracing::{instrument, warn};

use crate::api::WebhookState;

/// POST /mutate-v1-pod - inject wait steps into a pod being created.
///
/// Reviews that cannot be decoded are answered with an invalid response
/// rather than an HTTP error so the API server sees the reason.
#[instrument(skip_all)]
pub async fn mutate_pod(
	State(state): State<WebhookState>,
	body: Bytes,
) -> Json<AdmissionReview<DynamicObject>> {
	let review: AdmissionReview<Pod> = match serde_json::from_slice(&body) {
		Ok(review) => review,
		Err(e) => {
			warn!(error = %e, "Malformed admission review");
			return Json(AdmissionResponse::invalid(e.to_string()).into_review());
		}
	};
	let req: AdmissionRequest<Pod> = match review.try_into() {
		Ok(req) => req,
		Err(e) => {
			warn!(error = %e, "Admission review without request");
			return Json(AdmissionResponse::invalid(e.to_string()).into_review());
		}
	};

	Json(state.gate.review(&req).await.into_review())
}
