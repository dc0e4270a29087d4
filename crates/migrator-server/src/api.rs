// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Router construction.

use std::sync::Arc;

use axum::{
	routing::{get, post},
	Router,
};
use migrator_api::READY_PATH;
use migrator_k8s::K8sClient;
use migrator_webhook::AdmissionGate;
use tower_http::trace::TraceLayer;

use crate::routes::{admission, health, ready};

/// Path the API server posts pod admission reviews to.
pub const MUTATE_POD_PATH: &str = "/mutate-v1-pod";
pub const HEALTH_PATH: &str = "/healthz";

/// State of the Readiness Query listener.
#[derive(Clone)]
pub struct ApiState {
	pub client: Arc<dyn K8sClient>,
}

/// State of the admission webhook listener.
#[derive(Clone)]
pub struct WebhookState {
	pub gate: Arc<AdmissionGate>,
}

/// Router for the plain HTTP listener.
pub fn create_api_router(state: ApiState) -> Router {
	Router::new()
		.route(READY_PATH, post(ready::migration_ready))
		.route(HEALTH_PATH, get(health::healthz))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

/// Router for the TLS admission listener.
pub fn create_webhook_router(state: WebhookState) -> Router {
	Router::new()
		.route(MUTATE_POD_PATH, post(admission::mutate_pod))
		.route(HEALTH_PATH, get(health::healthz))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}
