// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP surfaces and start-up wiring of the migrations operator.
//!
//! Two listeners are served: a plain HTTP one answering Readiness Queries from
//! wait steps, and a TLS one receiving pod admission reviews from the API
//! server.

pub mod api;
pub mod error;
pub mod routes;
pub mod startup;
pub mod tls;

pub use api::{create_api_router, create_webhook_router, ApiState, WebhookState};
pub use error::ServerError;
pub use startup::{reconciler_options, wait_step_config};
