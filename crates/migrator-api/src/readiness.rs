// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Readiness Query wire format.

use serde::{Deserialize, Serialize};

/// Path the Readiness Query is served on.
pub const READY_PATH: &str = "/api/ready";

/// Body of a Readiness Query request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyRequest {
	pub target_image: String,
	pub migrator_namespace: String,
	pub migrator_name: String,
}
