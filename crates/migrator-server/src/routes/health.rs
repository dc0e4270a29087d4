// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

/// GET /healthz - liveness probe for both listeners.
pub async fn healthz() -> &'static str {
	"ok"
}
