// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Readiness Query client used by injected wait steps.
//!
//! A wait step polls the operator until the migration for its pod's image has
//! been recorded as successful. Any transport failure or non-success answer
//! ends the wait with an error so the kubelet restarts the init container.

use std::time::Duration;

use migrator_api::{ReadyRequest, READY_PATH};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum WaiterError {
	#[error("readiness query failed: {0}")]
	Request(#[from] reqwest::Error),

	#[error("readiness query returned status {status}: {body}")]
	Status { status: u16, body: String },
}

/// Client for the operator's Readiness Query endpoint.
#[derive(Debug, Clone)]
pub struct ReadyClient {
	http: Client,
	url: String,
}

impl ReadyClient {
	/// Client for the operator reachable at `api_hostname` (`host[:port]`).
	pub fn new(api_hostname: &str) -> Self {
		Self {
			http: Client::new(),
			url: format!("http://{api_hostname}{READY_PATH}"),
		}
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Ask once whether the migration in `req` has completed.
	pub async fn is_ready(&self, req: &ReadyRequest) -> Result<bool, WaiterError> {
		let resp = self.http.post(&self.url).json(req).send().await?;
		let status = resp.status();
		let body = resp.text().await?;
		if !status.is_success() {
			return Err(WaiterError::Status {
				status: status.as_u16(),
				body,
			});
		}
		Ok(body == "true")
	}

	/// Poll every `interval` until the migration in `req` has completed.
	pub async fn wait_until_ready(
		&self,
		req: &ReadyRequest,
		interval: Duration,
	) -> Result<(), WaiterError> {
		loop {
			if self.is_ready(req).await? {
				info!(
					image = %req.target_image,
					migrator = %req.migrator_name,
					"Migrations complete"
				);
				return Ok(());
			}
			debug!(
				image = %req.target_image,
				migrator = %req.migrator_name,
				"Migrations not yet complete"
			);
			tokio::time::sleep(interval).await;
		}
	}
}
