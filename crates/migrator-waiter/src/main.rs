// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wait step binary injected into pods governed by a migrator.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use migrator_api::ReadyRequest;
use migrator_waiter::{ReadyClient, DEFAULT_POLL_INTERVAL};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Block until the migrations for an image have completed.
#[derive(Parser, Debug)]
#[command(name = "waiter", version)]
struct Args {
	/// Image whose migrations must have completed.
	target_image: String,
	/// Namespace of the governing migrator.
	migrator_namespace: String,
	/// Name of the governing migrator.
	migrator_name: String,
	/// `host[:port]` of the operator's readiness API.
	api_hostname: String,
	/// Seconds between readiness queries.
	#[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
	interval_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let client = ReadyClient::new(&args.api_hostname);
	let req = ReadyRequest {
		target_image: args.target_image,
		migrator_namespace: args.migrator_namespace,
		migrator_name: args.migrator_name,
	};
	tracing::info!(
		url = %client.url(),
		image = %req.target_image,
		namespace = %req.migrator_namespace,
		migrator = %req.migrator_name,
		"Waiting for migrations"
	);

	match client
		.wait_until_ready(&req, Duration::from_secs(args.interval_secs))
		.await
	{
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			tracing::error!(error = %e, "Waiting for migrations failed");
			ExitCode::FAILURE
		}
	}
}
