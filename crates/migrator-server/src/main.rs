// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Migrations operator binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use migrator_api::Migrator;
use migrator_config::OperatorConfig;
use migrator_controller::{Context, Reconciler};
use migrator_k8s::{K8sClient, KubeClient};
use migrator_server::{
	create_api_router, create_webhook_router, reconciler_options, tls, wait_step_config, ApiState,
	ServerError, WebhookState,
};
use migrator_webhook::AdmissionGate;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Runs database migrations ahead of application rollouts.
#[derive(Parser, Debug)]
#[command(name = "migrations-operator", version)]
struct Args {
	/// Path to a TOML config file.
	#[arg(long, env = "MIGRATOR_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the Migrator CustomResourceDefinition as JSON
	Crd,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Crd) = args.command {
		println!("{}", serde_json::to_string_pretty(&Migrator::crd())?);
		return Ok(());
	}

	let config = match &args.config {
		Some(path) => migrator_config::load_config_with_file(path)?,
		None => migrator_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		http = %config.http.socket_addr(),
		webhook_enabled = config.webhook.enabled,
		controller_enabled = config.controller.enabled,
		"starting migrations-operator"
	);

	let kube = KubeClient::new().await?;
	let client: Arc<dyn K8sClient> = Arc::new(kube.clone());

	tokio::try_join!(
		serve_api(&config, client.clone()),
		serve_webhook(&config, client.clone()),
		run_controller(&config, kube, client),
	)?;

	tracing::info!("Shutdown complete");
	Ok(())
}

async fn serve_api(config: &OperatorConfig, client: Arc<dyn K8sClient>) -> Result<(), ServerError> {
	let addr = config.http.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;
	tracing::info!("Readiness API listening on {}", addr);
	axum::serve(listener, create_api_router(ApiState { client }))
		.with_graceful_shutdown(shutdown_signal())
		.await?;
	Ok(())
}

async fn serve_webhook(
	config: &OperatorConfig,
	client: Arc<dyn K8sClient>,
) -> Result<(), ServerError> {
	if !config.webhook.enabled {
		tracing::info!("Admission webhook disabled");
		return Ok(());
	}

	let gate = AdmissionGate::new(client, wait_step_config(&config.waiter));
	let app = create_webhook_router(WebhookState {
		gate: Arc::new(gate),
	});
	let addr = config.webhook.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	if config.webhook.tls_enabled {
		let tls_config = tls::load_server_config(&config.webhook.tls_cert, &config.webhook.tls_key)?;
		tracing::info!("Admission webhook listening on {} (TLS)", addr);
		tls::serve_tls(listener, tls_config, app, shutdown_signal()).await
	} else {
		tracing::warn!("Admission webhook listening on {} without TLS", addr);
		axum::serve(listener, app)
			.with_graceful_shutdown(shutdown_signal())
			.await?;
		Ok(())
	}
}

async fn run_controller(
	config: &OperatorConfig,
	kube: KubeClient,
	client: Arc<dyn K8sClient>,
) -> Result<(), ServerError> {
	if !config.controller.enabled {
		tracing::info!("Migrator controller disabled");
		return Ok(());
	}

	let ctx = Context {
		reconciler: Reconciler::new(client, reconciler_options(&config.controller)),
		error_requeue: config.controller.error_requeue,
	};
	migrator_controller::run(kube.client(), ctx).await;
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "Failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(e) => {
				tracing::error!(error = %e, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
	tracing::info!("Received shutdown signal");
}
