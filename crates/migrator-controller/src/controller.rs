// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wiring of the reconciler into `kube::runtime`.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Api, Client, ResourceExt};
use migrator_api::Migrator;
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::reconcile::{Reconciler, Requeue};
use crate::watch::migrators_for_pod;

/// Shared state handed to every reconcile.
pub struct Context {
	pub reconciler: Reconciler,
	/// Delay before retrying a failed reconcile.
	pub error_requeue: Duration,
}

async fn reconcile(migrator: Arc<Migrator>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
	let decision = ctx.reconciler.reconcile(&migrator).await?;
	debug!(
		migrator = %migrator.name_any(),
		state = ?decision.state,
		"Reconciled migrator"
	);
	Ok(match decision.requeue {
		Requeue::Never => Action::await_change(),
		Requeue::After(delay) => Action::requeue(delay),
	})
}

fn error_policy(migrator: Arc<Migrator>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
	warn!(
		migrator = %migrator.name_any(),
		namespace = ?migrator.namespace(),
		error = %err,
		"Reconcile failed"
	);
	if err.needs_spec_change() {
		Action::await_change()
	} else {
		Action::requeue(ctx.error_requeue)
	}
}

/// Run the migrator controller until a shutdown signal arrives.
///
/// Reconciles are triggered by migrator changes, by status changes of the jobs
/// they own and by changes to any pod their selector matches.
pub async fn run(client: Client, ctx: Context) {
	let migrators: Api<Migrator> = Api::all(client.clone());
	let jobs: Api<Job> = Api::all(client.clone());
	let pods: Api<Pod> = Api::all(client);

	let controller = Controller::new(migrators, watcher::Config::default());
	let store = controller.store();

	info!("Starting migrator controller");
	controller
		.owns(jobs, watcher::Config::default())
		.watches(pods, watcher::Config::default(), move |pod| {
			migrators_for_pod(&pod, &store.state())
		})
		.shutdown_on_signal()
		.run(reconcile, error_policy, Arc::new(ctx))
		.for_each(|result| async move {
			match result {
				Ok((obj, _)) => debug!(migrator = %obj.name, "Reconcile finished"),
				Err(e) => warn!(error = %e, "Controller error"),
			}
		})
		.await;
	info!("Migrator controller stopped");
}
