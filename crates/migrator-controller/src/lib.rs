// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Reconciliation of `Migrator` resources.
//!
//! For every migrator the controller finds a representative pod, walks its
//! controller-owner chain to the authoritative pod template, synthesizes the
//! migration job for the desired image and drives that job to completion,
//! recording the outcome on the `MigrationsReady` condition.

pub mod controller;
pub mod error;
pub mod job;
pub mod reconcile;
pub mod resolver;
pub mod status;
pub mod watch;

pub use controller::{run, Context};
pub use error::{JobError, ReconcileError, ResolveError};
pub use job::{synthesize_job, MigrationJob};
pub use reconcile::{Decision, MigrationState, Reconciler, ReconcilerOptions, Requeue};
pub use resolver::{ResolverOptions, TemplateKinds, TemplateResolver};
pub use status::StatusPatch;
pub use watch::migrators_for_pod;
