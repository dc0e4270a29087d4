// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared API surface for the migrations operator.
//!
//! This crate provides:
//! - The `Migrator` custom resource and its status/conditions
//! - Well-known annotation, label and naming constants
//! - Equality-based label selector matching
//! - The Readiness Query request type shared by the server and the waiter

pub mod condition;
pub mod migrator;
pub mod names;
pub mod readiness;
pub mod selector;

pub use condition::{Condition, ConditionStatus};
pub use migrator::{Migrator, MigratorSpec, MigratorStatus};
pub use readiness::{ReadyRequest, READY_PATH};
pub use selector::{matches, Selector, SelectorError};
