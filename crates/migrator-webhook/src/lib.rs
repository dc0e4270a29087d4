// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Admission gate for pods governed by migrators.
//!
//! Every admitted pod matched by one or more migrators gets one wait step per
//! migrator appended to its init containers. The wait step blocks pod start-up
//! until the migration for the pod's image has been recorded as successful.

pub mod gate;
pub mod patch;

pub use gate::{AdmissionDecision, AdmissionGate, GateError, WaitStepConfig};
pub use patch::{InitContainerOp, InitContainerPatch, PatchError};
