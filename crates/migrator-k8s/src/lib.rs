// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! K8s client abstraction for the migrations operator.
//!
//! This crate provides:
//! - A trait-based object store client for testability
//! - Production implementation using the kube crate
//! - An in-memory mock (behind the `mock` feature) that records every call
//! - Selector-based lookup of the migrators governing a pod

mod client;
mod error;
mod kube_client;
mod matching;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{DeletePropagation, K8sClient};
pub use error::K8sError;
pub use kube_client::KubeClient;
pub use matching::{list_matching_migrators, migrator_matches};
