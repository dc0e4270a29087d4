// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod controller;
mod http;
mod logging;
mod waiter;
mod webhook;

pub use controller::{ControllerConfig, ControllerConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use waiter::{WaiterConfig, WaiterConfigLayer};
pub use webhook::{WebhookConfig, WebhookConfigLayer};
