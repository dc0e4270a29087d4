// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;

use kube::ResourceExt;
use migrator_api::{Migrator, Selector};
use tracing::warn;

use crate::client::K8sClient;
use crate::error::K8sError;

/// Whether a migrator's selector matches `labels`.
///
/// A malformed selector never matches; it is logged so the operator can fix
/// the resource.
pub fn migrator_matches(migrator: &Migrator, labels: Option<&BTreeMap<String, String>>) -> bool {
	match Selector::from_label_selector(migrator.spec.selector.as_ref()) {
		Ok(selector) => selector.matches(labels),
		Err(e) => {
			warn!(
				migrator = %migrator.name_any(),
				namespace = ?migrator.namespace(),
				error = %e,
				"Ignoring migrator with invalid selector"
			);
			false
		}
	}
}

/// List the migrators in `namespace` whose selector matches `labels`.
pub async fn list_matching_migrators(
	client: &dyn K8sClient,
	namespace: &str,
	labels: Option<&BTreeMap<String, String>>,
) -> Result<Vec<Migrator>, K8sError> {
	let migrators = client.list_migrators(namespace).await?;
	Ok(
		migrators
			.into_iter()
			.filter(|m| migrator_matches(m, labels))
			.collect(),
	)
}
