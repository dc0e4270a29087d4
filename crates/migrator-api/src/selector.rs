// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Equality-based label selector matching.
//!
//! A selector is a conjunction of `key=value` requirements. An absent or empty
//! selector matches everything. Set-based `matchExpressions` are not supported
//! and are rejected when the selector is parsed. Matching itself is done by
//! kube's [`kube::core::Selector`].

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::SelectorExt;
use thiserror::Error;

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
	#[error("invalid label key {key:?}: {reason}")]
	InvalidKey { key: String, reason: String },

	#[error("invalid label value {value:?} for key {key:?}: {reason}")]
	InvalidValue {
		key: String,
		value: String,
		reason: String,
	},

	#[error("matchExpressions are not supported (key {key:?})")]
	UnsupportedExpression { key: String },
}

/// A parsed, validated equality selector.
#[derive(Debug, Clone, Default)]
pub struct Selector {
	inner: kube::core::Selector,
}

impl Selector {
	/// Selector that matches every label set.
	pub fn everything() -> Self {
		Self::default()
	}

	/// Parse a Kubernetes `LabelSelector`, validating every key and value.
	pub fn from_label_selector(selector: Option<&LabelSelector>) -> Result<Self, SelectorError> {
		let Some(selector) = selector else {
			return Ok(Self::everything());
		};

		if let Some(expr) = selector.match_expressions.as_ref().and_then(|e| e.first()) {
			return Err(SelectorError::UnsupportedExpression {
				key: expr.key.clone(),
			});
		}

		let mut requirements = Vec::new();
		for (key, value) in selector.match_labels.iter().flatten() {
			validate_key(key)?;
			validate_value(key, value)?;
			requirements.push((key.clone(), value.clone()));
		}
		Ok(Self {
			inner: requirements.into_iter().collect(),
		})
	}

	/// True when every requirement is present and equal in `labels`.
	pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
		match labels {
			Some(labels) => self.inner.matches(labels),
			None => self.inner.matches(&BTreeMap::new()),
		}
	}
}

/// Parse `selector` and evaluate it against `labels` in one step.
pub fn matches(
	selector: Option<&LabelSelector>,
	labels: Option<&BTreeMap<String, String>>,
) -> Result<bool, SelectorError> {
	Ok(Selector::from_label_selector(selector)?.matches(labels))
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
	let invalid = |reason: &str| SelectorError::InvalidKey {
		key: key.to_string(),
		reason: reason.to_string(),
	};

	let name = match key.split_once('/') {
		Some((prefix, name)) => {
			if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN {
				return Err(invalid("prefix must be 1-253 characters"));
			}
			if !is_dns_subdomain(prefix) {
				return Err(invalid("prefix must be a DNS subdomain"));
			}
			name
		}
		None => key,
	};

	if name.is_empty() || name.len() > MAX_NAME_LEN {
		return Err(invalid("name must be 1-63 characters"));
	}
	if !is_qualified_segment(name) {
		return Err(invalid(
			"name must start and end with an alphanumeric character and contain only [-_.a-zA-Z0-9]",
		));
	}
	Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), SelectorError> {
	if value.is_empty() {
		return Ok(());
	}
	let invalid = |reason: &str| SelectorError::InvalidValue {
		key: key.to_string(),
		value: value.to_string(),
		reason: reason.to_string(),
	};
	if value.len() > MAX_NAME_LEN {
		return Err(invalid("must be at most 63 characters"));
	}
	if !is_qualified_segment(value) {
		return Err(invalid(
			"must start and end with an alphanumeric character and contain only [-_.a-zA-Z0-9]",
		));
	}
	Ok(())
}

fn is_qualified_segment(s: &str) -> bool {
	let bytes = s.as_bytes();
	match (bytes.first(), bytes.last()) {
		(Some(first), Some(last)) if first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric() => bytes
			.iter()
			.all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.')),
		_ => false,
	}
}

fn is_dns_subdomain(s: &str) -> bool {
	let is_lower_alnum = |b: &u8| b.is_ascii_lowercase() || b.is_ascii_digit();
	s.split('.').all(|label| {
		let bytes = label.as_bytes();
		match (bytes.first(), bytes.last()) {
			(Some(first), Some(last)) => {
				bytes.len() <= MAX_NAME_LEN
					&& is_lower_alnum(first)
					&& is_lower_alnum(last)
					&& bytes.iter().all(|b| is_lower_alnum(b) || *b == b'-')
			}
			_ => false,
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;

	fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	fn selector(pairs: &[(&str, &str)]) -> LabelSelector {
		LabelSelector {
			match_labels: Some(labels(pairs)),
			match_expressions: None,
		}
	}

	#[test]
	fn absent_selector_matches_everything() {
		assert!(matches(None, None).unwrap());
		assert!(matches(None, Some(&labels(&[("app", "web")]))).unwrap());
	}

	#[test]
	fn empty_selector_matches_everything() {
		let sel = LabelSelector::default();
		assert!(matches(Some(&sel), None).unwrap());
		assert!(matches(Some(&selector(&[])), Some(&labels(&[("a", "b")]))).unwrap());
	}

	#[test]
	fn requires_every_pair() {
		let sel = selector(&[("app", "web"), ("tier", "backend")]);
		assert!(matches(Some(&sel), Some(&labels(&[("app", "web"), ("tier", "backend"), ("x", "y")]))).unwrap());
		assert!(!matches(Some(&sel), Some(&labels(&[("app", "web")]))).unwrap());
		assert!(!matches(Some(&sel), Some(&labels(&[("app", "web"), ("tier", "frontend")]))).unwrap());
		assert!(!matches(Some(&sel), None).unwrap());
	}

	#[test]
	fn prefixed_keys_are_accepted() {
		let sel = selector(&[("app.kubernetes.io/name", "web")]);
		assert!(matches(Some(&sel), Some(&labels(&[("app.kubernetes.io/name", "web")]))).unwrap());
	}

	#[test]
	fn empty_value_is_valid() {
		let sel = selector(&[("flag", "")]);
		assert!(matches(Some(&sel), Some(&labels(&[("flag", "")]))).unwrap());
	}

	#[test]
	fn malformed_key_is_rejected() {
		let err = matches(Some(&selector(&[("-bad", "x")])), None).unwrap_err();
		assert!(matches!(err, SelectorError::InvalidKey { .. }));

		let err = matches(Some(&selector(&[("Bad_Prefix/name", "x")])), None).unwrap_err();
		assert!(matches!(err, SelectorError::InvalidKey { .. }));
	}

	#[test]
	fn malformed_value_is_rejected() {
		let err = matches(Some(&selector(&[("app", "has space")])), None).unwrap_err();
		assert!(matches!(err, SelectorError::InvalidValue { .. }));

		let long = "a".repeat(64);
		let err = matches(Some(&selector(&[("app", long.as_str())])), None).unwrap_err();
		assert!(matches!(err, SelectorError::InvalidValue { .. }));
	}

	#[test]
	fn match_expressions_are_rejected() {
		let sel = LabelSelector {
			match_labels: None,
			match_expressions: Some(vec![LabelSelectorRequirement {
				key: "app".to_string(),
				operator: "In".to_string(),
				values: Some(vec!["web".to_string()]),
			}]),
		};
		assert_eq!(
			Selector::from_label_selector(Some(&sel)).unwrap_err(),
			SelectorError::UnsupportedExpression {
				key: "app".to_string()
			}
		);
	}

	#[test]
	fn missing_labels_only_satisfy_an_empty_selector() {
		assert!(Selector::everything().matches(None));
		let sel = Selector::from_label_selector(Some(&selector(&[("flag", "")]))).unwrap();
		assert!(!sel.matches(None));
		assert!(!sel.matches(Some(&labels(&[("other", "")]))));
	}

	#[test]
	fn error_messages_name_the_offending_key() {
		let err = matches(Some(&selector(&[("bad key", "x")])), None).unwrap_err();
		assert!(err.to_string().contains("bad key"));
	}
}
