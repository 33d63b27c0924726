// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Plugin-installed context attributes.
//!
//! Plugins extend the context with named, read-only values without the
//! context knowing about them in advance. Names share one namespace with the
//! fixed fields, so a fixed field name can never be installed.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ContextError, Result};

/// Names of the fixed context fields.
pub const RESERVED_FIELDS: &[&str] = &[
    "flow_name",
    "run_id",
    "step_name",
    "task_id",
    "retry_count",
    "origin_run_id",
    "namespace",
    "username",
    "pathspec",
    "tags",
    "is_running_flow",
    "is_configured",
    "runtime_environment",
    "runtime_name",
    "sfn_state_machine_name",
    "max_workers",
    "max_num_splits",
    "parallel",
    "graph",
];

/// Whether `name` is one of the fixed context fields.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Attribute names follow identifier rules: ASCII letters, digits and
/// underscores, not starting with a digit.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if !valid {
        return Err(ContextError::InvalidName(name.to_string()));
    }
    if is_reserved(name) {
        return Err(ContextError::ReservedName(name.to_string()));
    }
    Ok(())
}

/// Name to value table of installed extensions.
#[derive(Debug, Clone, Default)]
pub struct ExtensionTable {
    values: HashMap<String, Value>,
}

impl ExtensionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `value` under `name`, returning the value it replaced.
    pub fn install(&mut self, name: &str, value: Value) -> Result<Option<Value>> {
        validate_name(name)?;

        let previous = self.values.insert(name.to_string(), value);
        if previous.is_some() {
            warn!(extension = name, "Context extension replaced");
        } else {
            debug!(extension = name, "Context extension installed");
        }
        Ok(previous)
    }

    /// Value installed under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Installed names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of installed extensions.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no extension is installed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_install_and_get() {
        let mut table = ExtensionTable::new();
        assert!(table.is_empty());

        let previous = table.install("build_id", json!("abc123")).unwrap();

        assert!(previous.is_none());
        assert_eq!(table.get("build_id"), Some(&json!("abc123")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut table = ExtensionTable::new();
        table.install("build_id", json!("first")).unwrap();

        let previous = table.install("build_id", json!("second")).unwrap();

        assert_eq!(previous, Some(json!("first")));
        assert_eq!(table.get("build_id"), Some(&json!("second")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_every_fixed_field_is_rejected() {
        let mut table = ExtensionTable::new();

        for name in RESERVED_FIELDS {
            let err = table.install(name, json!(1)).unwrap_err();
            assert!(matches!(err, ContextError::ReservedName(ref n) if n == *name));
        }
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let mut table = ExtensionTable::new();

        for name in ["", "1st", "has space", "dotted.name", "dash-name"] {
            let err = table.install(name, json!(true)).unwrap_err();
            assert!(matches!(err, ContextError::InvalidName(_)), "{name:?}");
        }
        assert!(table.install("_private", json!(true)).is_ok());
        assert!(table.install("project_name2", json!(true)).is_ok());
    }

    #[test]
    fn test_names_are_sorted() {
        let mut table = ExtensionTable::new();
        table.install("zeta", json!(1)).unwrap();
        table.install("alpha", json!(2)).unwrap();

        assert_eq!(table.names(), vec!["alpha", "zeta"]);
    }
}
