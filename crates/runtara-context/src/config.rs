// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtime environment snapshot taken when a task context is configured.

use std::env;

use crate::error::{ContextError, Result};

/// Name of the runtime environment the task executes in.
pub const RUNTIME_ENVIRONMENT_VAR: &str = "METAFLOW_RUNTIME_ENVIRONMENT";
/// Name of the runtime (scheduler integration) that launched the task.
pub const RUNTIME_NAME_VAR: &str = "METAFLOW_RUNTIME_NAME";
/// State machine name when running under a step-functions orchestrator.
pub const SFN_STATE_MACHINE_VAR: &str = "SFN_STATE_MACHINE";
/// Maximum number of concurrent workers for the run.
pub const MAX_WORKERS_VAR: &str = "MAX_WORKERS";
/// Maximum number of splits a foreach may fan out to.
pub const MAX_NUM_SPLITS_VAR: &str = "MAX_NUM_SPLITS";
/// Address of the main node of a parallel step.
pub const PARALLEL_MAIN_IP_VAR: &str = "MF_PARALLEL_MAIN_IP";
/// Number of nodes taking part in a parallel step.
pub const PARALLEL_NUM_NODES_VAR: &str = "MF_PARALLEL_NUM_NODES";
/// Index of this node within a parallel step.
pub const PARALLEL_NODE_INDEX_VAR: &str = "MF_PARALLEL_NODE_INDEX";

/// Default runtime environment when none is advertised.
pub const DEFAULT_RUNTIME_ENVIRONMENT: &str = "local";

/// Environment-derived runtime fields.
///
/// Captured once per `configure` call and never re-read. The integer fields
/// keep their raw text so a malformed value only faults when it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    /// Runtime environment name (default: "local")
    pub runtime_environment: String,
    /// Runtime name, if the task was launched by a named runtime
    pub runtime_name: Option<String>,
    /// Orchestrator state machine name
    pub sfn_state_machine_name: Option<String>,
    max_workers: Option<String>,
    max_num_splits: Option<String>,
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self {
            runtime_environment: DEFAULT_RUNTIME_ENVIRONMENT.to_string(),
            runtime_name: None,
            sfn_state_machine_name: None,
            max_workers: None,
            max_num_splits: None,
        }
    }
}

impl RuntimeEnvironment {
    /// Load the runtime fields from process environment variables.
    ///
    /// # Environment Variables
    /// - `METAFLOW_RUNTIME_ENVIRONMENT` - Runtime environment (default: "local")
    /// - `METAFLOW_RUNTIME_NAME` - Runtime name
    /// - `SFN_STATE_MACHINE` - Orchestrator state machine name
    /// - `MAX_WORKERS` - Maximum worker count (parsed on read)
    /// - `MAX_NUM_SPLITS` - Maximum split count (parsed on read)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load the runtime fields through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            runtime_environment: lookup(RUNTIME_ENVIRONMENT_VAR)
                .unwrap_or_else(|| DEFAULT_RUNTIME_ENVIRONMENT.to_string()),
            runtime_name: lookup(RUNTIME_NAME_VAR),
            sfn_state_machine_name: lookup(SFN_STATE_MACHINE_VAR),
            max_workers: lookup(MAX_WORKERS_VAR),
            max_num_splits: lookup(MAX_NUM_SPLITS_VAR),
        }
    }

    /// Set the raw maximum worker count.
    pub fn with_max_workers(mut self, value: impl Into<String>) -> Self {
        self.max_workers = Some(value.into());
        self
    }

    /// Set the raw maximum split count.
    pub fn with_max_num_splits(mut self, value: impl Into<String>) -> Self {
        self.max_num_splits = Some(value.into());
        self
    }

    /// Maximum worker count, parsed on every call.
    pub fn max_workers(&self) -> Result<Option<u32>> {
        parse_optional(MAX_WORKERS_VAR, self.max_workers.as_deref())
    }

    /// Maximum split count, parsed on every call.
    pub fn max_num_splits(&self) -> Result<Option<u32>> {
        parse_optional(MAX_NUM_SPLITS_VAR, self.max_num_splits.as_deref())
    }
}

/// Parse an integer-valued variable, tolerating surrounding whitespace.
pub(crate) fn parse_u32(var: &'static str, raw: &str) -> Result<u32> {
    raw.trim()
        .parse()
        .map_err(|source| ContextError::InvalidInteger {
            var,
            value: raw.to_string(),
            source,
        })
}

fn parse_optional(var: &'static str, raw: Option<&str>) -> Result<Option<u32>> {
    raw.map(|value| parse_u32(var, value)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let runtime = RuntimeEnvironment::from_lookup(lookup(&[]));

        assert_eq!(runtime.runtime_environment, "local");
        assert_eq!(runtime.runtime_name, None);
        assert_eq!(runtime.sfn_state_machine_name, None);
        assert_eq!(runtime.max_workers().unwrap(), None);
        assert_eq!(runtime.max_num_splits().unwrap(), None);
        assert_eq!(runtime, RuntimeEnvironment::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let runtime = RuntimeEnvironment::from_lookup(lookup(&[
            (RUNTIME_ENVIRONMENT_VAR, "kubernetes"),
            (RUNTIME_NAME_VAR, "argo-workflows"),
            (SFN_STATE_MACHINE_VAR, "TrainingFlow"),
            (MAX_WORKERS_VAR, "16"),
            (MAX_NUM_SPLITS_VAR, "100"),
        ]));

        assert_eq!(runtime.runtime_environment, "kubernetes");
        assert_eq!(runtime.runtime_name.as_deref(), Some("argo-workflows"));
        assert_eq!(runtime.sfn_state_machine_name.as_deref(), Some("TrainingFlow"));
        assert_eq!(runtime.max_workers().unwrap(), Some(16));
        assert_eq!(runtime.max_num_splits().unwrap(), Some(100));
    }

    #[test]
    fn test_malformed_integer_faults_on_read_only() {
        let runtime = RuntimeEnvironment::from_lookup(lookup(&[(MAX_WORKERS_VAR, "not-a-number")]));

        // construction succeeded; the fault shows up on read
        let err = runtime.max_workers().unwrap_err();
        match err {
            ContextError::InvalidInteger { var, value, .. } => {
                assert_eq!(var, MAX_WORKERS_VAR);
                assert_eq!(value, "not-a-number");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runtime.max_num_splits().unwrap(), None);
    }

    #[test]
    fn test_negative_integer_is_rejected() {
        let runtime = RuntimeEnvironment::default().with_max_num_splits("-1");
        assert!(runtime.max_num_splits().is_err());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_u32(MAX_WORKERS_VAR, " 8\n").unwrap(), 8);
    }

    #[test]
    fn test_builder_sets_raw_values() {
        let runtime = RuntimeEnvironment::default()
            .with_max_workers("4")
            .with_max_num_splits("32");

        assert_eq!(runtime.max_workers().unwrap(), Some(4));
        assert_eq!(runtime.max_num_splits().unwrap(), Some(32));
    }
}
