// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task identity supplied by the task runtime at task start.

use std::collections::BTreeSet;

/// Identity of the task being executed.
///
/// Built by the task runtime and handed to
/// [`ExecutionContext::configure`](crate::ExecutionContext::configure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentity {
    /// Flow name, used when no flow definition is associated
    pub flow_name: Option<String>,
    /// Run identifier
    pub run_id: String,
    /// Step name
    pub step_name: String,
    /// Task identifier
    pub task_id: String,
    /// Retry attempt, starting at 0
    pub retry_count: u32,
    /// Run this task was resumed or cloned from
    pub origin_run_id: Option<String>,
    /// Namespace the run belongs to
    pub namespace: Option<String>,
    /// User that started the run
    pub username: Option<String>,
    /// Whether the task is actively running as part of a flow (default: true)
    pub is_running: bool,
    /// Tags attached to the run
    pub tags: Option<BTreeSet<String>>,
}

impl TaskIdentity {
    /// Create an identity for a first attempt of a running task.
    pub fn new(
        run_id: impl Into<String>,
        step_name: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        Self {
            flow_name: None,
            run_id: run_id.into(),
            step_name: step_name.into(),
            task_id: task_id.into(),
            retry_count: 0,
            origin_run_id: None,
            namespace: None,
            username: None,
            is_running: true,
            tags: None,
        }
    }

    /// Set the flow name.
    ///
    /// Only used when no flow is associated at configure time; an associated
    /// flow's own name takes precedence.
    pub fn with_flow_name(mut self, flow_name: impl Into<String>) -> Self {
        self.flow_name = Some(flow_name.into());
        self
    }

    /// Set the retry attempt.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the origin run of a resumed or cloned run.
    pub fn with_origin_run_id(mut self, origin_run_id: impl Into<String>) -> Self {
        self.origin_run_id = Some(origin_run_id.into());
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Mark whether the task is actively running as part of a flow.
    pub fn with_running(mut self, is_running: bool) -> Self {
        self.is_running = is_running;
        self
    }

    /// Set the run tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}
