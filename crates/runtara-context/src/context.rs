// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Execution context for the task running in this process.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::{Span, debug, info, info_span, warn};

use crate::config::RuntimeEnvironment;
use crate::error::{ContextError, Result};
use crate::extensions::{ExtensionTable, validate_name};
use crate::graph::{Flow, GraphInfo};
use crate::identity::TaskIdentity;
use crate::parallel::Parallel;

/// Everything one `configure` call established, as a single immutable value.
#[derive(Debug, Clone, Default)]
pub struct TaskSnapshot {
    flow_name: Option<String>,
    run_id: Option<String>,
    step_name: Option<String>,
    task_id: Option<String>,
    retry_count: Option<u32>,
    origin_run_id: Option<String>,
    namespace: Option<String>,
    username: Option<String>,
    is_running: bool,
    tags: Option<BTreeSet<String>>,
    runtime: Option<RuntimeEnvironment>,
    graph: Option<Arc<GraphInfo>>,
}

impl TaskSnapshot {
    fn build(flow: Option<&dyn Flow>, identity: TaskIdentity, runtime: RuntimeEnvironment) -> Self {
        let (flow_name, graph) = match flow {
            Some(flow) => {
                if let Some(name) = identity.flow_name.as_deref()
                    && name != flow.name()
                {
                    warn!(
                        identity_flow_name = name,
                        flow_name = flow.name(),
                        "Flow name from identity ignored in favour of the associated flow"
                    );
                }
                (
                    Some(flow.name().to_string()),
                    Some(Arc::new(flow.graph_info())),
                )
            }
            None => (identity.flow_name, None),
        };

        Self {
            flow_name,
            run_id: Some(identity.run_id),
            step_name: Some(identity.step_name),
            task_id: Some(identity.task_id),
            retry_count: Some(identity.retry_count),
            origin_run_id: identity.origin_run_id,
            namespace: identity.namespace,
            username: identity.username,
            is_running: identity.is_running,
            tags: identity.tags,
            runtime: Some(runtime),
            graph,
        }
    }

    /// Get the flow name.
    pub fn flow_name(&self) -> Option<&str> {
        self.flow_name.as_deref()
    }

    /// Get the run ID.
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Get the step name.
    pub fn step_name(&self) -> Option<&str> {
        self.step_name.as_deref()
    }

    /// Get the task ID.
    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// Get the retry attempt.
    pub fn retry_count(&self) -> Option<u32> {
        self.retry_count
    }

    /// Get the run this task was resumed or cloned from.
    pub fn origin_run_id(&self) -> Option<&str> {
        self.origin_run_id.as_deref()
    }

    /// Get the namespace.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Get the username.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Whether the task is actively running as part of a flow.
    pub fn is_running_flow(&self) -> bool {
        self.is_running
    }

    /// Get the run tags.
    pub fn tags(&self) -> Option<&BTreeSet<String>> {
        self.tags.as_ref()
    }

    /// `flow/run/step/task`, or `None` until all four parts are known.
    pub fn pathspec(&self) -> Option<String> {
        Some(format!(
            "{}/{}/{}/{}",
            self.flow_name.as_deref()?,
            self.run_id.as_deref()?,
            self.step_name.as_deref()?,
            self.task_id.as_deref()?,
        ))
    }

    /// Runtime environment captured at configure time.
    pub fn runtime(&self) -> Option<&RuntimeEnvironment> {
        self.runtime.as_ref()
    }

    /// Get the runtime environment name.
    pub fn runtime_environment(&self) -> Option<&str> {
        self.runtime.as_ref().map(|r| r.runtime_environment.as_str())
    }

    /// Get the runtime name.
    pub fn runtime_name(&self) -> Option<&str> {
        self.runtime.as_ref()?.runtime_name.as_deref()
    }

    /// Get the orchestrator state machine name.
    pub fn sfn_state_machine_name(&self) -> Option<&str> {
        self.runtime.as_ref()?.sfn_state_machine_name.as_deref()
    }

    /// Maximum worker count, parsed on read.
    pub fn max_workers(&self) -> Result<Option<u32>> {
        match &self.runtime {
            Some(runtime) => runtime.max_workers(),
            None => Ok(None),
        }
    }

    /// Maximum split count, parsed on read.
    pub fn max_num_splits(&self) -> Result<Option<u32>> {
        match &self.runtime {
            Some(runtime) => runtime.max_num_splits(),
            None => Ok(None),
        }
    }

    /// Graph metadata of the associated flow.
    pub fn graph(&self) -> Result<Arc<GraphInfo>> {
        self.graph.clone().ok_or(ContextError::GraphUnavailable)
    }

    /// Whether a task identity has been supplied.
    pub fn is_configured(&self) -> bool {
        self.run_id.is_some()
    }
}

/// Identity and runtime metadata of the task executing in this process.
///
/// Created unconfigured, then populated by the task runtime through
/// [`configure`](Self::configure). Each `configure` call replaces the whole
/// identity at once; readers observe either the previous or the new task,
/// never a mix. Plugins add their own read-only attributes through
/// [`install_extension`](Self::install_extension).
///
/// # Example
///
/// ```ignore
/// use runtara_context::{ExecutionContext, TaskIdentity};
///
/// let ctx = ExecutionContext::new();
/// ctx.configure(
///     Some(&flow),
///     TaskIdentity::new("1042", "train", "7")
///         .with_namespace("user:tester")
///         .with_tags(["nightly"]),
/// );
///
/// assert_eq!(ctx.pathspec().as_deref(), Some("TrainingFlow/1042/train/7"));
/// ```
#[derive(Debug, Default)]
pub struct ExecutionContext {
    state: RwLock<Arc<TaskSnapshot>>,
    extensions: RwLock<ExtensionTable>,
}

impl ExecutionContext {
    /// Create an unconfigured context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the context for the task about to run.
    ///
    /// Replaces every identity field and re-reads the runtime environment
    /// from the process environment. When `flow` is given, its name becomes
    /// the flow name and its graph becomes available through [`graph`](Self::graph);
    /// otherwise the graph is unavailable until a later call supplies one.
    pub fn configure(&self, flow: Option<&dyn Flow>, identity: TaskIdentity) {
        self.configure_with_runtime(flow, identity, RuntimeEnvironment::from_env());
    }

    /// Like [`configure`](Self::configure), with an explicit runtime environment.
    pub fn configure_with_runtime(
        &self,
        flow: Option<&dyn Flow>,
        identity: TaskIdentity,
        runtime: RuntimeEnvironment,
    ) {
        let snapshot = Arc::new(TaskSnapshot::build(flow, identity, runtime));
        let pathspec = snapshot.pathspec();

        info!(
            pathspec = pathspec.as_deref().unwrap_or("-"),
            retry_count = snapshot.retry_count.unwrap_or_default(),
            runtime_environment = snapshot.runtime_environment().unwrap_or_default(),
            has_graph = snapshot.graph.is_some(),
            "Task context configured"
        );

        *self.state.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Consistent view of all fields set by the latest `configure` call.
    pub fn snapshot(&self) -> Arc<TaskSnapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `configure` has run.
    pub fn is_configured(&self) -> bool {
        self.snapshot().is_configured()
    }

    /// Get the flow name.
    pub fn flow_name(&self) -> Option<String> {
        self.snapshot().flow_name().map(str::to_string)
    }

    /// Get the run ID.
    pub fn run_id(&self) -> Option<String> {
        self.snapshot().run_id().map(str::to_string)
    }

    /// Get the step name.
    pub fn step_name(&self) -> Option<String> {
        self.snapshot().step_name().map(str::to_string)
    }

    /// Get the task ID.
    pub fn task_id(&self) -> Option<String> {
        self.snapshot().task_id().map(str::to_string)
    }

    /// Get the retry attempt.
    pub fn retry_count(&self) -> Option<u32> {
        self.snapshot().retry_count()
    }

    /// Get the run this task was resumed or cloned from.
    pub fn origin_run_id(&self) -> Option<String> {
        self.snapshot().origin_run_id().map(str::to_string)
    }

    /// Get the namespace.
    pub fn namespace(&self) -> Option<String> {
        self.snapshot().namespace().map(str::to_string)
    }

    /// Get the username.
    pub fn username(&self) -> Option<String> {
        self.snapshot().username().map(str::to_string)
    }

    /// `flow/run/step/task` locator of the task; `None` before configuration
    /// or when no flow name is known.
    pub fn pathspec(&self) -> Option<String> {
        self.snapshot().pathspec()
    }

    /// Get the run tags.
    pub fn tags(&self) -> Option<BTreeSet<String>> {
        self.snapshot().tags().cloned()
    }

    /// Whether the task is actively running as part of a flow.
    pub fn is_running_flow(&self) -> bool {
        self.snapshot().is_running_flow()
    }

    /// Get the runtime environment name.
    pub fn runtime_environment(&self) -> Option<String> {
        self.snapshot().runtime_environment().map(str::to_string)
    }

    /// Get the runtime name.
    pub fn runtime_name(&self) -> Option<String> {
        self.snapshot().runtime_name().map(str::to_string)
    }

    /// Get the orchestrator state machine name.
    pub fn sfn_state_machine_name(&self) -> Option<String> {
        self.snapshot().sfn_state_machine_name().map(str::to_string)
    }

    /// Maximum worker count. Faults if the captured value is not an integer.
    pub fn max_workers(&self) -> Result<Option<u32>> {
        self.snapshot().max_workers()
    }

    /// Maximum split count. Faults if the captured value is not an integer.
    pub fn max_num_splits(&self) -> Result<Option<u32>> {
        self.snapshot().max_num_splits()
    }

    /// Parallel topology, re-read from the environment on every call.
    pub fn parallel(&self) -> Result<Parallel> {
        Parallel::from_env()
    }

    /// Graph metadata of the associated flow.
    ///
    /// Fails with [`ContextError::GraphUnavailable`] when the context was
    /// configured without a flow.
    pub fn graph(&self) -> Result<Arc<GraphInfo>> {
        self.snapshot().graph()
    }

    /// Install a read-only attribute under `name`.
    ///
    /// Fixed field names are rejected. Installing the same name twice keeps
    /// the later value.
    pub fn install_extension(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .install(name, value.into())?;
        Ok(())
    }

    /// Install several attributes under one lock.
    ///
    /// Names are validated up front; if any is rejected nothing is installed.
    pub fn install_extensions<I, K, V>(&self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let values: Vec<(String, Value)> = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        for (name, _) in &values {
            validate_name(name)?;
        }

        let mut extensions = self.extensions.write().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in values {
            extensions.install(&name, value)?;
        }
        Ok(())
    }

    /// Value of an installed extension.
    pub fn extension(&self, name: &str) -> Option<Value> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Names of all installed extensions, sorted.
    pub fn extension_names(&self) -> Vec<String> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Resolve a fixed field or extension by name.
    ///
    /// Returns `Ok(None)` for unset fields and unknown names. Faults of the
    /// underlying accessor (malformed integers, missing graph) are returned
    /// as errors.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        match self.field(name) {
            Some(value) => value,
            None => Ok(self.extension(name)),
        }
    }

    /// Resolve a fixed field; `None` when `name` is not one.
    fn field(&self, name: &str) -> Option<Result<Option<Value>>> {
        let snapshot = self.snapshot();

        let value = match name {
            "flow_name" => snapshot.flow_name().map(Value::from),
            "run_id" => snapshot.run_id().map(Value::from),
            "step_name" => snapshot.step_name().map(Value::from),
            "task_id" => snapshot.task_id().map(Value::from),
            "retry_count" => snapshot.retry_count().map(Value::from),
            "origin_run_id" => snapshot.origin_run_id().map(Value::from),
            "namespace" => snapshot.namespace().map(Value::from),
            "username" => snapshot.username().map(Value::from),
            "pathspec" => snapshot.pathspec().map(Value::from),
            "tags" => snapshot
                .tags()
                .map(|tags| tags.iter().map(|t| Value::from(t.as_str())).collect::<Value>()),
            "is_running_flow" => Some(Value::Bool(snapshot.is_running_flow())),
            "is_configured" => Some(Value::Bool(snapshot.is_configured())),
            "runtime_environment" => snapshot.runtime_environment().map(Value::from),
            "runtime_name" => snapshot.runtime_name().map(Value::from),
            "sfn_state_machine_name" => snapshot.sfn_state_machine_name().map(Value::from),
            "max_workers" => return Some(snapshot.max_workers().map(|v| v.map(Value::from))),
            "max_num_splits" => {
                return Some(snapshot.max_num_splits().map(|v| v.map(Value::from)));
            }
            "parallel" => {
                return Some(
                    self.parallel()
                        .and_then(|p| Ok(Some(serde_json::to_value(p)?))),
                );
            }
            "graph" => {
                return Some(
                    snapshot
                        .graph()
                        .and_then(|g| Ok(Some(serde_json::to_value(&*g)?))),
                );
            }
            _ => return None,
        };

        Some(Ok(value))
    }

    /// Resolve `name`, falling back to `default` when it has no value.
    pub fn get_or(&self, name: &str, default: impl Into<Value>) -> Result<Value> {
        Ok(self.get(name)?.unwrap_or_else(|| default.into()))
    }

    /// Whether `name` resolves to a present, non-null value.
    ///
    /// An attribute whose accessor faults counts as absent.
    pub fn contains(&self, name: &str) -> bool {
        match self.get(name) {
            Ok(Some(value)) => !value.is_null(),
            Ok(None) => false,
            Err(e) => {
                debug!(attribute = name, error = %e, "Context attribute unreadable");
                false
            }
        }
    }

    /// A span carrying the task's pathspec and retry count.
    ///
    /// ```ignore
    /// let _enter = ctx.span().entered();
    /// tracing::info!("loading dataset");
    /// ```
    pub fn span(&self) -> Span {
        let snapshot = self.snapshot();
        let span = info_span!(
            "task",
            pathspec = tracing::field::Empty,
            retry_count = tracing::field::Empty
        );
        if let Some(pathspec) = snapshot.pathspec() {
            span.record("pathspec", pathspec.as_str());
        }
        if let Some(retry_count) = snapshot.retry_count() {
            span.record("retry_count", retry_count);
        }
        span
    }
}
