// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Runtara Context - identity and runtime metadata of the executing task.
//!
//! Each worker process runs one step of a larger run. The task runtime
//! configures an [`ExecutionContext`] once, early in the process, and step
//! code and plugins read it from then on instead of threading identifiers
//! through every call.
//!
//! # Features
//!
//! - **Task Identity**: flow, run, step and task identifiers, retry count,
//!   origin run, namespace, username and tags
//! - **Pathspec**: `flow/run/step/task` locator derived from the identity
//! - **Runtime Environment**: runtime name, orchestrator state machine and
//!   worker/split limits captured from the environment at task start
//! - **Parallel Topology**: main node, node count and node index, re-read on
//!   every access
//! - **Graph Metadata**: structure of the flow the task belongs to
//! - **Extensions**: plugin-installed read-only attributes
//!
//! # Quick Start
//!
//! ```ignore
//! use runtara_context::{TaskIdentity, current};
//!
//! // task runtime, at task start
//! current().configure(
//!     Some(&flow),
//!     TaskIdentity::new("1042", "train", "7")
//!         .with_retry_count(1)
//!         .with_namespace("user:tester")
//!         .with_username("tester"),
//! );
//!
//! // plugin initialization
//! current().install_extension("build_id", "abc123")?;
//!
//! // step code
//! let ctx = current();
//! tracing::info!(pathspec = ?ctx.pathspec(), retry = ?ctx.retry_count(), "training");
//! let workers = ctx.max_workers()?.unwrap_or(1);
//! if ctx.parallel()?.is_main() {
//!     // coordinate the other nodes
//! }
//! let build = ctx.get_or("build_id", "unknown")?;
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Read | Default | Description |
//! |----------|------|---------|-------------|
//! | `METAFLOW_RUNTIME_ENVIRONMENT` | configure | `local` | Runtime environment |
//! | `METAFLOW_RUNTIME_NAME` | configure | - | Runtime name |
//! | `SFN_STATE_MACHINE` | configure | - | Orchestrator state machine |
//! | `MAX_WORKERS` | configure (parsed on read) | - | Maximum workers |
//! | `MAX_NUM_SPLITS` | configure (parsed on read) | - | Maximum foreach splits |
//! | `MF_PARALLEL_MAIN_IP` | every access | `127.0.0.1` | Main node address |
//! | `MF_PARALLEL_NUM_NODES` | every access | `1` | Node count |
//! | `MF_PARALLEL_NODE_INDEX` | every access | `0` | This node's index |

mod config;
mod context;
mod error;
mod extensions;
mod graph;
mod identity;
mod parallel;
mod project;
mod registry;

pub use config::{
    DEFAULT_RUNTIME_ENVIRONMENT, MAX_NUM_SPLITS_VAR, MAX_WORKERS_VAR, PARALLEL_MAIN_IP_VAR,
    PARALLEL_NODE_INDEX_VAR, PARALLEL_NUM_NODES_VAR, RUNTIME_ENVIRONMENT_VAR, RUNTIME_NAME_VAR,
    RuntimeEnvironment, SFN_STATE_MACHINE_VAR,
};
pub use context::{ExecutionContext, TaskSnapshot};
pub use error::{ContextError, Result};
pub use extensions::{ExtensionTable, RESERVED_FIELDS, is_reserved};
pub use graph::{Flow, GraphInfo, StaticFlow, StepInfo, StepKind};
pub use identity::TaskIdentity;
pub use parallel::{DEFAULT_MAIN_IP, Parallel};
pub use project::{ProjectBranch, ProjectInfo};
pub use registry::{current, try_current};
