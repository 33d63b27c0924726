// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process-wide execution context.
//!
//! The task runtime configures this context once at task start; step code
//! and plugins read it for the rest of the process. Code that can receive an
//! `&ExecutionContext` explicitly should prefer that, and tests should build
//! their own [`ExecutionContext`] instead of touching this one.

use once_cell::sync::OnceCell;

use crate::context::ExecutionContext;

/// Global storage for the process context.
static CURRENT: OnceCell<ExecutionContext> = OnceCell::new();

/// Get the context of the task running in this process.
///
/// The context is created unconfigured on first access.
///
/// # Example
///
/// ```ignore
/// use runtara_context::current;
///
/// if let Some(pathspec) = current().pathspec() {
///     tracing::info!(%pathspec, "processing");
/// }
/// ```
pub fn current() -> &'static ExecutionContext {
    CURRENT.get_or_init(ExecutionContext::new)
}

/// Get the process context only if something already created it.
pub fn try_current() -> Option<&'static ExecutionContext> {
    CURRENT.get()
}
