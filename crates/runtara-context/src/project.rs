// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Project namespacing installed through context extensions.
//!
//! A project groups deployments of a flow into branches. The project plugin
//! publishes `project_name`, `branch_name`, `project_flow_name` and
//! `is_production` on the execution context.

use std::fmt;

use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::{ContextError, Result};

/// Branch a project deployment belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectBranch {
    /// Personal branch of a user (`user.<username>`)
    User(String),
    /// Named test branch (`test.<name>`)
    Test(String),
    /// Production, optionally a named production branch (`prod` / `prod.<name>`)
    Production(Option<String>),
}

impl ProjectBranch {
    /// Whether this is a production branch.
    pub fn is_production(&self) -> bool {
        matches!(self, ProjectBranch::Production(_))
    }
}

impl fmt::Display for ProjectBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectBranch::User(name) => write!(f, "user.{}", name),
            ProjectBranch::Test(name) => write!(f, "test.{}", name),
            ProjectBranch::Production(None) => write!(f, "prod"),
            ProjectBranch::Production(Some(name)) => write!(f, "prod.{}", name),
        }
    }
}

/// Project coordinates of the running flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectInfo {
    /// Project name
    pub project_name: String,
    /// Branch of the deployment
    pub branch: ProjectBranch,
    /// Flow name
    pub flow_name: String,
}

impl ProjectInfo {
    /// Create project coordinates.
    ///
    /// Project names are limited to lowercase ASCII letters, digits and
    /// underscores so they can be embedded in deployment names.
    pub fn new(
        project_name: impl Into<String>,
        branch: ProjectBranch,
        flow_name: impl Into<String>,
    ) -> Result<Self> {
        let project_name = project_name.into();
        let valid = !project_name.is_empty()
            && project_name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(ContextError::InvalidName(project_name));
        }

        Ok(Self {
            project_name,
            branch,
            flow_name: flow_name.into(),
        })
    }

    /// Rendered branch name, e.g. `user.tester`.
    pub fn branch_name(&self) -> String {
        self.branch.to_string()
    }

    /// `<project>.<branch>.<flow>`
    pub fn project_flow_name(&self) -> String {
        format!("{}.{}.{}", self.project_name, self.branch, self.flow_name)
    }

    /// Whether the deployment is on a production branch.
    pub fn is_production(&self) -> bool {
        self.branch.is_production()
    }

    /// Publish the project attributes on `ctx`.
    pub fn install(&self, ctx: &ExecutionContext) -> Result<()> {
        ctx.install_extensions([
            ("project_name", Value::from(self.project_name.as_str())),
            ("branch_name", Value::from(self.branch_name())),
            ("project_flow_name", Value::from(self.project_flow_name())),
            ("is_production", Value::Bool(self.is_production())),
        ])
    }
}
