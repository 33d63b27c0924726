// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structural flow metadata exposed through the context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How a step relates to its neighbours in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    /// Entry point of the flow
    Start,
    /// Single successor
    Linear,
    /// Fans out to a fixed set of branches
    SplitStatic,
    /// Fans out once per item of a foreach parameter
    SplitForeach,
    /// Fans out to a group of collaborating nodes
    SplitParallel,
    /// Merges incoming branches
    Join,
    /// Terminal step
    End,
}

/// Metadata for a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Step name
    pub name: String,

    /// Step type
    #[serde(rename = "type")]
    pub kind: StepKind,

    /// Names of the steps this step transitions to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<String>,

    /// Foreach parameter for foreach splits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreach: Option<String>,

    /// Docstring of the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Decorators attached to the step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
}

impl StepInfo {
    /// Create step metadata with no successors.
    pub fn new(name: impl Into<String>, kind: StepKind) -> Self {
        Self {
            name: name.into(),
            kind,
            next: Vec::new(),
            foreach: None,
            doc: None,
            decorators: Vec::new(),
        }
    }

    /// Set the successor steps.
    pub fn with_next<I, S>(mut self, next: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.next = next.into_iter().map(Into::into).collect();
        self
    }

    /// Set the foreach parameter.
    pub fn with_foreach(mut self, param: impl Into<String>) -> Self {
        self.foreach = Some(param.into());
        self
    }

    /// Set the docstring.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Attach a decorator.
    pub fn with_decorator(mut self, decorator: impl Into<String>) -> Self {
        self.decorators.push(decorator.into());
        self
    }
}

/// Structural metadata of a flow graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphInfo {
    /// Docstring of the flow
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Map of step names to step metadata
    pub steps: HashMap<String, StepInfo>,

    /// Step names in definition order
    #[serde(default)]
    pub graph_structure: Vec<String>,

    /// Flow-level decorators
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
}

impl GraphInfo {
    /// Create empty graph metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step, keeping definition order. Re-adding a step replaces it.
    pub fn with_step(mut self, step: StepInfo) -> Self {
        if !self.steps.contains_key(&step.name) {
            self.graph_structure.push(step.name.clone());
        }
        self.steps.insert(step.name.clone(), step);
        self
    }

    /// Set the flow docstring.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Attach a flow-level decorator.
    pub fn with_decorator(mut self, decorator: impl Into<String>) -> Self {
        self.decorators.push(decorator.into());
        self
    }

    /// Look up a step by name.
    pub fn step(&self, name: &str) -> Option<&StepInfo> {
        self.steps.get(name)
    }

    /// Entry point of the graph, if the flow declares one.
    pub fn start_step(&self) -> Option<&StepInfo> {
        self.steps.values().find(|s| s.kind == StepKind::Start)
    }

    /// Successors of a step; empty for unknown steps.
    pub fn successors(&self, name: &str) -> &[String] {
        self.step(name).map(|s| s.next.as_slice()).unwrap_or(&[])
    }

    /// Steps that transition into `name`.
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.graph_structure
            .iter()
            .filter_map(|n| self.steps.get(n))
            .filter(|s| s.next.iter().any(|n| n == name))
            .map(|s| s.name.as_str())
            .collect()
    }
}

/// A flow definition whose structure can be associated with a task context.
pub trait Flow: Send + Sync {
    /// Flow name.
    fn name(&self) -> &str;

    /// Structural metadata of the flow graph.
    fn graph_info(&self) -> GraphInfo;
}

/// A flow whose name and graph are known up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFlow {
    name: String,
    graph: GraphInfo,
}

impl StaticFlow {
    /// Create a flow from its name and graph metadata.
    pub fn new(name: impl Into<String>, graph: GraphInfo) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }
}

impl Flow for StaticFlow {
    fn name(&self) -> &str {
        &self.name
    }

    fn graph_info(&self) -> GraphInfo {
        self.graph.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branching_graph() -> GraphInfo {
        GraphInfo::new()
            .with_doc("Trains two models and keeps the best one")
            .with_step(StepInfo::new("start", StepKind::SplitStatic).with_next(["a", "b"]))
            .with_step(StepInfo::new("a", StepKind::Linear).with_next(["join"]))
            .with_step(StepInfo::new("b", StepKind::Linear).with_next(["join"]))
            .with_step(StepInfo::new("join", StepKind::Join).with_next(["end"]))
            .with_step(StepInfo::new("end", StepKind::End))
    }

    #[test]
    fn test_definition_order_is_kept() {
        let graph = branching_graph();
        assert_eq!(graph.graph_structure, ["start", "a", "b", "join", "end"]);
    }

    #[test]
    fn test_readding_step_replaces_without_duplicating() {
        let graph = branching_graph().with_step(StepInfo::new("a", StepKind::Linear).with_doc("retrained"));

        assert_eq!(graph.graph_structure.len(), 5);
        assert_eq!(graph.step("a").unwrap().doc.as_deref(), Some("retrained"));
    }

    #[test]
    fn test_successors_and_predecessors() {
        let graph = branching_graph();

        assert_eq!(graph.successors("start"), ["a", "b"]);
        assert!(graph.successors("missing").is_empty());
        assert_eq!(graph.predecessors("join"), vec!["a", "b"]);
        assert!(graph.predecessors("start").is_empty());
    }

    #[test]
    fn test_start_step_lookup() {
        let graph = GraphInfo::new()
            .with_step(StepInfo::new("start", StepKind::Start).with_next(["end"]))
            .with_step(StepInfo::new("end", StepKind::End));

        assert_eq!(graph.start_step().unwrap().name, "start");
        assert!(GraphInfo::new().start_step().is_none());
    }

    #[test]
    fn test_step_kind_serializes_kebab_case() {
        let step = StepInfo::new("fan", StepKind::SplitForeach).with_foreach("items");
        let json = serde_json::to_value(&step).unwrap();

        assert_eq!(json["type"], "split-foreach");
        assert_eq!(json["foreach"], "items");
        assert!(json.get("doc").is_none());
    }

    #[test]
    fn test_static_flow() {
        let flow = StaticFlow::new("TrainingFlow", branching_graph());

        assert_eq!(flow.name(), "TrainingFlow");
        assert_eq!(flow.graph_info(), branching_graph());
    }
}
