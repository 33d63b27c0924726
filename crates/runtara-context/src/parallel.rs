// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Multi-node topology for parallel steps.
//!
//! Unlike the runtime environment, the topology is never cached: nodes of a
//! parallel step learn the main node address and their index through a
//! handshake that may complete after the context has been configured.

use std::env;

use serde::{Deserialize, Serialize};

use crate::config::{
    PARALLEL_MAIN_IP_VAR, PARALLEL_NODE_INDEX_VAR, PARALLEL_NUM_NODES_VAR, parse_u32,
};
use crate::error::Result;

/// Default main node address for single-node execution.
pub const DEFAULT_MAIN_IP: &str = "127.0.0.1";

/// Parallel topology as currently advertised to this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parallel {
    /// Address of the main node (default: "127.0.0.1")
    pub main_ip: String,
    /// Total number of nodes (default: 1)
    pub num_nodes: u32,
    /// Index of this node (default: 0)
    pub node_index: u32,
}

impl Default for Parallel {
    fn default() -> Self {
        Self {
            main_ip: DEFAULT_MAIN_IP.to_string(),
            num_nodes: 1,
            node_index: 0,
        }
    }
}

impl Parallel {
    /// Read the topology from process environment variables.
    ///
    /// # Environment Variables
    /// - `MF_PARALLEL_MAIN_IP` - Main node address (default: "127.0.0.1")
    /// - `MF_PARALLEL_NUM_NODES` - Node count (default: 1)
    /// - `MF_PARALLEL_NODE_INDEX` - This node's index (default: 0)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read the topology through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let main_ip = lookup(PARALLEL_MAIN_IP_VAR).unwrap_or_else(|| DEFAULT_MAIN_IP.to_string());

        let num_nodes = match lookup(PARALLEL_NUM_NODES_VAR) {
            Some(raw) => parse_u32(PARALLEL_NUM_NODES_VAR, &raw)?,
            None => 1,
        };

        let node_index = match lookup(PARALLEL_NODE_INDEX_VAR) {
            Some(raw) => parse_u32(PARALLEL_NODE_INDEX_VAR, &raw)?,
            None => 0,
        };

        Ok(Self {
            main_ip,
            num_nodes,
            node_index,
        })
    }

    /// Whether this node is the main node of the group.
    pub fn is_main(&self) -> bool {
        self.node_index == 0
    }
}
