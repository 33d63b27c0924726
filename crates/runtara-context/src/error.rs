// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Context error types.

use std::num::ParseIntError;

use thiserror::Error;

/// Errors surfaced by execution context accessors.
#[derive(Debug, Error)]
pub enum ContextError {
    /// No flow was associated with the context when it was configured
    #[error("graph is not available")]
    GraphUnavailable,

    /// An integer environment variable holds a non-integer value
    #[error("invalid integer for {var}: {value:?}")]
    InvalidInteger {
        /// Environment variable name
        var: &'static str,
        /// Raw value found in the environment
        value: String,
        /// Underlying parse failure
        #[source]
        source: ParseIntError,
    },

    /// Extension name collides with a fixed context field
    #[error("extension name '{0}' is reserved")]
    ReservedName(String),

    /// Extension name is not usable as an attribute
    #[error("invalid extension name: {0:?}")]
    InvalidName(String),

    /// Structural metadata could not be rendered as a value
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for context results.
pub type Result<T> = std::result::Result<T, ContextError>;
