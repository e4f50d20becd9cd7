// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the EIR request-mediating layer.

use thiserror::Error;

use crate::types::NodeKind;

/// The primary error type used across all EIR traits and core operations.
#[derive(Debug, Error)]
pub enum EirError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Graph store errors (connection failure, query failure, mapping).
    #[error("graph error: {message}")]
    Graph {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A node with the same `(kind, name)` already exists.
    #[error("duplicate name: {kind}/{name}")]
    DuplicateName { kind: NodeKind, name: String },

    /// A referenced node does not exist. `key` is the id or name the
    /// caller used to address it.
    #[error("not found: {kind} node {key}")]
    NotFound { kind: NodeKind, key: String },

    /// An embedding vector did not match the configured dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A tool or API call carried malformed or inconsistent arguments.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The embedding model is unavailable or failed to produce a vector.
    ///
    /// Callers treat embedding generation as optional: node creation
    /// proceeds without an embedding, leaving the node invisible to
    /// vector queries.
    #[error("embedding unavailable: {0}")]
    Embedding(String),

    /// LLM provider errors (API failure, malformed stream, model not found).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation exceeded its wall-clock budget.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl EirError {
    /// Shorthand for a graph error without an underlying source.
    pub fn graph(message: impl Into<String>) -> Self {
        EirError::Graph {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        EirError::Provider {
            message: message.into(),
            source: None,
        }
    }
}
