// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cypher assembly helpers for the Neo4j store.
//!
//! Labels, relationship types, and property keys cannot be bound as
//! query parameters, so everything interpolated into query text is
//! validated as a plain identifier first.

use eir_core::types::NodeKind;
use eir_core::EirError;

/// Whether `s` is safe to interpolate into Cypher as an identifier.
pub fn valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a relationship type or property key for interpolation.
pub fn checked_identifier(s: &str) -> Result<&str, EirError> {
    if valid_identifier(s) {
        Ok(s)
    } else {
        Err(EirError::InvalidArguments(format!(
            "not a valid identifier: {s:?}"
        )))
    }
}

/// The vector index name for a node kind.
pub fn vector_index_name(kind: NodeKind) -> String {
    format!("{}_embedding", kind.to_string().to_lowercase())
}

/// Widens an f32 embedding for Bolt parameter binding.
pub fn to_f64(embedding: &[f32]) -> Vec<f64> {
    embedding.iter().map(|&v| v as f64).collect()
}
