// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for EIR, the Executive Interrupting Rectifier.
//!
//! This crate provides the foundational trait definitions, error types,
//! and common types used throughout the EIR workspace: the chat and
//! stream-delta model, the Executive verdict shape, and the knowledge
//! graph domain model.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::EirError;
pub use traits::{ChatProvider, DeltaStream, Embedder, GraphStore, ProviderRequest,
    ProviderResponse, QUERY_ROW_CAP};
pub use types::{
    ChatMessage, Delta, EvalAction, EvalVerdict, KnowledgeDocument, MessageContent, NodeKind,
    BELONGS_TO,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _ = EirError::Config("test".into());
        let _ = EirError::graph("test");
        let _ = EirError::provider("test");
        let _ = EirError::DuplicateName {
            kind: NodeKind::Tag,
            name: "t".into(),
        };
        let _ = EirError::NotFound {
            kind: NodeKind::Topic,
            key: "Paris".into(),
        };
        let _ = EirError::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        let _ = EirError::InvalidArguments("bad".into());
        let _ = EirError::Embedding("model missing".into());
        let _ = EirError::Timeout {
            duration: std::time::Duration::from_secs(120),
        };
        let _ = EirError::Internal("test".into());
    }

    #[test]
    fn trait_objects_are_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn ChatProvider>();
        assert_send_sync::<dyn Embedder>();
        assert_send_sync::<dyn GraphStore>();
    }
}
