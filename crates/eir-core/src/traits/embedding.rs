// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding trait: deterministic `text -> vector` of a fixed dimension.

use async_trait::async_trait;

use crate::error::EirError;

/// The opaque text-embedding capability.
///
/// Implementations must return vectors of exactly `dimension()` floats;
/// shorter or longer model outputs are truncated or zero-padded before
/// they leave the implementation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a single text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EirError>;

    /// The configured vector dimension `D`.
    fn dimension(&self) -> usize;
}
