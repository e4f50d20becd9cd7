// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide embedding provider with lazy, idempotent warm-up.
//!
//! Wraps one [`OnnxTextEncoder`] instance behind a `OnceCell`: the first
//! `embed` call loads and warms the model, later calls reuse it. Every
//! vector leaving the provider is coerced to the configured dimension
//! `D` -- truncated or zero-padded as needed, with non-finite entries
//! replaced by `0.0`.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use eir_core::{Embedder, EirError};

use crate::onnx::OnnxTextEncoder;

/// The shared text-to-vector capability.
pub struct EmbeddingProvider {
    model_path: Option<PathBuf>,
    dimension: usize,
    encoder: OnceCell<OnnxTextEncoder>,
}

impl EmbeddingProvider {
    /// Creates a provider. The model is not loaded until the first
    /// `embed` call.
    pub fn new(model_path: Option<PathBuf>, dimension: usize) -> Self {
        Self {
            model_path,
            dimension,
            encoder: OnceCell::new(),
        }
    }

    async fn encoder(&self) -> Result<&OnnxTextEncoder, EirError> {
        let path = self
            .model_path
            .as_ref()
            .ok_or_else(|| EirError::Embedding("no embedding model configured".to_string()))?;

        self.encoder
            .get_or_try_init(|| async {
                info!(model = %path.display(), "warming embedding model");
                OnnxTextEncoder::new(path)
            })
            .await
    }
}

#[async_trait]
impl Embedder for EmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EirError> {
        let encoder = self.encoder().await?;
        let raw = encoder.encode(text)?;
        if raw.len() != self.dimension {
            debug!(
                produced = raw.len(),
                expected = self.dimension,
                "coercing embedding to configured dimension"
            );
        }
        Ok(fit_dimension(raw, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Coerces a vector to exactly `dimension` entries.
///
/// Longer vectors are truncated, shorter ones zero-padded; NaN and
/// infinite entries become `0.0`.
pub fn fit_dimension(mut vec: Vec<f32>, dimension: usize) -> Vec<f32> {
    for v in &mut vec {
        if !v.is_finite() {
            *v = 0.0;
        }
    }
    vec.resize(dimension, 0.0);
    vec
}
