// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedder for tests.
//!
//! Hashes character trigrams into a fixed number of buckets and
//! L2-normalizes the counts. Identical strings embed identically, and
//! strings sharing most of their trigrams ("Quantum Computing" vs
//! "quantum computation") land close in cosine space, so retrieval
//! tests exercise real similarity geometry without a model download.

use async_trait::async_trait;

use eir_core::{Embedder, EirError};

/// Trigram-hashing embedder with a configurable dimension.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "dimension must be positive");
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EirError> {
        Ok(trigram_embed(text, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embeds `text` by counting hashed character trigrams.
pub fn trigram_embed(text: &str, dimension: usize) -> Vec<f32> {
    let normalized: Vec<char> = format!(" {} ", text.to_lowercase()).chars().collect();
    let mut buckets = vec![0.0f32; dimension];

    for window in normalized.windows(3) {
        let mut bytes = Vec::with_capacity(12);
        for c in window {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
        buckets[(fnv1a(&bytes) as usize) % dimension] += 1.0;
    }

    let norm: f32 = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in &mut buckets {
            *v /= norm;
        }
    }
    buckets
}

/// FNV-1a, chosen for determinism across runs and platforms.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
