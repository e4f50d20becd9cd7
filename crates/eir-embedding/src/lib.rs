// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider for EIR: local ONNX inference with lazy warm-up
//! and fixed-dimension output coercion.

pub mod onnx;
pub mod provider;

pub use onnx::OnnxTextEncoder;
pub use provider::{fit_dimension, EmbeddingProvider};
