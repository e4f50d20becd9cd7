// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX text encoder for local embedding inference.
//!
//! Runs a sentence-transformer ONNX model on CPU with zero external API
//! calls. The model emits per-token hidden states of shape `[1, T, H]`;
//! the encoder averages the rows the attention mask marks as real and
//! scales the result to unit length.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use eir_core::EirError;

fn embed_err(context: &str, e: impl std::fmt::Display) -> EirError {
    EirError::Embedding(format!("{context}: {e}"))
}

/// ONNX-backed text encoder.
///
/// Loads the model and its sibling `tokenizer.json` from disk. All
/// inference runs on CPU with a single thread.
pub struct OnnxTextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
}

// Every session use goes through the mutex; tokenizer encoding takes
// &self only.
unsafe impl Send for OnnxTextEncoder {}
unsafe impl Sync for OnnxTextEncoder {}

impl OnnxTextEncoder {
    /// Creates a new encoder from model files on disk.
    ///
    /// `tokenizer.json` must sit next to the ONNX model file.
    pub fn new(model_path: &Path) -> Result<Self, EirError> {
        let tokenizer_path = model_path.with_file_name("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            embed_err(&format!("loading tokenizer {}", tokenizer_path.display()), e)
        })?;

        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.with_intra_threads(1))
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|e| {
                embed_err(&format!("loading ONNX model {}", model_path.display()), e)
            })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Encodes one text into a unit-length hidden-dimension vector.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, EirError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embed_err("tokenizing input", e))?;

        let tokens = encoding.get_ids().len();
        let mask = widen(encoding.get_attention_mask());

        let ids_array = input_row(widen(encoding.get_ids()), tokens)?;
        let mask_array = input_row(mask.clone(), tokens)?;
        let type_ids_array = input_row(widen(encoding.get_type_ids()), tokens)?;

        let ids_value = TensorRef::from_array_view(&ids_array)
            .map_err(|e| embed_err("binding input_ids", e))?;
        let mask_value = TensorRef::from_array_view(&mask_array)
            .map_err(|e| embed_err("binding attention_mask", e))?;
        let type_ids_value = TensorRef::from_array_view(&type_ids_array)
            .map_err(|e| embed_err("binding token_type_ids", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EirError::Embedding("ONNX session mutex poisoned".into()))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => ids_value,
                "attention_mask" => mask_value,
                "token_type_ids" => type_ids_value
            ])
            .map_err(|e| embed_err("running inference", e))?;

        // Hidden states come back flattened from [1, T, H].
        let (shape, hidden_states) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embed_err("reading output tensor", e))?;
        let width = match shape.last() {
            Some(&w) if w > 0 => w as usize,
            _ => return Err(EirError::Embedding("output tensor has no hidden axis".into())),
        };

        let mut pooled = masked_mean(hidden_states, &mask, width);
        normalize(&mut pooled);
        Ok(pooled)
    }
}

/// Widens tokenizer output to the i64 the model inputs expect.
fn widen(values: &[u32]) -> Vec<i64> {
    values.iter().map(|&v| i64::from(v)).collect()
}

/// Shapes one token sequence as a `[1, T]` model input.
fn input_row(values: Vec<i64>, tokens: usize) -> Result<Array2<i64>, EirError> {
    Array2::from_shape_vec((1, tokens), values)
        .map_err(|e| embed_err("shaping model input", e))
}

/// Mean of the token rows the attention mask marks as real.
///
/// Padding rows contribute nothing; an all-padding mask yields zeros.
pub(crate) fn masked_mean(hidden_states: &[f32], mask: &[i64], width: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; width];
    let mut kept = 0usize;

    for (row, &flag) in hidden_states.chunks_exact(width).zip(mask) {
        if flag == 0 {
            continue;
        }
        kept += 1;
        for (acc, value) in pooled.iter_mut().zip(row) {
            *acc += value;
        }
    }

    if kept > 0 {
        let scale = 1.0 / kept as f32;
        for acc in &mut pooled {
            *acc *= scale;
        }
    }
    pooled
}

/// Scales `vec` to unit length; the zero vector stays untouched.
pub(crate) fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return;
    }
    for v in vec.iter_mut() {
        *v /= norm;
    }
}
