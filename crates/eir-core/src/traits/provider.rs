// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider trait for the underlying LLM capability.
//!
//! A provider accepts a message list and emits either a full completion
//! or a finite stream of [`Delta`] items. Both the Speaker and the
//! Executive workers run on top of this seam.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::EirError;
use crate::types::{ChatMessage, Delta};

/// A pinned, boxed stream of deltas from a streaming completion.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<Delta, EirError>> + Send>>;

/// A normalized request to an LLM provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Nucleus sampling parameter.
    pub top_p: Option<f64>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Presence penalty.
    pub presence_penalty: Option<f64>,
    /// Frequency penalty.
    pub frequency_penalty: Option<f64>,
    /// Tool definitions, forwarded unchanged.
    pub tools: Option<serde_json::Value>,
    /// Tool choice directive, forwarded unchanged.
    pub tool_choice: Option<serde_json::Value>,
    /// Response format directive, forwarded unchanged.
    pub response_format: Option<serde_json::Value>,
}

/// A full (non-streaming) completion from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Assistant message text.
    pub content: String,
    /// Reason the generation stopped.
    pub finish_reason: Option<String>,
}

/// The opaque LLM capability both workers are built on.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EirError>;

    /// Sends a completion request and returns a stream of deltas.
    ///
    /// The stream is finite and non-restartable; callers must drain it
    /// unless the request is cancelled.
    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, EirError>;
}
