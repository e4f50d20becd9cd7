// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI chat-completions wire types.
//!
//! These types serve double duty: the upstream client serializes requests
//! and parses responses with them, and the gateway emits the same shapes
//! on its own OpenAI-compatible surface, so the proxy speaks one dialect
//! end to end.

use eir_core::types::{ChatMessage, ToolCallChunk};
use serde::{Deserialize, Serialize};

/// A request to the chat completions endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Nucleus sampling parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Presence penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,

    /// Frequency penalty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,

    /// Whether to stream the response.
    #[serde(default)]
    pub stream: bool,

    /// Tool definitions, forwarded unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<serde_json::Value>,

    /// Tool choice directive, forwarded unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,

    /// Response format directive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// The `response_format` request field.
///
/// Only `{"type": "json_object"}` changes EIR behavior; other shapes are
/// forwarded to the upstream model untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Format type (e.g., "json_object", "text", "json_schema").
    #[serde(rename = "type")]
    pub format_type: String,

    /// Any additional format fields, forwarded unchanged.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl ResponseFormat {
    /// Whether this format requests JSON-object collection mode.
    pub fn is_json_object(&self) -> bool {
        self.format_type == "json_object"
    }
}

// --- Streaming response types ---

/// A single `chat.completion.chunk` object from a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Completion id, stable across all chunks of one response.
    pub id: String,

    /// Object type (always "chat.completion.chunk").
    pub object: String,

    /// Unix timestamp of creation.
    pub created: i64,

    /// Model that produced the chunk.
    pub model: String,

    /// Choice deltas; EIR always produces exactly one choice.
    pub choices: Vec<ChunkChoice>,
}

/// One choice within a streamed chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index.
    pub index: u32,

    /// The incremental delta.
    pub delta: ChunkDelta,

    /// Reason the stream finished; null until the terminal chunk.
    pub finish_reason: Option<String>,
}

/// The delta payload of a streamed chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, present on the first chunk of a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Incremental text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Incremental tool-call fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallChunk>>,
}

// --- Non-streaming response types ---

/// A full `chat.completion` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    /// Completion id.
    pub id: String,

    /// Object type (always "chat.completion").
    pub object: String,

    /// Unix timestamp of creation.
    pub created: i64,

    /// Model that produced the completion.
    pub model: String,

    /// Completion choices.
    pub choices: Vec<CompletionChoice>,

    /// Token usage, when the upstream reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// One choice of a full completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChoice {
    /// Choice index.
    pub index: u32,

    /// The assistant message.
    pub message: AssistantMessage,

    /// Reason the generation stopped.
    pub finish_reason: Option<String>,
}

/// The assistant message of a completion choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Role (always "assistant").
    pub role: String,

    /// Message text; null for pure tool-call responses.
    pub content: Option<String>,

    /// Completed tool calls, forwarded unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<serde_json::Value>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

// --- Error body types ---

/// The error body returned by OpenAI-compatible endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Error detail within an error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Human-readable error message.
    pub message: String,

    /// Error type identifier (e.g., "invalid_request_error").
    #[serde(rename = "type")]
    pub error_type: String,

    /// Offending request parameter, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,

    /// Machine-readable error code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
