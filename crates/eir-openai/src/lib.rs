// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat-completions client and wire types.
//!
//! The wire types are shared between the upstream LLM client and EIR's
//! own OpenAI-compatible surface, so a single dialect flows through the
//! whole proxy.

pub mod client;
pub mod sse;
pub mod types;

pub use client::OpenAiClient;
pub use sse::{ChunkEvent, DONE_SENTINEL};
pub use types::{
    ApiErrorDetail, ApiErrorResponse, AssistantMessage, ChatCompletion, ChatCompletionChunk,
    ChatCompletionRequest, ChunkChoice, ChunkDelta, CompletionChoice, ResponseFormat, Usage,
};
