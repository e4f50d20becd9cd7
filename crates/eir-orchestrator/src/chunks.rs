// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI `chat.completion.chunk` construction.
//!
//! One [`ChunkFactory`] per request keeps the completion id, creation
//! timestamp, and client-facing model stable across every chunk of the
//! response.

use chrono::Utc;
use uuid::Uuid;

use eir_core::types::ToolCallChunk;
use eir_openai::{
    AssistantMessage, ChatCompletion, ChatCompletionChunk, ChunkChoice, ChunkDelta,
    CompletionChoice,
};

/// Marker wrapped around Executive interjections in the output stream.
pub const INTERRUPTION_PREFIX: &str = "\n\n[Executive Interruption: ";
pub const INTERRUPTION_SUFFIX: &str = "]";

/// Renders the interruption block for a corrective document.
pub fn interruption_text(document: &str) -> String {
    format!("{INTERRUPTION_PREFIX}{document}{INTERRUPTION_SUFFIX}")
}

/// Builds the chunks of a single streamed response.
#[derive(Debug, Clone)]
pub struct ChunkFactory {
    id: String,
    model: String,
    created: i64,
}

impl ChunkFactory {
    /// Creates a factory for one request; `model` is echoed on every
    /// chunk exactly as the client sent it.
    pub fn new(model: &str) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            model: model.to_string(),
            created: Utc::now().timestamp(),
        }
    }

    /// The completion id shared by all chunks of this response.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn chunk(&self, delta: ChunkDelta, finish_reason: Option<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }

    /// The first chunk of a response, carrying the assistant role.
    pub fn role_preamble(&self) -> ChatCompletionChunk {
        self.chunk(
            ChunkDelta {
                role: Some("assistant".to_string()),
                ..ChunkDelta::default()
            },
            None,
        )
    }

    /// A delta chunk with content and/or tool-call fragments.
    pub fn delta(
        &self,
        content: Option<String>,
        tool_calls: Option<Vec<ToolCallChunk>>,
    ) -> ChatCompletionChunk {
        self.chunk(
            ChunkDelta {
                role: None,
                content,
                tool_calls,
            },
            None,
        )
    }

    /// An Executive interruption chunk.
    pub fn interruption(&self, document: &str) -> ChatCompletionChunk {
        self.delta(Some(interruption_text(document)), None)
    }

    /// The terminal chunk with a finish reason and empty delta.
    pub fn finish(&self, reason: &str) -> ChatCompletionChunk {
        self.chunk(ChunkDelta::default(), Some(reason.to_string()))
    }

    /// A stream-fatal error chunk; carries the message and finishes the
    /// stream in one chunk.
    pub fn error(&self, message: &str) -> ChatCompletionChunk {
        self.chunk(
            ChunkDelta {
                role: None,
                content: Some(format!("Error: {message}")),
                tool_calls: None,
            },
            Some("stop".to_string()),
        )
    }

    /// Composes the non-streaming `chat.completion` object.
    pub fn completion(&self, content: String, finish_reason: &str) -> ChatCompletion {
        ChatCompletion {
            id: self.id.clone(),
            object: "chat.completion".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant".to_string(),
                    content: Some(content),
                    tool_calls: None,
                },
                finish_reason: Some(finish_reason.to_string()),
            }],
            usage: None,
        }
    }
}
