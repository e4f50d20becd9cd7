// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat-completions endpoints.
//!
//! Provides [`OpenAiClient`] which handles request construction, bearer
//! authentication, streaming SSE responses, and transient error retry.
//! The client also implements [`ChatProvider`], adapting the wire chunk
//! stream into the worker-facing [`Delta`] stream.

use std::time::Duration;

use async_trait::async_trait;
use eir_core::traits::provider::{
    ChatProvider, DeltaStream, ProviderRequest, ProviderResponse,
};
use eir_core::types::Delta;
use eir_core::EirError;
use futures::stream::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use std::pin::Pin;
use tracing::{debug, warn};

use crate::sse::{self, ChunkEvent};
use crate::types::{ApiErrorResponse, ChatCompletion, ChatCompletionRequest};

/// HTTP client for an OpenAI-compatible chat API.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503, 529).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_base: String,
    max_retries: u32,
}

impl OpenAiClient {
    /// Creates a new client.
    ///
    /// # Arguments
    /// * `api_base` - OpenAI-compatible `/v1` root (e.g., "https://api.openai.com/v1")
    /// * `api_key` - Bearer token; empty disables the Authorization header
    pub fn new(api_base: impl Into<String>, api_key: &str) -> Result<Self, EirError> {
        let mut headers = HeaderMap::new();
        if !api_key.is_empty() {
            headers.insert(
                "authorization",
                HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                    EirError::Config(format!("invalid API key header value: {e}"))
                })?,
            );
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| EirError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            api_base: api_base.into(),
            max_retries: 1,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    /// Sends a streaming request and returns a stream of chunk events.
    ///
    /// On transient errors (429, 500, 503, 529), retries once after a
    /// 1-second delay.
    pub async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<ChunkEvent, EirError>> + Send>>, EirError> {
        let mut req = request.clone();
        req.stream = true;

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(self.endpoint())
                .json(&req)
                .send()
                .await
                .map_err(|e| EirError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(sse::parse_chunk_stream(response));
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(EirError::provider(format!("API returned {status}: {body}")));
                continue;
            }

            // Non-transient error or exhausted retries.
            let body = response.text().await.unwrap_or_default();
            return Err(EirError::provider(decode_error_body(status, &body)));
        }

        Err(last_error
            .unwrap_or_else(|| EirError::provider("streaming request failed after retries")))
    }

    /// Sends a non-streaming request and returns the full completion.
    ///
    /// On transient errors (429, 500, 503, 529), retries once after a
    /// 1-second delay.
    pub async fn complete_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletion, EirError> {
        let mut req = request.clone();
        req.stream = false;

        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(self.endpoint())
                .json(&req)
                .send()
                .await
                .map_err(|e| EirError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| EirError::Provider {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str::<ChatCompletion>(&body).map_err(|e| {
                    EirError::Provider {
                        message: format!("failed to parse API response: {e}"),
                        source: Some(Box::new(e)),
                    }
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(EirError::provider(format!("API returned {status}: {body}")));
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(EirError::provider(decode_error_body(status, &body)));
        }

        Err(last_error
            .unwrap_or_else(|| EirError::provider("completion request failed after retries")))
    }
}

/// Returns true for HTTP status codes that indicate transient errors
/// worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

/// Decodes a structured API error body, falling back to the raw text.
fn decode_error_body(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        format!(
            "upstream API error ({}): {}",
            api_err.error.error_type, api_err.error.message
        )
    } else {
        format!("API returned {status}: {body}")
    }
}

/// Converts a worker-facing request into the wire request shape.
fn to_wire(request: ProviderRequest, stream: bool) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: request.model,
        messages: request.messages,
        temperature: request.temperature,
        top_p: request.top_p,
        max_tokens: request.max_tokens,
        presence_penalty: request.presence_penalty,
        frequency_penalty: request.frequency_penalty,
        stream,
        tools: request.tools,
        tool_choice: request.tool_choice,
        response_format: request
            .response_format
            .and_then(|v| serde_json::from_value(v).ok()),
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EirError> {
        let completion = self.complete_chat(&to_wire(request, false)).await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EirError::provider("completion carried no choices"))?;
        Ok(ProviderResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, EirError> {
        let chunks = self.stream_chat(&to_wire(request, true)).await?;

        // Adapt chunk events to worker deltas: the [DONE] sentinel ends
        // the stream, empty keep-alive deltas are dropped.
        let deltas = chunks
            .map(|item| match item {
                Ok(ChunkEvent::Done) => Ok(None),
                Ok(ChunkEvent::Chunk(chunk)) => {
                    let Some(choice) = chunk.choices.into_iter().next() else {
                        return Ok(Some(Delta::default()));
                    };
                    Ok(Some(Delta {
                        content: choice.delta.content,
                        tool_calls: choice.delta.tool_calls,
                        finish_reason: choice.finish_reason,
                    }))
                }
                Err(e) => Err(e),
            })
            .take_while(|item| {
                let done = matches!(item, Ok(None));
                futures::future::ready(!done)
            })
            .filter_map(|item| async move {
                match item {
                    Ok(Some(delta)) => {
                        if delta.content.is_none()
                            && !delta.has_tool_calls()
                            && delta.finish_reason.is_none()
                        {
                            None
                        } else {
                            Some(Ok(delta))
                        }
                    }
                    Ok(None) => None,
                    Err(e) => Some(Err(e)),
                }
            });

        Ok(Box::pin(deltas))
    }
}
