// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for OpenAI-compatible streaming responses.
//!
//! Converts a reqwest response byte stream into typed [`ChunkEvent`]
//! items using the `eventsource-stream` crate. OpenAI streams carry no
//! event names; every frame is a `data:` line holding either a
//! `chat.completion.chunk` JSON object or the literal `[DONE]` sentinel.

use std::pin::Pin;

use eir_core::EirError;
use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};

use crate::types::ChatCompletionChunk;

/// The sentinel data frame that terminates an OpenAI stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A typed event from an OpenAI-compatible SSE stream.
#[derive(Debug, Clone)]
pub enum ChunkEvent {
    /// An incremental completion chunk.
    Chunk(ChatCompletionChunk),
    /// The `[DONE]` sentinel; no further chunks follow.
    Done,
}

/// Parses a reqwest streaming response into a stream of [`ChunkEvent`]s.
///
/// Malformed chunk JSON surfaces as a provider error; empty keep-alive
/// frames are skipped.
pub fn parse_chunk_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<ChunkEvent, EirError>> + Send>> {
    let byte_stream = response.bytes_stream();
    let event_stream = byte_stream.eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                let data = event.data.trim();
                if data.is_empty() {
                    return None;
                }
                if data == DONE_SENTINEL {
                    return Some(Ok(ChunkEvent::Done));
                }
                Some(
                    serde_json::from_str::<ChatCompletionChunk>(data)
                        .map(ChunkEvent::Chunk)
                        .map_err(|e| EirError::Provider {
                            message: format!("failed to parse completion chunk: {e}"),
                            source: Some(Box::new(e)),
                        }),
                )
            }
            Err(e) => Some(Err(EirError::Provider {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: serve raw SSE text via wiremock to get a real reqwest::Response.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    fn chunk_frame(content: &str) -> String {
        format!(
            "data: {{\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"created\":1700000000,\"model\":\"gpt-4o\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"{content}\"}},\"finish_reason\":null}}]}}\n\n"
        )
    }

    #[tokio::test]
    async fn parse_content_chunks_in_order() {
        let sse = format!("{}{}data: [DONE]\n\n", chunk_frame("The "), chunk_frame("capital"));
        let response = mock_sse_response(&sse).await;
        let mut stream = parse_chunk_stream(response);

        match stream.next().await.unwrap().unwrap() {
            ChunkEvent::Chunk(c) => {
                assert_eq!(c.choices[0].delta.content.as_deref(), Some("The "))
            }
            other => panic!("expected Chunk, got {other:?}"),
        }
        match stream.next().await.unwrap().unwrap() {
            ChunkEvent::Chunk(c) => {
                assert_eq!(c.choices[0].delta.content.as_deref(), Some("capital"))
            }
            other => panic!("expected Chunk, got {other:?}"),
        }
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            ChunkEvent::Done
        ));
    }

    #[tokio::test]
    async fn done_sentinel_is_recognized() {
        let response = mock_sse_response("data: [DONE]\n\n").await;
        let mut stream = parse_chunk_stream(response);
        assert!(matches!(
            stream.next().await.unwrap().unwrap(),
            ChunkEvent::Done
        ));
    }

    #[tokio::test]
    async fn malformed_chunk_surfaces_error() {
        let response = mock_sse_response("data: {not json}\n\n").await;
        let mut stream = parse_chunk_stream(response);
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("failed to parse completion chunk"));
    }

    #[tokio::test]
    async fn finish_reason_chunk_parses() {
        let sse = "data: {\"id\":\"chatcmpl-1\",\"object\":\"chat.completion.chunk\",\"created\":1700000000,\"model\":\"gpt-4o\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\ndata: [DONE]\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_chunk_stream(response);

        match stream.next().await.unwrap().unwrap() {
            ChunkEvent::Chunk(c) => {
                assert_eq!(c.choices[0].finish_reason.as_deref(), Some("stop"))
            }
            other => panic!("expected Chunk, got {other:?}"),
        }
    }
}
