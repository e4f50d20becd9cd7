// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events framing for streamed chat completions.
//!
//! Every chunk becomes a `data: <json>` frame; when the orchestrator's
//! stream closes -- normal completion, speaker failure, or timeout --
//! the `data: [DONE]` sentinel is appended. The sentinel is therefore
//! structurally guaranteed on every delivered response.

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use futures::stream::{self, Stream, StreamExt};

use eir_openai::{ChatCompletionChunk, DONE_SENTINEL};

/// Frames an orchestrator chunk stream as an SSE response.
pub fn stream_completion(
    chunks: impl Stream<Item = ChatCompletionChunk> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let frames = chunks
        .map(|chunk| {
            let data = serde_json::to_string(&chunk)
                .unwrap_or_else(|_| "{}".to_string());
            Ok(Event::default().data(data))
        })
        .chain(stream::once(async {
            Ok(Event::default().data(DONE_SENTINEL))
        }));
    Sse::new(frames)
}
