// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers: chat completions, embeddings, health.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use eir_core::EirError;
use eir_openai::{ApiErrorDetail, ApiErrorResponse, ChatCompletionRequest};
use eir_orchestrator::OrchestratorRequest;

use crate::overrides::RequestOverrides;
use crate::server::AppState;
use crate::sse;

/// POST /v1/chat/completions
///
/// Validates the request, applies header overrides, and routes to the
/// streaming or blocking orchestrator path.
pub async fn post_chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatCompletionRequest>,
) -> Response {
    if body.messages.is_empty() {
        return invalid_messages();
    }

    let overrides = RequestOverrides::from_headers(&headers);
    let (orchestrator, speaker_model) = match state.orchestrator_for(&overrides) {
        Ok(pair) => pair,
        Err(e) => return server_error(&e),
    };

    debug!(
        model = body.model.as_str(),
        speaker_model = speaker_model.as_str(),
        stream = body.stream,
        "chat completion dispatch"
    );

    let stream = body.stream;
    let request = OrchestratorRequest {
        wire: body,
        speaker_model,
    };

    if stream {
        // The token relays server shutdown only; a client disconnect
        // surfaces as the dropped response body closing the chunk
        // channel inside the orchestrator.
        let cancel = state.shutdown.child_token();
        sse::stream_completion(orchestrator.run_streaming(request, cancel)).into_response()
    } else {
        match orchestrator.run_blocking(request).await {
            Ok(completion) => (StatusCode::OK, Json(completion)).into_response(),
            Err(e) => {
                error!(error = %e, "blocking completion failed");
                server_error(&e)
            }
        }
    }
}

/// Request body for POST /v1/embeddings.
#[derive(Debug, Deserialize)]
pub struct EmbeddingsRequest {
    /// Model identifier, echoed in the response.
    #[serde(default)]
    pub model: Option<String>,
    /// Text or texts to embed.
    pub input: EmbeddingsInput,
}

/// The `input` field: a single string or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingsInput {
    One(String),
    Many(Vec<String>),
}

/// One row of the embeddings response.
#[derive(Debug, Serialize)]
pub struct EmbeddingRow {
    pub object: &'static str,
    pub embedding: Vec<f32>,
    pub index: usize,
}

/// Response body for POST /v1/embeddings.
#[derive(Debug, Serialize)]
pub struct EmbeddingsResponse {
    pub object: &'static str,
    pub data: Vec<EmbeddingRow>,
    pub model: String,
    pub usage: EmbeddingsUsage,
}

/// Usage block; EIR does not account tokens.
#[derive(Debug, Default, Serialize)]
pub struct EmbeddingsUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

/// POST /v1/embeddings
pub async fn post_embeddings(
    State(state): State<AppState>,
    Json(body): Json<EmbeddingsRequest>,
) -> Response {
    let texts = match body.input {
        EmbeddingsInput::One(text) => vec![text],
        EmbeddingsInput::Many(texts) => texts,
    };
    if texts.is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "input must not be empty",
            "invalid_request_error",
            Some("input"),
            None,
        );
    }

    let mut data = Vec::with_capacity(texts.len());
    for (index, text) in texts.iter().enumerate() {
        match state.embedder.embed(text).await {
            Ok(embedding) => data.push(EmbeddingRow {
                object: "embedding",
                embedding,
                index,
            }),
            Err(e) => {
                error!(error = %e, "embedding request failed");
                return server_error(&e);
            }
        }
    }

    let response = EmbeddingsResponse {
        object: "list",
        data,
        model: body.model.unwrap_or_else(|| "eir-embedding".to_string()),
        usage: EmbeddingsUsage::default(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// The 400 body for missing or empty `messages`.
fn invalid_messages() -> Response {
    api_error(
        StatusCode::BAD_REQUEST,
        "messages must be a non-empty array",
        "invalid_request_error",
        Some("messages"),
        Some("invalid_messages"),
    )
}

/// A structured OpenAI-style error response.
pub(crate) fn api_error(
    status: StatusCode,
    message: &str,
    error_type: &str,
    param: Option<&str>,
    code: Option<&str>,
) -> Response {
    let body = ApiErrorResponse {
        error: ApiErrorDetail {
            message: message.to_string(),
            error_type: error_type.to_string(),
            param: param.map(str::to_string),
            code: code.map(str::to_string),
        },
    };
    (status, Json(body)).into_response()
}

/// Maps an internal error to a 5xx (or 4xx for argument errors).
pub(crate) fn server_error(e: &EirError) -> Response {
    let (status, error_type, code) = match e {
        EirError::InvalidArguments(_) => (
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "invalid_arguments",
        ),
        EirError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout_error", "timeout"),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "internal_error",
        ),
    };
    api_error(status, &e.to_string(), error_type, None, Some(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{build_router, test_support};
    use axum::body::Body;
    use axum::http::Request;
    use eir_test_utils::{content_script, MockProvider};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn router(speaker: Arc<MockProvider>, executive: Arc<MockProvider>) -> axum::Router {
        build_router(test_support::state_with(speaker, executive, false))
    }

    #[tokio::test]
    async fn empty_messages_rejected_with_400() {
        let app = router(Arc::new(MockProvider::new()), Arc::new(MockProvider::new()));
        let response = app
            .oneshot(
                Request::post("/v1/chat/completions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"model": "eir-default", "messages": []}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["param"], "messages");
        assert_eq!(json["error"]["code"], "invalid_messages");
    }

    #[tokio::test]
    async fn blocking_completion_returns_composed_message() {
        let speaker = Arc::new(MockProvider::new());
        speaker
            .push_stream_script(content_script(&["The capital of France is Paris."]))
            .await;
        let executive = Arc::new(MockProvider::new());
        executive
            .push_complete_response(r#"{"action": "none", "reason": "fine", "document": ""}"#)
            .await;

        let app = router(speaker, executive);
        let response = app
            .oneshot(
                Request::post("/v1/chat/completions")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"model": "eir-default",
                            "messages": [{"role": "user", "content": "capital of France?"}],
                            "stream": false}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["object"], "chat.completion");
        assert_eq!(json["model"], "eir-default");
        assert_eq!(
            json["choices"][0]["message"]["content"],
            "The capital of France is Paris."
        );
    }

    #[tokio::test]
    async fn streaming_completion_frames_sse_with_done() {
        let speaker = Arc::new(MockProvider::new());
        speaker
            .push_stream_script(content_script(&["Hello", " world"]))
            .await;

        let app = router(speaker, Arc::new(MockProvider::new()));
        let response = app
            .oneshot(
                Request::post("/v1/chat/completions")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"model": "eir-default",
                            "messages": [{"role": "user", "content": "greet"}],
                            "stream": true}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/event-stream"), "got {content_type}");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("data: "));
        assert!(text.trim_end().ends_with("data: [DONE]"));
        assert!(text.contains("Hello"));
        // Exactly one [DONE] sentinel per response.
        assert_eq!(text.matches("[DONE]").count(), 1);
    }

    #[tokio::test]
    async fn embeddings_endpoint_embeds_string_and_list() {
        let app = router(Arc::new(MockProvider::new()), Arc::new(MockProvider::new()));
        let response = app
            .clone()
            .oneshot(
                Request::post("/v1/embeddings")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"model": "eir-embedding", "input": "hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["object"], "list");
        assert_eq!(json["data"][0]["object"], "embedding");
        assert_eq!(json["data"][0]["index"], 0);
        assert_eq!(
            json["data"][0]["embedding"].as_array().unwrap().len(),
            test_support::DIM
        );

        let response = app
            .oneshot(
                Request::post("/v1/embeddings")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"input": ["a", "b", "c"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 3);
        assert_eq!(json["data"][2]["index"], 2);
        assert_eq!(json["model"], "eir-embedding");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = router(Arc::new(MockProvider::new()), Arc::new(MockProvider::new()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn debug_route_absent_unless_enabled() {
        let app = router(Arc::new(MockProvider::new()), Arc::new(MockProvider::new()));
        let response = app
            .oneshot(
                Request::post("/debug/query")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "anything"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
