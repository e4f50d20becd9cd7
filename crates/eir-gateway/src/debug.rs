// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The debug query sub-surface (`POST /debug/query`).
//!
//! When `tool_params` is provided, one knowledge tool is inferred from
//! the query text and parameter shape and dispatched directly; otherwise
//! the free-text query is delegated to the Executive's LLM.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::debug;

use eir_core::traits::provider::ProviderRequest;
use eir_core::types::ChatMessage;
use eir_knowledge::{dispatch, ToolCall};

use crate::handlers::server_error;
use crate::server::AppState;

/// Request body for POST /debug/query.
#[derive(Debug, Deserialize)]
pub struct DebugQueryRequest {
    /// Free-text query; may name a knowledge tool explicitly.
    pub query: String,
    /// Tool parameters; presence switches to tool inference.
    #[serde(default)]
    pub tool_params: Option<serde_json::Value>,
}

/// Explicit tool mentions recognized in query text, in match order.
const TOOL_MENTIONS: [(&str, &str); 7] = [
    ("knowledge_create_node", "createNode"),
    ("knowledge_create_edge", "createEdge"),
    ("knowledge_alter", "alter"),
    ("knowledge_structural_search", "structuralSearch"),
    ("knowledge_vector_search", "vectorSearch"),
    ("knowledge_hybrid_search", "hybridSearch"),
    ("knowledge_raw_query", "rawQuery"),
];

/// Infers a tool call from the query text and parameter shape.
///
/// Priority: explicit `knowledge_*` mention in the query text, then
/// `query` selects rawQuery, then `nodeType`+`text`+`relationshipType`+
/// `targetType` selects hybridSearch, then `nodeType`+`text` selects
/// vectorSearch, then `nodeType` (with `belongsTo` or alone) selects
/// createNode.
pub fn infer_tool(query: &str, params: &serde_json::Value) -> Option<ToolCall> {
    let obj = params.as_object()?;

    let tag = TOOL_MENTIONS
        .iter()
        .find(|(mention, _)| query.contains(mention))
        .map(|(_, tag)| *tag)
        .or_else(|| obj.contains_key("query").then_some("rawQuery"))
        .or_else(|| {
            (obj.contains_key("nodeType")
                && obj.contains_key("text")
                && obj.contains_key("relationshipType")
                && obj.contains_key("targetType"))
            .then_some("hybridSearch")
        })
        .or_else(|| {
            (obj.contains_key("nodeType") && obj.contains_key("text")).then_some("vectorSearch")
        })
        .or_else(|| obj.contains_key("nodeType").then_some("createNode"))?;

    let mut tagged = obj.clone();
    tagged.insert("tool".to_string(), serde_json::json!(tag));
    serde_json::from_value(serde_json::Value::Object(tagged)).ok()
}

/// POST /debug/query
pub async fn post_debug_query(
    State(state): State<AppState>,
    Json(body): Json<DebugQueryRequest>,
) -> Response {
    if let Some(params) = &body.tool_params {
        if let Some(call) = infer_tool(&body.query, params) {
            let tool = call.name();
            debug!(tool, "debug query dispatching inferred tool");
            return match dispatch(&state.knowledge, call).await {
                Ok(result) => (
                    StatusCode::OK,
                    Json(serde_json::json!({"tool": tool, "result": result})),
                )
                    .into_response(),
                Err(e) => server_error(&e),
            };
        }
        debug!("tool_params present but no tool inferred, delegating to executive");
    }

    // Delegate the free-text query to the Executive's LLM.
    let request = ProviderRequest {
        model: state.config.executive.model.clone(),
        messages: vec![ChatMessage::text("user", body.query)],
        max_tokens: Some(state.config.executive.max_tokens),
        ..ProviderRequest::default()
    };
    match state.executive_provider.complete(request).await {
        Ok(response) => (
            StatusCode::OK,
            Json(serde_json::json!({"response": response.content})),
        )
            .into_response(),
        Err(e) => server_error(&e),
    }
}
