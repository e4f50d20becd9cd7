// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed tool calls and the single dispatch entry point.
//!
//! The external API and the debug surface address the knowledge tools
//! through [`ToolCall`], a closed tagged variant, instead of sniffing
//! untyped payload shapes. Field names match the JSON the API accepts
//! (`nodeType`, `belongsTo`, `relationshipType`, ...).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use eir_core::types::{NodeKind, ScalarValue};
use eir_core::EirError;

use crate::tools::{AlterFields, KnowledgeTools, DEFAULT_MIN_SCORE, DEFAULT_SEARCH_K};

/// A knowledge tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tool")]
pub enum ToolCall {
    #[serde(rename = "createNode")]
    CreateNode {
        #[serde(rename = "nodeType")]
        node_type: NodeKind,
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        summary: Option<String>,
        #[serde(rename = "belongsTo", default)]
        belongs_to: Vec<String>,
        #[serde(default)]
        extra: BTreeMap<String, ScalarValue>,
    },

    #[serde(rename = "createEdge")]
    CreateEdge {
        #[serde(rename = "sourceType")]
        source_type: NodeKind,
        #[serde(rename = "sourceNames")]
        source_names: Vec<String>,
        #[serde(rename = "targetType")]
        target_type: NodeKind,
        #[serde(rename = "targetNames")]
        target_names: Vec<String>,
        relationship: String,
        #[serde(default)]
        description: String,
    },

    #[serde(rename = "alter")]
    Alter {
        #[serde(rename = "nodeType")]
        node_type: NodeKind,
        id: i64,
        #[serde(default)]
        delete: bool,
        #[serde(default)]
        fields: Option<AlterFields>,
    },

    #[serde(rename = "structuralSearch")]
    StructuralSearch {
        #[serde(rename = "match")]
        match_clause: String,
        #[serde(rename = "where", default)]
        where_clause: Option<String>,
        #[serde(rename = "return", default)]
        return_clause: Option<String>,
        #[serde(default)]
        params: BTreeMap<String, ScalarValue>,
    },

    #[serde(rename = "vectorSearch")]
    VectorSearch {
        #[serde(rename = "nodeType")]
        node_type: NodeKind,
        text: String,
        #[serde(default = "default_k")]
        k: usize,
        #[serde(rename = "minScore", default = "default_min_score")]
        min_score: f32,
    },

    #[serde(rename = "hybridSearch")]
    HybridSearch {
        #[serde(rename = "nodeType")]
        node_type: NodeKind,
        text: String,
        #[serde(rename = "relationshipType")]
        relationship_type: String,
        #[serde(rename = "targetType")]
        target_type: NodeKind,
        #[serde(default = "default_k")]
        k: usize,
        #[serde(rename = "minScore", default = "default_min_score")]
        min_score: f32,
    },

    #[serde(rename = "rawQuery")]
    RawQuery { query: String },
}

impl ToolCall {
    /// The wire name of this tool, as used in the `tool` tag.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::CreateNode { .. } => "createNode",
            ToolCall::CreateEdge { .. } => "createEdge",
            ToolCall::Alter { .. } => "alter",
            ToolCall::StructuralSearch { .. } => "structuralSearch",
            ToolCall::VectorSearch { .. } => "vectorSearch",
            ToolCall::HybridSearch { .. } => "hybridSearch",
            ToolCall::RawQuery { .. } => "rawQuery",
        }
    }
}

fn default_k() -> usize {
    DEFAULT_SEARCH_K
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}

/// Executes a tool call and returns its result as a JSON value.
pub async fn dispatch(
    tools: &KnowledgeTools,
    call: ToolCall,
) -> Result<serde_json::Value, EirError> {
    match call {
        ToolCall::CreateNode {
            node_type,
            name,
            description,
            summary,
            belongs_to,
            extra,
        } => {
            let id = tools
                .create_node(node_type, &name, &description, summary, &belongs_to, extra)
                .await?;
            Ok(serde_json::json!({"id": id, "nodeType": node_type, "name": name}))
        }
        ToolCall::CreateEdge {
            source_type,
            source_names,
            target_type,
            target_names,
            relationship,
            description,
        } => {
            let id = tools
                .create_edge(
                    source_type,
                    source_names,
                    target_type,
                    target_names,
                    &relationship,
                    &description,
                )
                .await?;
            Ok(serde_json::json!({"id": id, "relationship": relationship}))
        }
        ToolCall::Alter {
            node_type,
            id,
            delete,
            fields,
        } => {
            tools.alter(node_type, id, delete, fields).await?;
            Ok(serde_json::json!({"id": id, "deleted": delete}))
        }
        ToolCall::StructuralSearch {
            match_clause,
            where_clause,
            return_clause,
            params,
        } => {
            let rows = tools
                .structural_search(&match_clause, where_clause, return_clause, params)
                .await?;
            Ok(serde_json::json!({"rows": rows}))
        }
        ToolCall::VectorSearch {
            node_type,
            text,
            k,
            min_score,
        } => {
            let hits = tools.vector_search(node_type, &text, k, min_score).await?;
            Ok(serde_json::json!({"hits": hits}))
        }
        ToolCall::HybridSearch {
            node_type,
            text,
            relationship_type,
            target_type,
            k,
            min_score,
        } => {
            let hits = tools
                .hybrid_search(node_type, &text, &relationship_type, target_type, k, min_score)
                .await?;
            Ok(serde_json::json!({"hits": hits}))
        }
        ToolCall::RawQuery { query } => {
            let rows = tools.raw_search(&query).await?;
            Ok(serde_json::json!({"rows": rows}))
        }
    }
}
