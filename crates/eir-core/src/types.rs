// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the EIR workspace: chat messages and stream
//! deltas, Executive verdicts, and the knowledge-graph domain model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// --- Chat types ---

/// A single message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", "assistant", or "tool".
    pub role: String,

    /// Content -- either a plain string or an array of typed parts.
    pub content: MessageContent,
}

impl ChatMessage {
    /// Creates a message with plain text content.
    pub fn text(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(content.into()),
        }
    }
}

/// Message content -- a simple string or multipart blocks.
///
/// Multipart content is flattened to text by extracting `type = "text"`
/// parts; other part types (images, audio) are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content.
    Text(String),
    /// Array of typed content parts.
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Flattens the content to plain text.
    pub fn flatten_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|p| p.part_type == "text")
                .filter_map(|p| p.text.as_deref())
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

/// A typed part within multipart message content.
///
/// Only `type = "text"` parts carry meaning for EIR; unknown part types
/// deserialize without error and are ignored during flattening.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    /// Part type (e.g., "text", "image_url").
    #[serde(rename = "type")]
    pub part_type: String,

    /// Text payload, present when `part_type = "text"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// --- Stream delta types ---

/// A single item from a Speaker token stream.
///
/// The sequence of deltas is finite, non-restartable, and must be fully
/// drained unless the request is cancelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Delta {
    /// Incremental text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Incremental tool-call fragments, forwarded unmodified to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallChunk>>,

    /// Reason the stream finished, set on the terminal delta only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl Delta {
    /// Creates a content-only delta.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    /// Creates a terminal delta with the given finish reason.
    pub fn finish(reason: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Whether this delta carries tool-call fragments.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|t| !t.is_empty())
    }
}

/// An incremental fragment of a streamed tool call, in the OpenAI
/// `delta.tool_calls` wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallChunk {
    /// Index of the tool call the client is assembling.
    pub index: u32,

    /// Tool call id, present on the first fragment of a call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Call type (always "function"), present on the first fragment.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,

    /// Function name and argument fragments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ToolCallFunction>,
}

/// Function payload of a tool-call fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallFunction {
    /// Function name, present on the first fragment of a call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Partial JSON argument text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

// --- Executive verdict types ---

/// The action component of an Executive verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalAction {
    /// The Speaker's output is acceptable so far.
    #[default]
    None,
    /// The Speaker's output contradicts stored knowledge; inject a correction.
    Interrupt,
}

/// The verdict returned by one Executive evaluation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvalVerdict {
    /// Whether to leave the stream alone or interject.
    #[serde(default)]
    pub action: EvalAction,

    /// Model-stated rationale, used for logging only.
    #[serde(default)]
    pub reason: String,

    /// Corrective content forwarded to the client on interrupt.
    #[serde(default)]
    pub document: String,
}

impl EvalVerdict {
    /// The fallback verdict used when the Executive response cannot be parsed.
    pub fn parse_failure(document: impl Into<String>) -> Self {
        Self {
            action: EvalAction::None,
            reason: "parse failure".into(),
            document: document.into(),
        }
    }
}

/// Knowledge retrieved for a query, folded into a single context document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Topics the query matched, with similarity scores.
    pub topics: Vec<TopicHit>,
    /// Knowledge items gathered from the matched topics.
    pub items: Vec<KnowledgeItem>,
    /// Rendered text handed to the LLM workers. May be empty.
    pub text: String,
}

impl KnowledgeDocument {
    /// Whether retrieval produced nothing usable.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A topic matched during retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicHit {
    pub name: String,
    pub score: f32,
}

/// A knowledge item gathered during retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub name: String,
    pub description: String,
    pub score: f32,
}

// --- Graph domain model ---

/// The closed set of node kinds; doubles as the graph label.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize,
    Deserialize,
)]
pub enum NodeKind {
    TagCategory,
    Tag,
    Topic,
    Knowledge,
}

impl NodeKind {
    /// All node kinds, in hierarchy order.
    pub const ALL: [NodeKind; 4] = [
        NodeKind::TagCategory,
        NodeKind::Tag,
        NodeKind::Topic,
        NodeKind::Knowledge,
    ];

    /// The natural parent kind for `BELONGS_TO` edges, if any.
    pub fn parent(self) -> Option<NodeKind> {
        match self {
            NodeKind::TagCategory => None,
            NodeKind::Tag => Some(NodeKind::TagCategory),
            NodeKind::Topic => Some(NodeKind::Tag),
            NodeKind::Knowledge => Some(NodeKind::Topic),
        }
    }
}

/// The reserved relationship linking a node to its parents.
pub const BELONGS_TO: &str = "BELONGS_TO";

/// A scalar property value; the only value shape nodes may carry in
/// their free-form `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// Properties of a node at creation time.
#[derive(Debug, Clone, Default)]
pub struct NodeProperties {
    /// Unique name within the node's kind.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Summary, mandatory for Knowledge nodes.
    pub summary: Option<String>,
    /// Embedding of `name`; absent when generation failed.
    pub embedding: Option<Vec<f32>>,
    /// Free-form scalar extras.
    pub extra: BTreeMap<String, ScalarValue>,
}

/// A `(kind, name)` reference to an existing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub name: String,
}

/// A request to create edges between two sets of nodes.
///
/// The cross-product of `src_names` x `dst_names` is created; the id of
/// the last created edge is returned.
#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub src_kind: NodeKind,
    pub src_names: Vec<String>,
    pub dst_kind: NodeKind,
    pub dst_names: Vec<String>,
    pub relationship: String,
    pub description: String,
}

/// A mutation applied to an existing node. Deletion and update are
/// mutually exclusive by construction.
#[derive(Debug, Clone)]
pub enum NodeChange {
    /// Delete the node, detaching all incident edges.
    Delete,
    /// Update the given fields.
    Update(NodeUpdate),
}

/// Field updates for a node. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub extra: BTreeMap<String, ScalarValue>,
    /// Regenerated embedding, set by the tools layer when the name changes.
    pub embedding: Option<Vec<f32>>,
}

/// A structural (match/where/return) query against the graph.
#[derive(Debug, Clone, Default)]
pub struct StructuralQuery {
    pub match_clause: String,
    pub where_clause: Option<String>,
    pub return_clause: Option<String>,
    pub params: BTreeMap<String, ScalarValue>,
}

/// One row of a structural or raw query result.
pub type QueryRow = BTreeMap<String, serde_json::Value>;

/// A vector search result row, ordered score-descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub score: f32,
}

/// Identifying fields of a node in a hybrid result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A hybrid search result row: a vector-ranked source joined through a
/// relationship to a structurally related target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridHit {
    pub source: NodeSummary,
    pub relationship: String,
    pub target: NodeSummary,
    pub score: f32,
}
