// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Executive worker: background evaluation of the Speaker's output
//! against stored knowledge.
//!
//! One evaluation moves through retrieving -> reasoning -> writing-back.
//! Retrieval and reasoning failures degrade to a `none` verdict; the
//! writeback is best-effort and never affects the client response.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use eir_core::traits::provider::{ChatProvider, ProviderRequest};
use eir_core::types::{ChatMessage, NodeKind, TopicHit};
use eir_core::{EirError, EvalVerdict, KnowledgeDocument, BELONGS_TO};
use eir_knowledge::{document, KnowledgeTools};

use crate::json::extract_json_object;

/// Topic retrieval: k and minimum score.
const TOPIC_SEARCH_K: usize = 5;
const TOPIC_MIN_SCORE: f32 = 0.6;
/// Fallback direct knowledge retrieval when no topics match.
const KNOWLEDGE_SEARCH_K: usize = 5;
const KNOWLEDGE_MIN_SCORE: f32 = 0.5;
/// Per-topic knowledge gathering.
const HYBRID_SEARCH_K: usize = 5;
const HYBRID_MIN_SCORE: f32 = 0.6;

/// The fixed system directive for verdict reasoning.
const EXECUTIVE_DIRECTIVE: &str = r#"You are the Executive: a background supervisor watching another model answer a user.

You receive the conversation, the answer produced so far (possibly incomplete), and knowledge retrieved from a trusted store. Decide whether the answer so far contradicts the stored knowledge.

Respond with a JSON object and nothing else:
{"action": "none" | "interrupt", "reason": "<one sentence>", "document": "<corrective text for the user, empty when action is none>"}

Rules:
- "interrupt" only when the answer so far states something the stored knowledge contradicts.
- An incomplete answer that is consistent so far is "none".
- The document must be self-contained and cite the correct fact."#;

/// Phases of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalPhase {
    Idle,
    Retrieving,
    Reasoning,
    WritingBack,
}

impl std::fmt::Display for EvalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalPhase::Idle => write!(f, "idle"),
            EvalPhase::Retrieving => write!(f, "retrieving"),
            EvalPhase::Reasoning => write!(f, "reasoning"),
            EvalPhase::WritingBack => write!(f, "writing-back"),
        }
    }
}

/// The background evaluation worker.
pub struct ExecutiveWorker {
    provider: Arc<dyn ChatProvider>,
    knowledge: KnowledgeTools,
    model: String,
    max_tokens: u32,
}

impl ExecutiveWorker {
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        knowledge: KnowledgeTools,
        model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            knowledge,
            model,
            max_tokens,
        }
    }

    /// Retrieves knowledge relevant to the user query.
    ///
    /// Topics are searched first; when none match, knowledge nodes are
    /// searched directly. Each matched topic is then joined to its
    /// knowledge items.
    pub async fn retrieve(&self, user_query: &str) -> Result<KnowledgeDocument, EirError> {
        let topic_hits = self
            .knowledge
            .vector_search(NodeKind::Topic, user_query, TOPIC_SEARCH_K, TOPIC_MIN_SCORE)
            .await?;

        if topic_hits.is_empty() {
            let direct = self
                .knowledge
                .vector_search(
                    NodeKind::Knowledge,
                    user_query,
                    KNOWLEDGE_SEARCH_K,
                    KNOWLEDGE_MIN_SCORE,
                )
                .await?;
            let items = direct.iter().map(document::item_from_vector_hit).collect();
            return Ok(document::fold(Vec::new(), items));
        }

        let topics: Vec<TopicHit> = topic_hits
            .iter()
            .map(|hit| TopicHit {
                name: hit.name.clone(),
                score: hit.score,
            })
            .collect();

        let mut items = Vec::new();
        for topic in &topic_hits {
            let hits = self
                .knowledge
                .hybrid_search(
                    NodeKind::Topic,
                    &topic.name,
                    BELONGS_TO,
                    NodeKind::Knowledge,
                    HYBRID_SEARCH_K,
                    HYBRID_MIN_SCORE,
                )
                .await?;
            items.extend(hits.iter().map(document::item_from_hybrid_hit));
        }

        Ok(document::fold(topics, items))
    }

    /// Produces a verdict for the current Speaker output.
    ///
    /// Never fails: retrieval and reasoning errors degrade to
    /// `action = none` verdicts with a logged reason.
    pub async fn evaluate(
        &self,
        user_query: &str,
        conversation: &[ChatMessage],
        speaker_output: &str,
    ) -> EvalVerdict {
        let mut phase = EvalPhase::Retrieving;
        debug!(%phase, query = user_query, "executive evaluation started");

        let knowledge_doc = match self.retrieve(user_query).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "knowledge retrieval failed");
                return EvalVerdict {
                    reason: "retrieval failure".into(),
                    ..EvalVerdict::default()
                };
            }
        };

        phase = EvalPhase::Reasoning;
        debug!(%phase, knowledge = !knowledge_doc.is_empty(), "reasoning over speaker output");

        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::text("system", EXECUTIVE_DIRECTIVE),
                ChatMessage::text(
                    "user",
                    build_evaluation_payload(conversation, speaker_output, &knowledge_doc),
                ),
            ],
            max_tokens: Some(self.max_tokens),
            ..ProviderRequest::default()
        };

        let response = match self.provider.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "executive reasoning failed");
                return EvalVerdict {
                    reason: "evaluation failure".into(),
                    document: knowledge_doc.text,
                    ..EvalVerdict::default()
                };
            }
        };

        parse_verdict(&response, &knowledge_doc)
    }

    /// Records the `(user, assistant)` exchange into the graph:
    /// a Topic named after the query (created when missing) with a fresh
    /// Knowledge node attached via `BELONGS_TO`.
    ///
    /// An evaluation that has observed cancellation must not start a
    /// writeback; one already underway runs to completion.
    pub async fn writeback(
        &self,
        user_query: &str,
        assistant_output: &str,
        cancel: &CancellationToken,
    ) -> Result<(), EirError> {
        if cancel.is_cancelled() {
            debug!("cancellation observed, skipping writeback");
            return Ok(());
        }
        let phase = EvalPhase::WritingBack;
        debug!(%phase, query = user_query, "recording exchange");

        let topic_name = user_query.trim();
        if self
            .knowledge
            .find_by_name(NodeKind::Topic, topic_name)
            .await?
            .is_none()
        {
            match self
                .knowledge
                .create_node(
                    NodeKind::Topic,
                    topic_name,
                    "Conversation topic",
                    None,
                    &[],
                    Default::default(),
                )
                .await
            {
                Ok(_) => {}
                // A concurrent writeback won the race; the topic exists.
                Err(EirError::DuplicateName { .. }) => {}
                Err(e) => return Err(e),
            }
        }

        let content = format!("User: {user_query}\nAssistant: {assistant_output}");
        self.knowledge
            .create_node(
                NodeKind::Knowledge,
                &format!("exchange-{}", Uuid::new_v4()),
                &content,
                Some(content.clone()),
                &[topic_name.to_string()],
                Default::default(),
            )
            .await?;
        Ok(())
    }

}

/// Renders the evaluation payload the directive operates on.
fn build_evaluation_payload(
    conversation: &[ChatMessage],
    speaker_output: &str,
    knowledge: &KnowledgeDocument,
) -> String {
    let mut rendered = String::from("Conversation:\n");
    for message in conversation {
        rendered.push_str(&format!(
            "{}: {}\n",
            message.role,
            message.content.flatten_text()
        ));
    }
    rendered.push_str(&format!("\nAnswer so far:\n{speaker_output}\n"));
    if knowledge.is_empty() {
        rendered.push_str("\nStored knowledge: (none retrieved)\n");
    } else {
        rendered.push_str(&format!("\nStored knowledge:\n{}", knowledge.text));
    }
    rendered
}

/// Parses the model's verdict, tolerating fences and surrounding prose.
/// Unparseable responses fall back to the default verdict carrying the
/// retrieved knowledge text.
fn parse_verdict(response: &str, knowledge: &KnowledgeDocument) -> EvalVerdict {
    extract_json_object(response)
        .and_then(|value| serde_json::from_value::<EvalVerdict>(value).ok())
        .unwrap_or_else(|| {
            debug!("verdict response did not parse, defaulting to none");
            EvalVerdict::parse_failure(knowledge.text.clone())
        })
}
