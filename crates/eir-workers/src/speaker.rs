// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Speaker worker: the user-facing stream producer.
//!
//! The Speaker augments the request's message list with retrieved
//! knowledge and forwards it to the underlying LLM, handing the caller
//! the provider's delta stream untouched.

use std::sync::Arc;

use tracing::debug;

use eir_core::traits::provider::{ChatProvider, DeltaStream, ProviderRequest};
use eir_core::types::ChatMessage;
use eir_core::{EirError, KnowledgeDocument};

/// Preamble for the spliced knowledge context message.
const KNOWLEDGE_PREAMBLE: &str =
    "The following stored knowledge is relevant to the user's request. \
     Prefer it over your own recollection when they conflict.";

/// The user-facing streaming worker.
pub struct SpeakerWorker {
    provider: Arc<dyn ChatProvider>,
}

impl SpeakerWorker {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Starts streaming deltas for the request, with the knowledge
    /// document spliced in as a system message just before the last
    /// user message.
    ///
    /// The returned sequence is finite and non-restartable; it must be
    /// fully drained unless the request is cancelled.
    pub async fn stream(
        &self,
        mut request: ProviderRequest,
        knowledge: &KnowledgeDocument,
    ) -> Result<DeltaStream, EirError> {
        request.messages = augment_messages(request.messages, knowledge);
        debug!(
            messages = request.messages.len(),
            knowledge = !knowledge.is_empty(),
            "speaker stream starting"
        );
        self.provider.stream(request).await
    }
}

/// Splices a system message carrying the knowledge text immediately
/// before the last `user` message. An empty document leaves the list
/// untouched.
pub fn augment_messages(
    mut messages: Vec<ChatMessage>,
    knowledge: &KnowledgeDocument,
) -> Vec<ChatMessage> {
    if knowledge.is_empty() {
        return messages;
    }

    let context = ChatMessage::text(
        "system",
        format!("{KNOWLEDGE_PREAMBLE}\n\n{}", knowledge.text.trim_end()),
    );

    let insert_at = messages
        .iter()
        .rposition(|m| m.role == "user")
        .unwrap_or(messages.len());
    messages.insert(insert_at, context);
    messages
}
