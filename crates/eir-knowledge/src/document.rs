// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folding of retrieval results into a [`KnowledgeDocument`].

use eir_core::types::{HybridHit, KnowledgeItem, TopicHit, VectorHit};
use eir_core::KnowledgeDocument;

/// Folds matched topics and gathered knowledge items into a single
/// document whose `text` carries item names and descriptions together
/// with their similarity scores.
pub fn fold(topics: Vec<TopicHit>, items: Vec<KnowledgeItem>) -> KnowledgeDocument {
    let mut text = String::new();

    if !topics.is_empty() {
        let listed: Vec<String> = topics
            .iter()
            .map(|t| format!("{} ({:.2})", t.name, t.score))
            .collect();
        text.push_str(&format!("Relevant topics: {}\n", listed.join(", ")));
    }

    for item in &items {
        text.push_str(&format!(
            "- {} [{:.2}]: {}\n",
            item.name, item.score, item.description
        ));
    }

    KnowledgeDocument {
        topics,
        items,
        text,
    }
}

/// Converts a direct vector hit into a knowledge item.
pub fn item_from_vector_hit(hit: &VectorHit) -> KnowledgeItem {
    KnowledgeItem {
        name: hit.name.clone(),
        description: hit.description.clone(),
        score: hit.score,
    }
}

/// Converts a hybrid hit's target into a knowledge item carrying the
/// source's similarity score.
pub fn item_from_hybrid_hit(hit: &HybridHit) -> KnowledgeItem {
    KnowledgeItem {
        name: hit.target.name.clone(),
        description: hit.target.description.clone(),
        score: hit.score,
    }
}
