// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graph store implementations for EIR's knowledge graph.
//!
//! [`Neo4jGraphStore`] is the production store; [`MemoryGraphStore`]
//! honours the same contract in-process for tests and Neo4j-less
//! development runs.

pub mod cypher;
pub mod memory;
pub mod neo4j;
pub mod score;

pub use memory::MemoryGraphStore;
pub use neo4j::{Neo4jGraphStore, Neo4jSettings};
pub use score::{cosine_similarity, index_score};
