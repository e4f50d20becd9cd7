// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge tools for EIR: the contract layer over the graph store and
//! embedder, the typed tool-call dispatch, and knowledge document
//! folding.

pub mod document;
pub mod toolcall;
pub mod tools;

pub use document::{fold, item_from_hybrid_hit, item_from_vector_hit};
pub use toolcall::{dispatch, ToolCall};
pub use tools::{AlterFields, KnowledgeTools, DEFAULT_MIN_SCORE, DEFAULT_SEARCH_K};
