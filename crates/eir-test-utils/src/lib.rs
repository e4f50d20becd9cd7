// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the EIR workspace: a scripted LLM provider and a
//! deterministic embedder.

pub mod mock_embedder;
pub mod mock_provider;

pub use mock_embedder::{trigram_embed, MockEmbedder};
pub use mock_provider::{content_script, MockProvider, ScriptItem};
