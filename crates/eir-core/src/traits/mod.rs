// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the seams between EIR components.

pub mod embedding;
pub mod graph;
pub mod provider;

pub use embedding::Embedder;
pub use graph::{GraphStore, QUERY_ROW_CAP};
pub use provider::{ChatProvider, DeltaStream, ProviderRequest, ProviderResponse};
