// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dual-worker orchestrator: races the Speaker and Executive for
//! each request, splices Executive interruptions into the Speaker's
//! stream, and builds the OpenAI-compatible chunks the gateway frames.

pub mod chunks;
pub mod orchestrator;

pub use chunks::{interruption_text, ChunkFactory, INTERRUPTION_PREFIX};
pub use orchestrator::{Orchestrator, OrchestratorRequest, OrchestratorSettings};
