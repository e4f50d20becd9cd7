// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two LLM workers of EIR: the user-facing Speaker and the
//! background Executive, plus tolerant JSON extraction shared with the
//! orchestrator's JSON-response mode.

pub mod executive;
pub mod json;
pub mod speaker;

pub use executive::{EvalPhase, ExecutiveWorker};
pub use json::extract_json_object;
pub use speaker::{augment_messages, SpeakerWorker};
