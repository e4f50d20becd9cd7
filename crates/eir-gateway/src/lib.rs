// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The OpenAI-compatible HTTP surface of EIR: chat completions with SSE
//! streaming, the embeddings endpoint, health, per-request worker
//! overrides, and the optional debug query sub-surface.

pub mod debug;
pub mod handlers;
pub mod overrides;
pub mod server;
pub mod sse;

pub use overrides::RequestOverrides;
pub use server::{build_router, start_server, AppState};
