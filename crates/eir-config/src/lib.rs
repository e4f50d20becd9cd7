// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading and model types for EIR.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    EirConfig, EmbeddingConfig, GraphConfig, OrchestratorConfig, ServerConfig, WorkerConfig,
};
