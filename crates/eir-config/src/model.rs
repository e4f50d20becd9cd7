// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for EIR.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level EIR configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to
/// sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EirConfig {
    /// Speaker (user-facing) LLM settings.
    #[serde(default)]
    pub speaker: WorkerConfig,

    /// Executive (background evaluator) LLM settings.
    #[serde(default)]
    pub executive: WorkerConfig,

    /// Embedding model settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Neo4j graph store settings.
    #[serde(default)]
    pub graph: GraphConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Orchestrator tuning.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// LLM worker configuration, shared by the Speaker and Executive sections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Model identifier passed to the upstream LLM API.
    #[serde(default = "default_model")]
    pub model: String,

    /// Upstream API key. `None` falls back to `DEFAULT_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Upstream API base URL (an OpenAI-compatible `/v1` root).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Maximum tokens to generate per completion.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            api_base: default_api_base(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// Embedding model configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Path to the ONNX model file. `None` disables real embeddings.
    #[serde(default)]
    pub model_path: Option<String>,

    /// Embedding dimension `D`. Vectors are truncated or zero-padded to
    /// this length.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            dimension: default_dimension(),
        }
    }
}

fn default_dimension() -> usize {
    384
}

/// Neo4j graph store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Bolt URL of the Neo4j server. `None` selects the in-memory store.
    #[serde(default)]
    pub url: Option<String>,

    /// Neo4j username.
    #[serde(default = "default_graph_user")]
    pub user: String,

    /// Neo4j password.
    #[serde(default)]
    pub password: String,

    /// Neo4j database name. `None` uses the server default.
    #[serde(default)]
    pub database: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: default_graph_user(),
            password: String::new(),
            database: None,
        }
    }
}

fn default_graph_user() -> String {
    "neo4j".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enables the `/debug/query` sub-surface and verbose chunk logging.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Orchestrator tuning knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Character count between successive Executive re-evaluations
    /// within a single request.
    #[serde(default = "default_reeval_stride")]
    pub reeval_stride: usize,

    /// Per-request wall-clock timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Time allowed for workers to stop producing side effects after a
    /// client disconnect or server shutdown, in milliseconds.
    #[serde(default = "default_cancel_grace_ms")]
    pub cancel_grace_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            reeval_stride: default_reeval_stride(),
            request_timeout_secs: default_request_timeout_secs(),
            cancel_grace_ms: default_cancel_grace_ms(),
        }
    }
}

fn default_reeval_stride() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_cancel_grace_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = EirConfig::default();
        assert_eq!(config.speaker.model, "gpt-4o");
        assert_eq!(config.speaker.max_tokens, 4096);
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.graph.user, "neo4j");
        assert!(config.graph.url.is_none());
        assert_eq!(config.server.port, 3000);
        assert!(!config.server.debug);
        assert_eq!(config.orchestrator.reeval_stride, 100);
        assert_eq!(config.orchestrator.request_timeout_secs, 120);
        assert_eq!(config.orchestrator.cancel_grace_ms, 500);
    }

    #[test]
    fn config_roundtrips_through_figment() {
        let config = EirConfig::default();
        let figment =
            figment::Figment::from(figment::providers::Serialized::defaults(&config));
        let back: EirConfig = figment.extract().unwrap();
        assert_eq!(back.speaker.model, config.speaker.model);
        assert_eq!(back.orchestrator.reeval_stride, config.orchestrator.reeval_stride);
        assert_eq!(back.embedding.dimension, config.embedding.dimension);
    }
}
