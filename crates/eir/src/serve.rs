// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `eir serve` command implementation.
//!
//! Wires configuration into the full stack: embedding provider, graph
//! store (Neo4j, or in-memory when no URL is configured), knowledge
//! tools, upstream LLM clients, and the gateway.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use eir_config::EirConfig;
use eir_core::{ChatProvider, Embedder, EirError, GraphStore};
use eir_embedding::EmbeddingProvider;
use eir_gateway::{start_server, AppState};
use eir_graph::{MemoryGraphStore, Neo4jGraphStore, Neo4jSettings};
use eir_knowledge::KnowledgeTools;
use eir_openai::OpenAiClient;

/// Runs the EIR server until interrupted.
pub async fn run_serve(config: EirConfig) -> Result<(), EirError> {
    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingProvider::new(
        config.embedding.model_path.clone().map(PathBuf::from),
        config.embedding.dimension,
    ));

    let store = open_graph_store(&config).await?;
    store.schema_init().await?;

    let knowledge = KnowledgeTools::new(store, embedder.clone());

    let speaker_provider: Arc<dyn ChatProvider> = Arc::new(OpenAiClient::new(
        config.speaker.api_base.clone(),
        config.speaker.api_key.as_deref().unwrap_or_default(),
    )?);
    let executive_provider: Arc<dyn ChatProvider> = Arc::new(OpenAiClient::new(
        config.executive.api_base.clone(),
        config.executive.api_key.as_deref().unwrap_or_default(),
    )?);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    let grace_ms = config.orchestrator.cancel_grace_ms;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_token.cancel();
            // Give in-flight writebacks their grace window.
            tokio::time::sleep(std::time::Duration::from_millis(grace_ms)).await;
        }
    });

    info!(
        speaker = config.speaker.model.as_str(),
        executive = config.executive.model.as_str(),
        dimension = config.embedding.dimension,
        "EIR starting"
    );

    let state = AppState {
        config,
        knowledge,
        embedder,
        speaker_provider,
        executive_provider,
        shutdown,
        start_time: std::time::Instant::now(),
    };

    start_server(state).await
}

/// Runs `eir schema-init`: creates constraints and vector indexes on the
/// configured Neo4j server.
pub async fn run_schema_init(config: EirConfig) -> Result<(), EirError> {
    let Some(url) = &config.graph.url else {
        return Err(EirError::Config(
            "schema-init requires a configured Neo4j URL (graph.url or NEO4J_URL)".into(),
        ));
    };

    let store = Neo4jGraphStore::connect(
        Neo4jSettings {
            url: url.clone(),
            user: config.graph.user.clone(),
            password: config.graph.password.clone(),
            database: config.graph.database.clone(),
        },
        config.embedding.dimension,
    )
    .await?;

    store.schema_init().await?;
    info!(dimension = config.embedding.dimension, "schema initialized");
    Ok(())
}

/// Opens the configured graph store; without a Neo4j URL the in-memory
/// store backs the process (contents die with it).
async fn open_graph_store(config: &EirConfig) -> Result<Arc<dyn GraphStore>, EirError> {
    match &config.graph.url {
        Some(url) => {
            let store = Neo4jGraphStore::connect(
                Neo4jSettings {
                    url: url.clone(),
                    user: config.graph.user.clone(),
                    password: config.graph.password.clone(),
                    database: config.graph.database.clone(),
                },
                config.embedding.dimension,
            )
            .await?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("no Neo4j URL configured, knowledge lives in memory only");
            Ok(Arc::new(MemoryGraphStore::new(config.embedding.dimension)))
        }
    }
}
