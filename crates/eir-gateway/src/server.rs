// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. The debug sub-surface
//! is only routed when enabled in configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use eir_config::EirConfig;
use eir_core::{ChatProvider, Embedder, EirError};
use eir_knowledge::KnowledgeTools;
use eir_openai::OpenAiClient;
use eir_orchestrator::{Orchestrator, OrchestratorSettings};
use eir_workers::{ExecutiveWorker, SpeakerWorker};

use crate::debug;
use crate::handlers;
use crate::overrides::RequestOverrides;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: EirConfig,
    /// Knowledge tools over the graph store and embedder.
    pub knowledge: KnowledgeTools,
    /// The embedding provider backing `/v1/embeddings`.
    pub embedder: Arc<dyn Embedder>,
    /// Default upstream provider for the Speaker.
    pub speaker_provider: Arc<dyn ChatProvider>,
    /// Default upstream provider for the Executive.
    pub executive_provider: Arc<dyn ChatProvider>,
    /// Server-wide shutdown token; per-request tokens are children.
    pub shutdown: CancellationToken,
    /// Process start for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Builds the orchestrator for one request, honouring any header
    /// overrides, and resolves the Speaker's upstream model.
    pub fn orchestrator_for(
        &self,
        overrides: &RequestOverrides,
    ) -> Result<(Orchestrator, String), EirError> {
        let speaker_provider: Arc<dyn ChatProvider> = if overrides.speaker_client_override() {
            let api_base = overrides
                .speaker_api_base
                .clone()
                .unwrap_or_else(|| self.config.speaker.api_base.clone());
            let api_key = overrides
                .speaker_api_key
                .clone()
                .or_else(|| self.config.speaker.api_key.clone())
                .unwrap_or_default();
            Arc::new(OpenAiClient::new(api_base, &api_key)?)
        } else {
            self.speaker_provider.clone()
        };

        let executive_provider: Arc<dyn ChatProvider> = if overrides.executive_client_override() {
            let api_base = overrides
                .executive_api_base
                .clone()
                .unwrap_or_else(|| self.config.executive.api_base.clone());
            let api_key = overrides
                .executive_api_key
                .clone()
                .or_else(|| self.config.executive.api_key.clone())
                .unwrap_or_default();
            Arc::new(OpenAiClient::new(api_base, &api_key)?)
        } else {
            self.executive_provider.clone()
        };

        let speaker_model = overrides
            .speaker_model
            .clone()
            .unwrap_or_else(|| self.config.speaker.model.clone());
        let executive_model = overrides
            .executive_model
            .clone()
            .unwrap_or_else(|| self.config.executive.model.clone());

        let speaker = Arc::new(SpeakerWorker::new(speaker_provider));
        let executive = Arc::new(ExecutiveWorker::new(
            executive_provider,
            self.knowledge.clone(),
            executive_model,
            self.config.executive.max_tokens,
        ));

        let orchestrator = Orchestrator::new(
            self.knowledge.clone(),
            speaker,
            executive,
            OrchestratorSettings {
                reeval_stride: self.config.orchestrator.reeval_stride,
                request_timeout: Duration::from_secs(
                    self.config.orchestrator.request_timeout_secs,
                ),
            },
        );
        Ok((orchestrator, speaker_model))
    }
}

/// Builds the gateway router.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/v1/chat/completions", post(handlers::post_chat_completions))
        .route("/v1/embeddings", post(handlers::post_embeddings))
        .route("/health", get(handlers::get_health));

    if state.config.server.debug {
        info!("debug query surface enabled");
        router = router.route("/debug/query", post(debug::post_debug_query));
    }

    router.with_state(state).layer(CorsLayer::permissive())
}

/// Binds and serves the gateway until the shutdown token fires.
pub async fn start_server(state: AppState) -> Result<(), EirError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| EirError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| EirError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use eir_test_utils::MockProvider;

    #[test]
    fn app_state_is_clone() {
        let state = test_support::state_with(
            Arc::new(MockProvider::new()),
            Arc::new(MockProvider::new()),
            false,
        );
        let _cloned = state.clone();
    }

    #[test]
    fn orchestrator_resolves_default_models() {
        let state = test_support::state_with(
            Arc::new(MockProvider::new()),
            Arc::new(MockProvider::new()),
            false,
        );
        let (_, speaker_model) = state
            .orchestrator_for(&RequestOverrides::default())
            .unwrap();
        assert_eq!(speaker_model, state.config.speaker.model);
    }

    #[test]
    fn model_override_changes_speaker_model() {
        let state = test_support::state_with(
            Arc::new(MockProvider::new()),
            Arc::new(MockProvider::new()),
            false,
        );
        let overrides = RequestOverrides {
            speaker_model: Some("gpt-4o-mini".into()),
            ..RequestOverrides::default()
        };
        let (_, speaker_model) = state.orchestrator_for(&overrides).unwrap();
        assert_eq!(speaker_model, "gpt-4o-mini");
    }
}
