// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider for deterministic testing.
//!
//! [`MockProvider`] implements [`ChatProvider`] with pre-configured
//! stream scripts and completion responses, enabling fast, CI-runnable
//! tests without external API calls. Requests are recorded so tests can
//! assert on context augmentation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use eir_core::traits::provider::{
    ChatProvider, DeltaStream, ProviderRequest, ProviderResponse,
};
use eir_core::types::Delta;
use eir_core::EirError;

/// One scripted item of a mock delta stream.
#[derive(Debug, Clone)]
pub enum ScriptItem {
    /// Yield this delta.
    Delta(Delta),
    /// Yield a provider error with this message.
    Error(String),
}

impl ScriptItem {
    /// Convenience: a content-only delta.
    pub fn content(text: impl Into<String>) -> Self {
        ScriptItem::Delta(Delta::content(text))
    }

    /// Convenience: a terminal delta.
    pub fn finish(reason: impl Into<String>) -> Self {
        ScriptItem::Delta(Delta::finish(reason))
    }
}

/// Builds a script from content fragments, ending with a stop delta.
pub fn content_script(fragments: &[&str]) -> Vec<ScriptItem> {
    let mut items: Vec<ScriptItem> =
        fragments.iter().map(|s| ScriptItem::content(*s)).collect();
    items.push(ScriptItem::finish("stop"));
    items
}

/// A mock provider driven by FIFO queues of scripts and responses.
///
/// `stream` pops a script; with the queue empty it yields a single
/// "mock response" delta. `complete` pops a response string, defaulting
/// to "mock response".
pub struct MockProvider {
    stream_scripts: Arc<Mutex<VecDeque<Vec<ScriptItem>>>>,
    complete_responses: Arc<Mutex<VecDeque<String>>>,
    stream_calls: Arc<Mutex<Vec<ProviderRequest>>>,
    complete_calls: Arc<Mutex<Vec<ProviderRequest>>>,
    delta_delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            stream_scripts: Arc::new(Mutex::new(VecDeque::new())),
            complete_responses: Arc::new(Mutex::new(VecDeque::new())),
            stream_calls: Arc::new(Mutex::new(Vec::new())),
            complete_calls: Arc::new(Mutex::new(Vec::new())),
            delta_delay: None,
        }
    }

    /// Queues a stream script.
    ///
    /// Builder-time only: the locks are uncontended before the provider
    /// is shared.
    pub fn with_stream_script(self, script: Vec<ScriptItem>) -> Self {
        self.stream_scripts
            .try_lock()
            .expect("provider not yet shared")
            .push_back(script);
        self
    }

    /// Queues completion response texts.
    pub fn with_complete_responses(self, responses: Vec<String>) -> Self {
        let mut queue = self
            .complete_responses
            .try_lock()
            .expect("provider not yet shared");
        for response in responses {
            queue.push_back(response);
        }
        drop(queue);
        self
    }

    /// Inserts a pause before each streamed delta, giving concurrent
    /// tasks room to interleave.
    pub fn with_delta_delay(mut self, delay: Duration) -> Self {
        self.delta_delay = Some(delay);
        self
    }

    /// Queues a stream script after construction.
    pub async fn push_stream_script(&self, script: Vec<ScriptItem>) {
        self.stream_scripts.lock().await.push_back(script);
    }

    /// Queues a completion response after construction.
    pub async fn push_complete_response(&self, response: impl Into<String>) {
        self.complete_responses.lock().await.push_back(response.into());
    }

    /// Requests observed by `stream`, in call order.
    pub async fn stream_requests(&self) -> Vec<ProviderRequest> {
        self.stream_calls.lock().await.clone()
    }

    /// Requests observed by `complete`, in call order.
    pub async fn complete_requests(&self) -> Vec<ProviderRequest> {
        self.complete_calls.lock().await.clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, EirError> {
        self.complete_calls.lock().await.push(request);
        let content = self
            .complete_responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string());
        Ok(ProviderResponse {
            content,
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<DeltaStream, EirError> {
        self.stream_calls.lock().await.push(request);
        let script = self
            .stream_scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| content_script(&["mock response"]));

        let delay = self.delta_delay;
        let items = stream::iter(script).then(move |item| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match item {
                ScriptItem::Delta(delta) => Ok(delta),
                ScriptItem::Error(message) => Err(EirError::provider(message)),
            }
        });

        Ok(Box::pin(items))
    }
}
