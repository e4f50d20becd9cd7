// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dual-worker orchestrator.
//!
//! One request owns a Speaker consumer loop, a chain of Executive
//! evaluations of which exactly one is "latest", and an outbound chunk
//! channel. Speaker tokens are forwarded in production order; Executive
//! verdicts are polled without blocking, and at most one interruption
//! chunk is spliced into the stream, always on a chunk boundary.
//!
//! Every terminating path leaves the outbound stream closed after a
//! terminal chunk (finish or error); the SSE writer appends the `[DONE]`
//! sentinel when the stream closes.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use eir_core::traits::provider::ProviderRequest;
use eir_core::types::{ChatMessage, EvalAction, EvalVerdict, NodeKind};
use eir_core::{EirError, KnowledgeDocument};
use eir_knowledge::{document, KnowledgeTools};
use eir_openai::{ChatCompletion, ChatCompletionChunk, ChatCompletionRequest};
use eir_workers::{extract_json_object, ExecutiveWorker, SpeakerWorker};

use crate::chunks::{interruption_text, ChunkFactory};

/// Knowledge prefetch before dispatch: k and minimum score.
const PREFETCH_K: usize = 3;
const PREFETCH_MIN_SCORE: f32 = 0.6;

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Characters of accumulated Speaker output between successive
    /// Executive re-evaluations.
    pub reeval_stride: usize,
    /// Wall-clock budget for one request.
    pub request_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            reeval_stride: 100,
            request_timeout: Duration::from_secs(120),
        }
    }
}

/// A normalized request handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorRequest {
    /// The client's request; `model` is echoed on emitted chunks.
    pub wire: ChatCompletionRequest,
    /// The upstream model identifier the Speaker runs on.
    pub speaker_model: String,
}

/// Launches and supervises the Speaker and Executive for one request.
pub struct Orchestrator {
    knowledge: KnowledgeTools,
    speaker: Arc<SpeakerWorker>,
    executive: Arc<ExecutiveWorker>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        knowledge: KnowledgeTools,
        speaker: Arc<SpeakerWorker>,
        executive: Arc<ExecutiveWorker>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            knowledge,
            speaker,
            executive,
            settings,
        }
    }

    /// Runs the request in streaming mode.
    ///
    /// The returned stream yields OpenAI completion chunks and closes
    /// after a terminal chunk. `cancel` carries the server's shutdown
    /// signal; firing it stops both workers. A client disconnect is a
    /// different path: dropping the returned stream closes the outbound
    /// channel, and the forward loop halts on its next send. Either
    /// way, a writeback already underway completes in the background.
    pub fn run_streaming(
        &self,
        request: OrchestratorRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ChatCompletionChunk> + Send + 'static {
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(drive(
            self.knowledge.clone(),
            self.speaker.clone(),
            self.executive.clone(),
            self.settings.clone(),
            request,
            cancel,
            tx,
        ));
        ReceiverStream::new(rx)
    }

    /// Runs the request in non-streaming mode: both workers run
    /// concurrently, and the Executive's verdict is applied to the
    /// composed message content.
    pub async fn run_blocking(
        &self,
        request: OrchestratorRequest,
    ) -> Result<ChatCompletion, EirError> {
        let factory = ChunkFactory::new(&request.wire.model);
        let user_query = last_user_text(&request.wire.messages);
        let conversation = request.wire.messages.clone();

        let knowledge_doc = prefetch(&self.knowledge, &user_query).await;
        let provider_request = to_provider_request(&request);

        let speaker_task = async {
            let mut deltas = self.speaker.stream(provider_request, &knowledge_doc).await?;
            let mut text = String::new();
            let mut finish = None;
            while let Some(item) = deltas.next().await {
                let delta = item?;
                if let Some(content) = delta.content {
                    text.push_str(&content);
                }
                if let Some(reason) = delta.finish_reason {
                    finish = Some(reason);
                }
            }
            Ok::<_, EirError>((text, finish))
        };
        let executive_task = self.executive.evaluate(&user_query, &conversation, "");

        let (speaker_result, verdict) = tokio::time::timeout(
            self.settings.request_timeout,
            futures::future::join(speaker_task, executive_task),
        )
        .await
        .map_err(|_| EirError::Timeout {
            duration: self.settings.request_timeout,
        })?;
        let (text, finish) = speaker_result?;

        // Record the real exchange, best-effort and serialized after it.
        let writeback_token = CancellationToken::new();
        if let Err(e) = self
            .executive
            .writeback(&user_query, &text, &writeback_token)
            .await
        {
            warn!(error = %e, "knowledge writeback failed");
        }

        let mut content = text;
        if verdict.action == EvalAction::Interrupt {
            content.push_str(&interruption_text(&verdict.document));
        }
        let finish_reason = match finish.as_deref() {
            Some("tool_calls") => "tool_calls",
            _ => "stop",
        };
        Ok(factory.completion(content, finish_reason))
    }
}

/// The chain of Executive evaluations for one request.
///
/// Exactly one task is "latest"; spawning a successor cancels the
/// predecessor's token (skipping a writeback it has not yet started)
/// and abandons its result.
struct ExecChain {
    executive: Arc<ExecutiveWorker>,
    user_query: String,
    conversation: Vec<ChatMessage>,
    latest: Option<oneshot::Receiver<EvalVerdict>>,
    latest_token: Option<CancellationToken>,
    /// Serializes this request's writebacks among themselves.
    writeback_lock: Arc<tokio::sync::Mutex<()>>,
    generation: u32,
}

impl ExecChain {
    fn new(
        executive: Arc<ExecutiveWorker>,
        user_query: String,
        conversation: Vec<ChatMessage>,
    ) -> Self {
        Self {
            executive,
            user_query,
            conversation,
            latest: None,
            latest_token: None,
            writeback_lock: Arc::new(tokio::sync::Mutex::new(())),
            generation: 0,
        }
    }

    /// Spawns an evaluation of the given accumulated output, superseding
    /// the previous task.
    ///
    /// The verdict is delivered before the writeback starts, so polls
    /// never wait on graph writes; the writeback itself is best-effort,
    /// cancellation-aware, and serialized against this request's other
    /// writebacks.
    fn spawn(&mut self, accumulated: String) {
        if let Some(token) = self.latest_token.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        let executive = self.executive.clone();
        let user_query = self.user_query.clone();
        let conversation = self.conversation.clone();
        let task_token = token.clone();
        let writeback_lock = self.writeback_lock.clone();
        self.generation += 1;
        let generation = self.generation;

        tokio::spawn(async move {
            debug!(generation, chars = accumulated.len(), "executive evaluation spawned");
            let verdict = executive
                .evaluate(&user_query, &conversation, &accumulated)
                .await;
            // The receiver may be gone when this task was superseded.
            let _ = tx.send(verdict);

            let _guard = writeback_lock.lock().await;
            if let Err(e) = executive
                .writeback(&user_query, &accumulated, &task_token)
                .await
            {
                warn!(error = %e, "knowledge writeback failed");
            }
        });

        self.latest = Some(rx);
        self.latest_token = Some(token);
    }

    /// Non-blocking poll of the latest task's verdict.
    fn try_verdict(&mut self) -> Option<EvalVerdict> {
        let rx = self.latest.as_mut()?;
        match rx.try_recv() {
            Ok(verdict) => {
                self.latest = None;
                Some(verdict)
            }
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.latest = None;
                None
            }
        }
    }

    /// Awaits the latest outstanding task to completion.
    async fn final_verdict(&mut self) -> Option<EvalVerdict> {
        let rx = self.latest.take()?;
        rx.await.ok()
    }

    /// Cancels the latest task. A writeback already underway completes.
    fn cancel(&mut self) {
        if let Some(token) = self.latest_token.take() {
            token.cancel();
        }
        self.latest = None;
    }

    /// Abandons the latest result without cancelling the task, letting
    /// its writeback run to completion.
    fn detach(&mut self) {
        self.latest = None;
        self.latest_token = None;
    }
}

/// The per-request forward loop.
#[allow(clippy::too_many_lines)]
async fn drive(
    knowledge: KnowledgeTools,
    speaker: Arc<SpeakerWorker>,
    executive: Arc<ExecutiveWorker>,
    settings: OrchestratorSettings,
    request: OrchestratorRequest,
    cancel: CancellationToken,
    tx: mpsc::Sender<ChatCompletionChunk>,
) {
    let factory = ChunkFactory::new(&request.wire.model);
    let user_query = last_user_text(&request.wire.messages);
    let json_mode = request
        .wire
        .response_format
        .as_ref()
        .is_some_and(|f| f.is_json_object())
        && request.wire.stream;
    let conversation = request.wire.messages.clone();
    let deadline = tokio::time::Instant::now() + settings.request_timeout;

    // Prefetch knowledge context for the Speaker.
    let knowledge_doc = prefetch(&knowledge, &user_query).await;

    // Launch the Speaker.
    let provider_request = to_provider_request(&request);
    let mut deltas = match speaker.stream(provider_request, &knowledge_doc).await {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "speaker launch failed");
            let _ = tx.send(factory.error(&e.to_string())).await;
            return;
        }
    };

    if tx.send(factory.role_preamble()).await.is_err() {
        return;
    }

    // Launch the first Executive evaluation against empty output.
    let mut chain = ExecChain::new(executive, user_query, conversation);
    chain.spawn(String::new());

    let mut accumulated = String::new();
    let mut strides_crossed = 0usize;
    let mut interrupted = false;
    let mut pending_interruption: Option<String> = None;
    let mut open_tool_call = false;
    let mut speaker_finish: Option<String> = None;

    let timeout = tokio::time::sleep_until(deadline);
    tokio::pin!(timeout);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(request_id = factory.id(), "shutdown signal received, cancelling workers");
                chain.cancel();
                return;
            }
            _ = &mut timeout => {
                warn!(request_id = factory.id(), "request deadline exceeded");
                chain.cancel();
                let _ = tx.send(factory.error("request timed out")).await;
                return;
            }
            next = deltas.next() => {
                let delta = match next {
                    None => break,
                    Some(Err(e)) => {
                        error!(error = %e, "speaker stream failed");
                        chain.cancel();
                        let _ = tx.send(factory.error(&e.to_string())).await;
                        return;
                    }
                    Some(Ok(delta)) => delta,
                };

                if let Some(content) = &delta.content {
                    accumulated.push_str(content);
                }
                if delta.has_tool_calls() {
                    open_tool_call = true;
                }
                if let Some(reason) = &delta.finish_reason {
                    speaker_finish = Some(reason.clone());
                    open_tool_call = false;
                }

                // Forward, except content collection in JSON mode.
                // A failed send means the client dropped the response
                // stream; that is the disconnect signal.
                let forward_content = if json_mode { None } else { delta.content.clone() };
                let forward_tools = delta.tool_calls.clone().filter(|t| !t.is_empty());
                if forward_content.is_some() || forward_tools.is_some() {
                    if tx.send(factory.delta(forward_content, forward_tools)).await.is_err() {
                        chain.cancel();
                        return;
                    }
                }

                // Re-evaluate at every new stride boundary.
                if settings.reeval_stride > 0 {
                    let crossed = accumulated.len() / settings.reeval_stride;
                    if crossed > strides_crossed {
                        strides_crossed = crossed;
                        chain.spawn(accumulated.clone());
                    }
                }

                // Non-blocking verdict poll.
                if let Some(verdict) = chain.try_verdict() {
                    match verdict.action {
                        EvalAction::None => {}
                        EvalAction::Interrupt if interrupted => {
                            debug!(document = %verdict.document, "repeat interruption ignored");
                        }
                        EvalAction::Interrupt if open_tool_call => {
                            debug!("interruption deferred until the tool call completes");
                            pending_interruption = Some(verdict.document);
                        }
                        EvalAction::Interrupt => {
                            if tx.send(factory.interruption(&verdict.document)).await.is_err() {
                                chain.cancel();
                                return;
                            }
                            interrupted = true;
                        }
                    }
                }

                // Deliver a deferred interruption once the tool call is done.
                if !interrupted && !open_tool_call {
                    if let Some(document) = pending_interruption.take() {
                        if tx.send(factory.interruption(&document)).await.is_err() {
                            chain.cancel();
                            return;
                        }
                        interrupted = true;
                    }
                }
            }
        }
    }

    // Speaker ended. In JSON mode, assemble and emit the collected text.
    if json_mode {
        let content = match extract_json_object(&accumulated) {
            Some(value) => value.to_string(),
            None => serde_json::json!({
                "error": "Failed to parse as JSON",
                "content": accumulated,
            })
            .to_string(),
        };
        if tx.send(factory.delta(Some(content), None)).await.is_err() {
            chain.cancel();
            return;
        }
    }

    // A deferral that never found a boundary flushes now.
    if !interrupted {
        if let Some(document) = pending_interruption.take() {
            if tx.send(factory.interruption(&document)).await.is_err() {
                chain.cancel();
                return;
            }
            interrupted = true;
        }
    }

    // Final verdict from the latest outstanding evaluation.
    if interrupted {
        chain.detach();
    } else {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        match tokio::time::timeout(remaining, chain.final_verdict()).await {
            Ok(Some(verdict)) if verdict.action == EvalAction::Interrupt => {
                if tx.send(factory.interruption(&verdict.document)).await.is_err() {
                    chain.cancel();
                    return;
                }
            }
            Ok(_) => {}
            Err(_) => {
                warn!("final executive verdict timed out");
                chain.cancel();
            }
        }
    }

    let finish_reason = match speaker_finish.as_deref() {
        Some("tool_calls") => "tool_calls",
        _ => "stop",
    };
    let _ = tx.send(factory.finish(finish_reason)).await;
}

/// Prefetches knowledge context; failure degrades to no context.
async fn prefetch(knowledge: &KnowledgeTools, user_query: &str) -> KnowledgeDocument {
    if user_query.trim().is_empty() {
        return KnowledgeDocument::default();
    }
    match knowledge
        .vector_search(NodeKind::Knowledge, user_query, PREFETCH_K, PREFETCH_MIN_SCORE)
        .await
    {
        Ok(hits) => {
            let items = hits.iter().map(document::item_from_vector_hit).collect();
            document::fold(Vec::new(), items)
        }
        Err(e) => {
            warn!(error = %e, "knowledge prefetch failed, proceeding without context");
            KnowledgeDocument::default()
        }
    }
}

/// The flattened text of the last user message, or empty.
fn last_user_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.flatten_text())
        .unwrap_or_default()
}

/// Converts the client request into the Speaker's provider request.
fn to_provider_request(request: &OrchestratorRequest) -> ProviderRequest {
    let wire = &request.wire;
    ProviderRequest {
        model: request.speaker_model.clone(),
        messages: wire.messages.clone(),
        temperature: wire.temperature,
        top_p: wire.top_p,
        max_tokens: wire.max_tokens,
        presence_penalty: wire.presence_penalty,
        frequency_penalty: wire.frequency_penalty,
        tools: wire.tools.clone(),
        tool_choice: wire.tool_choice.clone(),
        response_format: wire
            .response_format
            .as_ref()
            .and_then(|f| serde_json::to_value(f).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eir_core::types::{Delta, ToolCallChunk, ToolCallFunction};
    use eir_graph::MemoryGraphStore;
    use eir_test_utils::{content_script, MockEmbedder, MockProvider, ScriptItem};
    use eir_openai::ResponseFormat;

    const DIM: usize = 64;

    struct Fixture {
        speaker_provider: Arc<MockProvider>,
        executive_provider: Arc<MockProvider>,
        orchestrator: Orchestrator,
    }

    fn fixture(stride: usize) -> Fixture {
        let store = Arc::new(MemoryGraphStore::new(DIM));
        let embedder = Arc::new(MockEmbedder::new(DIM));
        let tools = KnowledgeTools::new(store, embedder);

        let speaker_provider = Arc::new(MockProvider::new());
        let executive_provider = Arc::new(MockProvider::new());
        let speaker = Arc::new(SpeakerWorker::new(speaker_provider.clone()));
        let executive = Arc::new(ExecutiveWorker::new(
            executive_provider.clone(),
            tools.clone(),
            "gpt-4o".into(),
            1024,
        ));

        let orchestrator = Orchestrator::new(
            tools,
            speaker,
            executive,
            OrchestratorSettings {
                reeval_stride: stride,
                request_timeout: Duration::from_secs(5),
            },
        );
        Fixture {
            speaker_provider,
            executive_provider,
            orchestrator,
        }
    }

    fn request(text: &str, stream: bool) -> OrchestratorRequest {
        OrchestratorRequest {
            wire: ChatCompletionRequest {
                model: "eir-default".into(),
                messages: vec![ChatMessage::text("user", text)],
                stream,
                ..ChatCompletionRequest::default()
            },
            speaker_model: "gpt-4o".into(),
        }
    }

    async fn collect(
        stream: impl Stream<Item = ChatCompletionChunk> + Send,
    ) -> Vec<ChatCompletionChunk> {
        stream.collect().await
    }

    fn contents(chunks: &[ChatCompletionChunk]) -> String {
        chunks
            .iter()
            .filter_map(|c| c.choices[0].delta.content.clone())
            .collect()
    }

    fn finish_count(chunks: &[ChatCompletionChunk]) -> usize {
        chunks
            .iter()
            .filter(|c| c.choices[0].finish_reason.is_some())
            .count()
    }

    fn interruption_count(chunks: &[ChatCompletionChunk]) -> usize {
        chunks
            .iter()
            .filter(|c| {
                c.choices[0]
                    .delta
                    .content
                    .as_deref()
                    .is_some_and(|t| t.contains("[Executive Interruption:"))
            })
            .count()
    }

    #[tokio::test]
    async fn clean_stream_forwards_in_order() {
        let f = fixture(100);
        f.speaker_provider
            .push_stream_script(content_script(&[
                "The ", "capital ", "of ", "France ", "is ", "Paris.",
            ]))
            .await;

        let chunks = collect(
            f.orchestrator
                .run_streaming(request("What is the capital of France?", true), CancellationToken::new()),
        )
        .await;

        assert_eq!(contents(&chunks), "The capital of France is Paris.");
        assert_eq!(finish_count(&chunks), 1, "exactly one finish chunk");
        assert_eq!(interruption_count(&chunks), 0);
        // Role preamble leads the stream.
        assert_eq!(chunks[0].choices[0].delta.role.as_deref(), Some("assistant"));
        // The finish chunk is last.
        assert!(chunks.last().unwrap().choices[0].finish_reason.is_some());
    }

    #[tokio::test]
    async fn interruption_fires_at_most_once() {
        let f = fixture(5);
        f.speaker_provider
            .push_stream_script(content_script(&[
                "The capital ", "of France ", "is Lyon", ".",
            ]))
            .await;
        // Several evaluations will run; more than one says interrupt.
        for _ in 0..4 {
            f.executive_provider
                .push_complete_response(
                    r#"{"action": "interrupt", "reason": "wrong", "document": "The capital of France is Paris."}"#,
                )
                .await;
        }

        let chunks = collect(
            f.orchestrator
                .run_streaming(request("What is the capital of France?", true), CancellationToken::new()),
        )
        .await;

        assert_eq!(interruption_count(&chunks), 1, "at most one interruption");
        let all = contents(&chunks);
        assert!(all.contains("[Executive Interruption: The capital of France is Paris.]"));
        // Stripped of the interruption, the speaker text is intact.
        let stripped = all.replace("\n\n[Executive Interruption: The capital of France is Paris.]", "");
        assert_eq!(stripped, "The capital of France is Lyon.");
        assert_eq!(finish_count(&chunks), 1);
    }

    #[tokio::test]
    async fn json_mode_suppresses_until_end() {
        let f = fixture(100);
        f.speaker_provider
            .push_stream_script(content_script(&["{\"a\":1, \"b\":", " 2}"]))
            .await;

        let mut req = request("give me json", true);
        req.wire.response_format = Some(ResponseFormat {
            format_type: "json_object".into(),
            rest: serde_json::Map::new(),
        });

        let chunks = collect(
            f.orchestrator
                .run_streaming(req, CancellationToken::new()),
        )
        .await;

        let content_chunks: Vec<&ChatCompletionChunk> = chunks
            .iter()
            .filter(|c| c.choices[0].delta.content.is_some())
            .collect();
        assert_eq!(content_chunks.len(), 1, "one collected JSON chunk");
        let parsed: serde_json::Value =
            serde_json::from_str(content_chunks[0].choices[0].delta.content.as_deref().unwrap())
                .unwrap();
        assert_eq!(parsed, serde_json::json!({"a": 1, "b": 2}));
        assert_eq!(finish_count(&chunks), 1);
    }

    #[tokio::test]
    async fn json_mode_reports_unparseable_output() {
        let f = fixture(100);
        f.speaker_provider
            .push_stream_script(content_script(&["this is ", "not json"]))
            .await;

        let mut req = request("give me json", true);
        req.wire.response_format = Some(ResponseFormat {
            format_type: "json_object".into(),
            rest: serde_json::Map::new(),
        });

        let chunks = collect(
            f.orchestrator
                .run_streaming(req, CancellationToken::new()),
        )
        .await;

        let content = contents(&chunks);
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["error"], "Failed to parse as JSON");
        assert_eq!(parsed["content"], "this is not json");
    }

    #[tokio::test]
    async fn speaker_failure_emits_error_then_terminates() {
        let f = fixture(100);
        f.speaker_provider
            .push_stream_script(vec![
                ScriptItem::content("partial "),
                ScriptItem::Error("upstream unavailable".into()),
            ])
            .await;

        let chunks = collect(
            f.orchestrator
                .run_streaming(request("hello", true), CancellationToken::new()),
        )
        .await;

        let last = chunks.last().unwrap();
        assert_eq!(last.choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(last.choices[0]
            .delta
            .content
            .as_deref()
            .unwrap()
            .starts_with("Error: "));
        assert_eq!(finish_count(&chunks), 1);
    }

    #[tokio::test]
    async fn tool_call_stream_finishes_with_tool_calls() {
        let f = fixture(100);
        let call = |arguments: &str, first: bool| ToolCallChunk {
            index: 0,
            id: first.then(|| "call_1".to_string()),
            call_type: first.then(|| "function".to_string()),
            function: Some(ToolCallFunction {
                name: first.then(|| "lookup".to_string()),
                arguments: Some(arguments.to_string()),
            }),
        };
        f.speaker_provider
            .push_stream_script(vec![
                ScriptItem::Delta(Delta {
                    tool_calls: Some(vec![call("{\"city\":", true)]),
                    ..Delta::default()
                }),
                ScriptItem::Delta(Delta {
                    tool_calls: Some(vec![call(" \"Paris\"}", false)]),
                    ..Delta::default()
                }),
                ScriptItem::finish("tool_calls"),
            ])
            .await;

        let chunks = collect(
            f.orchestrator
                .run_streaming(request("look up Paris", true), CancellationToken::new()),
        )
        .await;

        let tool_chunks: Vec<_> = chunks
            .iter()
            .filter(|c| c.choices[0].delta.tool_calls.is_some())
            .collect();
        assert_eq!(tool_chunks.len(), 2, "tool-call chunks forwarded unmodified");
        assert_eq!(
            chunks.last().unwrap().choices[0].finish_reason.as_deref(),
            Some("tool_calls")
        );
    }

    #[tokio::test]
    async fn interruption_defers_past_open_tool_call() {
        let f = fixture(100);
        // The executive interrupts immediately (evaluation of "").
        f.executive_provider
            .push_complete_response(
                r#"{"action": "interrupt", "reason": "preempt", "document": "corrective"}"#,
            )
            .await;
        // Speaker emits a tool call split over two deltas, with pauses so
        // the verdict is observed while the call is still open.
        f.speaker_provider
            .push_stream_script(vec![
                ScriptItem::Delta(Delta {
                    tool_calls: Some(vec![ToolCallChunk {
                        index: 0,
                        id: Some("call_1".into()),
                        call_type: Some("function".into()),
                        function: Some(ToolCallFunction {
                            name: Some("lookup".into()),
                            arguments: Some("{".into()),
                        }),
                    }]),
                    ..Delta::default()
                }),
                ScriptItem::Delta(Delta {
                    tool_calls: Some(vec![ToolCallChunk {
                        index: 0,
                        id: None,
                        call_type: None,
                        function: Some(ToolCallFunction {
                            name: None,
                            arguments: Some("}".into()),
                        }),
                    }]),
                    ..Delta::default()
                }),
                ScriptItem::finish("tool_calls"),
            ])
            .await;

        let chunks = collect(
            f.orchestrator
                .run_streaming(request("query", true), CancellationToken::new()),
        )
        .await;

        assert_eq!(interruption_count(&chunks), 1);
        let interruption_pos = chunks
            .iter()
            .position(|c| {
                c.choices[0]
                    .delta
                    .content
                    .as_deref()
                    .is_some_and(|t| t.contains("[Executive Interruption:"))
            })
            .unwrap();
        let last_tool_pos = chunks
            .iter()
            .rposition(|c| c.choices[0].delta.tool_calls.is_some())
            .unwrap();
        assert!(
            interruption_pos > last_tool_pos,
            "interruption must wait for the tool call to finish"
        );
    }

    #[tokio::test]
    async fn shutdown_cancellation_suppresses_terminal_chunk() {
        let f = fixture(100);
        f.speaker_provider
            .push_stream_script(content_script(&["a", "b", "c", "d"]))
            .await;

        // A server already shutting down never completes the response.
        let cancel = CancellationToken::new();
        cancel.cancel();
        let chunks = collect(
            f.orchestrator
                .run_streaming(request("hello", true), cancel),
        )
        .await;

        assert_eq!(finish_count(&chunks), 0, "no finish chunk after shutdown");
    }

    #[tokio::test]
    async fn blocking_mode_appends_interruption() {
        let f = fixture(100);
        f.speaker_provider
            .push_stream_script(content_script(&["The capital of France is Lyon."]))
            .await;
        f.executive_provider
            .push_complete_response(
                r#"{"action": "interrupt", "reason": "wrong", "document": "The capital of France is Paris."}"#,
            )
            .await;

        let completion = f
            .orchestrator
            .run_blocking(request("What is the capital of France?", false))
            .await
            .unwrap();

        let content = completion.choices[0].message.content.as_deref().unwrap();
        assert!(content.starts_with("The capital of France is Lyon."));
        assert!(content.ends_with("[Executive Interruption: The capital of France is Paris.]"));
    }

    #[tokio::test]
    async fn blocking_mode_without_interruption() {
        let f = fixture(100);
        f.speaker_provider
            .push_stream_script(content_script(&["The capital of France is Paris."]))
            .await;
        f.executive_provider
            .push_complete_response(r#"{"action": "none", "reason": "fine", "document": ""}"#)
            .await;

        let completion = f
            .orchestrator
            .run_blocking(request("What is the capital of France?", false))
            .await
            .unwrap();

        assert_eq!(
            completion.choices[0].message.content.as_deref(),
            Some("The capital of France is Paris.")
        );
        assert_eq!(completion.object, "chat.completion");
    }
}
