// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the complete EIR pipeline.
//!
//! Each test wires an isolated stack: in-memory graph store,
//! deterministic trigram embedder, and scripted mock providers for both
//! workers. HTTP-level tests drive the axum router; cancellation tests
//! drive the orchestrator directly.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use eir_config::EirConfig;
use eir_core::types::{ChatMessage, NodeKind};
use eir_core::BELONGS_TO;
use eir_gateway::{build_router, AppState};
use eir_graph::MemoryGraphStore;
use eir_knowledge::KnowledgeTools;
use eir_openai::{ChatCompletionChunk, ChatCompletionRequest};
use eir_orchestrator::{Orchestrator, OrchestratorRequest, OrchestratorSettings};
use eir_test_utils::{content_script, MockEmbedder, MockProvider, ScriptItem};
use eir_workers::{ExecutiveWorker, SpeakerWorker};

const DIM: usize = 64;

struct Harness {
    router: axum::Router,
    speaker: Arc<MockProvider>,
    executive: Arc<MockProvider>,
    knowledge: KnowledgeTools,
}

fn harness(reeval_stride: usize) -> Harness {
    let embedder = Arc::new(MockEmbedder::new(DIM));
    let store = Arc::new(MemoryGraphStore::new(DIM));
    let knowledge = KnowledgeTools::new(store, embedder.clone());

    let speaker = Arc::new(MockProvider::new());
    let executive = Arc::new(MockProvider::new());

    let mut config = EirConfig::default();
    config.orchestrator.reeval_stride = reeval_stride;
    config.orchestrator.request_timeout_secs = 5;

    let state = AppState {
        config,
        knowledge: knowledge.clone(),
        embedder,
        speaker_provider: speaker.clone(),
        executive_provider: executive.clone(),
        shutdown: CancellationToken::new(),
        start_time: std::time::Instant::now(),
    };

    Harness {
        router: build_router(state),
        speaker,
        executive,
        knowledge,
    }
}

/// Seeds the Paris topic and its capital fact.
async fn seed_paris(knowledge: &KnowledgeTools) {
    knowledge
        .create_node(
            NodeKind::Topic,
            "Paris",
            "Capital of France",
            None,
            &[],
            Default::default(),
        )
        .await
        .unwrap();
    knowledge
        .create_node(
            NodeKind::Knowledge,
            "Capital",
            "Paris is the capital of France",
            Some("Paris is the capital of France".into()),
            &["Paris".to_string()],
            Default::default(),
        )
        .await
        .unwrap();
}

async fn post_stream(router: axum::Router, body: &str) -> String {
    let response = router
        .oneshot(
            Request::post("/v1/chat/completions")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200, "streaming request should succeed");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn chat_body(text: &str, stream: bool) -> String {
    serde_json::json!({
        "model": "eir-default",
        "messages": [{"role": "user", "content": text}],
        "stream": stream,
    })
    .to_string()
}

/// Extracts the `data:` frame payloads in order.
fn data_frames(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_string)
        .collect()
}

/// Parses all chunk frames (excluding the `[DONE]` sentinel).
fn chunks(body: &str) -> Vec<ChatCompletionChunk> {
    data_frames(body)
        .iter()
        .filter(|f| f.as_str() != "[DONE]")
        .map(|f| serde_json::from_str(f).unwrap())
        .collect()
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

fn interruption_positions(chunks: &[ChatCompletionChunk]) -> Vec<usize> {
    chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| {
            c.choices[0]
                .delta
                .content
                .as_deref()
                .is_some_and(|t| t.contains("[Executive Interruption:"))
        })
        .map(|(i, _)| i)
        .collect()
}

// ---- Scenario 1: correct answer, no interruption ----

#[tokio::test]
async fn correct_answer_streams_without_interruption() {
    let h = harness(100);
    seed_paris(&h.knowledge).await;

    // Twelve deltas, as the original exchange produced them.
    h.speaker
        .push_stream_script(content_script(&[
            "The ", "cap", "ital", " of", " Fr", "anc", "e ", "is", " Pa", "ri", "s", ".",
        ]))
        .await;
    h.executive
        .push_complete_response(r#"{"action": "none", "reason": "consistent", "document": ""}"#)
        .await;

    let body = post_stream(h.router, &chat_body("What is the capital of France?", true)).await;

    // P1: exactly one [DONE] sentinel.
    assert_eq!(body.matches("[DONE]").count(), 1);
    assert!(body.trim_end().ends_with("data: [DONE]"));

    let parsed = chunks(&body);
    // P2: exactly one finish_reason chunk, before [DONE].
    assert_eq!(finish_count(&parsed), 1);
    assert_eq!(
        parsed.last().unwrap().choices[0].finish_reason.as_deref(),
        Some("stop")
    );
    // P3: no interruption.
    assert!(interruption_positions(&parsed).is_empty());
    // P4: tokens in order, nothing dropped.
    assert_eq!(contents(&parsed), "The capital of France is Paris.");
}

// ---- Scenario 2: incorrect answer triggers interruption ----

#[tokio::test]
async fn incorrect_answer_is_interrupted_once() {
    let h = harness(100);
    seed_paris(&h.knowledge).await;

    h.speaker
        .push_stream_script(content_script(&["The capital of France is Lyon."]))
        .await;
    h.executive
        .push_complete_response(
            r#"{"action": "interrupt", "reason": "contradicts stored knowledge",
                "document": "The capital of France is Paris, not Lyon."}"#,
        )
        .await;

    let body = post_stream(h.router, &chat_body("What is the capital of France?", true)).await;
    let parsed = chunks(&body);

    let interruptions = interruption_positions(&parsed);
    assert_eq!(interruptions.len(), 1, "exactly one interruption chunk");
    let interruption = &parsed[interruptions[0]];
    assert!(interruption.choices[0]
        .delta
        .content
        .as_deref()
        .unwrap()
        .contains("Paris"));

    // The interruption lands after the stream began (role preamble is
    // chunk 0) and before the terminal chunk.
    let finish_pos = parsed
        .iter()
        .position(|c| c.choices[0].finish_reason.is_some())
        .unwrap();
    assert!(interruptions[0] > 0);
    assert!(interruptions[0] < finish_pos);
    assert_eq!(body.matches("[DONE]").count(), 1);
}

// ---- Scenario 3: progressive incorrectness with a small stride ----

#[tokio::test]
async fn progressive_output_reevaluates_and_interrupts_once() {
    let h = harness(20);
    seed_paris(&h.knowledge).await;

    h.speaker
        .push_stream_script(content_script(&[
            "The capital", " of France", " is Lyon", ".",
        ]))
        .await;
    // Several evaluations run; more than one would interrupt.
    for _ in 0..4 {
        h.executive
            .push_complete_response(
                r#"{"action": "interrupt", "reason": "wrong city",
                    "document": "The capital of France is Paris."}"#,
            )
            .await;
    }

    let executive = h.executive.clone();
    let body = post_stream(h.router, &chat_body("What is the capital of France?", true)).await;
    let parsed = chunks(&body);

    assert_eq!(
        interruption_positions(&parsed).len(),
        1,
        "repeat interrupt verdicts are ignored"
    );
    assert_eq!(finish_count(&parsed), 1);

    // At least one re-evaluation fired beyond the initial one.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let evaluations = executive.complete_requests().await.len();
    assert!(
        evaluations >= 2,
        "expected initial evaluation plus at least one stride re-evaluation, saw {evaluations}"
    );
}

// ---- Scenario 4: vector round-trip ----

#[tokio::test]
async fn vector_search_round_trip() {
    let h = harness(100);
    h.knowledge
        .create_node(
            NodeKind::Topic,
            "Quantum Computing",
            "Qubits, superposition, and entanglement",
            None,
            &[],
            Default::default(),
        )
        .await
        .unwrap();

    let hits = h
        .knowledge
        .vector_search(NodeKind::Topic, "quantum computation", 1, 0.0)
        .await
        .unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Quantum Computing");
    assert!(
        hits[0].score >= 0.6,
        "related phrasing should clear 0.6, got {}",
        hits[0].score
    );
}

// ---- Scenario 5: hybrid search ----

#[tokio::test]
async fn hybrid_search_joins_topic_to_knowledge() {
    let h = harness(100);
    h.knowledge
        .create_node(
            NodeKind::Topic,
            "Machine Learning",
            "Statistical learning from data",
            None,
            &[],
            Default::default(),
        )
        .await
        .unwrap();
    for name in ["Gradient Descent", "Overfitting", "Cross Validation"] {
        h.knowledge
            .create_node(
                NodeKind::Knowledge,
                name,
                &format!("{name} belongs to machine learning practice"),
                Some(format!("{name} summary")),
                &["Machine Learning".to_string()],
                Default::default(),
            )
            .await
            .unwrap();
    }

    let hits = h
        .knowledge
        .hybrid_search(
            NodeKind::Topic,
            "machine learning methods",
            BELONGS_TO,
            NodeKind::Knowledge,
            10,
            0.0,
        )
        .await
        .unwrap();

    assert_eq!(hits.len(), 3);
    let mut targets: Vec<&str> = hits.iter().map(|h| h.target.name.as_str()).collect();
    for hit in &hits {
        assert_eq!(hit.source.name, "Machine Learning");
    }
    for window in hits.windows(2) {
        assert!(window[0].score >= window[1].score, "scores non-increasing");
    }
    targets.sort_unstable();
    targets.dedup();
    assert_eq!(targets.len(), 3, "targets are distinct");
}

// ---- Scenario 6: JSON mode under streaming ----

#[tokio::test]
async fn json_mode_collects_and_reemits() {
    let h = harness(100);
    h.speaker
        .push_stream_script(content_script(&["{\"a\":1, \"b\":", " 2}"]))
        .await;

    let body = serde_json::json!({
        "model": "eir-default",
        "messages": [{"role": "user", "content": "as json please"}],
        "stream": true,
        "response_format": {"type": "json_object"},
    })
    .to_string();

    let body = post_stream(h.router, &body).await;
    let parsed = chunks(&body);

    let content_chunks: Vec<_> = parsed
        .iter()
        .filter(|c| c.choices[0].delta.content.is_some())
        .collect();
    assert_eq!(content_chunks.len(), 1, "no content until the end, then one chunk");
    let value: serde_json::Value =
        serde_json::from_str(content_chunks[0].choices[0].delta.content.as_deref().unwrap())
            .unwrap();
    assert_eq!(value, serde_json::json!({"a": 1, "b": 2}));
    assert_eq!(finish_count(&parsed), 1);
    assert_eq!(body.matches("[DONE]").count(), 1);
}

// ---- Failure path: the sentinel survives a speaker failure ----

#[tokio::test]
async fn speaker_failure_still_ends_with_done() {
    let h = harness(100);
    h.speaker
        .push_stream_script(vec![
            ScriptItem::content("partial "),
            ScriptItem::Error("upstream unavailable".into()),
        ])
        .await;

    let body = post_stream(h.router, &chat_body("hello", true)).await;
    assert_eq!(body.matches("[DONE]").count(), 1);

    let parsed = chunks(&body);
    assert_eq!(finish_count(&parsed), 1);
    let last = parsed.last().unwrap();
    assert!(last.choices[0]
        .delta
        .content
        .as_deref()
        .unwrap()
        .starts_with("Error: "));
    assert_eq!(last.choices[0].finish_reason.as_deref(), Some("stop"));
}

// ---- P10: disconnect and shutdown bound side effects ----

fn side_effect_fixture() -> (Orchestrator, Arc<MockProvider>, KnowledgeTools) {
    let embedder = Arc::new(MockEmbedder::new(DIM));
    let store = Arc::new(MemoryGraphStore::new(DIM));
    let knowledge = KnowledgeTools::new(store, embedder);

    let fragments: Vec<String> = (0..40).map(|i| format!("t{i} ")).collect();
    let fragment_refs: Vec<&str> = fragments.iter().map(String::as_str).collect();
    let speaker_provider = Arc::new(
        MockProvider::new()
            .with_delta_delay(Duration::from_millis(10))
            .with_stream_script(content_script(&fragment_refs)),
    );

    let executive_provider = Arc::new(MockProvider::new());
    let orchestrator = Orchestrator::new(
        knowledge.clone(),
        Arc::new(SpeakerWorker::new(speaker_provider)),
        Arc::new(ExecutiveWorker::new(
            executive_provider.clone(),
            knowledge.clone(),
            "gpt-4o".into(),
            1024,
        )),
        OrchestratorSettings {
            reeval_stride: 8,
            request_timeout: Duration::from_secs(5),
        },
    );
    (orchestrator, executive_provider, knowledge)
}

fn long_request() -> OrchestratorRequest {
    OrchestratorRequest {
        wire: ChatCompletionRequest {
            model: "eir-default".into(),
            messages: vec![ChatMessage::text("user", "long answer please")],
            stream: true,
            ..ChatCompletionRequest::default()
        },
        speaker_model: "gpt-4o".into(),
    }
}

/// The real client-disconnect path: the SSE response body (and with it
/// the chunk receiver) is dropped mid-stream, so the forward loop halts
/// on its next failed send.
#[tokio::test]
async fn client_disconnect_stops_side_effects() {
    let (orchestrator, executive_provider, knowledge) = side_effect_fixture();

    // The shutdown token never fires here.
    let mut stream =
        Box::pin(orchestrator.run_streaming(long_request(), CancellationToken::new()));
    for _ in 0..3 {
        stream.next().await;
    }
    drop(stream);

    // In-flight work may land, but nothing new starts afterwards.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let evaluations = executive_provider.complete_requests().await.len();
    let settled = exchange_count(&knowledge).await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        executive_provider.complete_requests().await.len(),
        evaluations,
        "evaluations must stop after disconnect"
    );
    assert_eq!(
        exchange_count(&knowledge).await,
        settled,
        "writebacks must stop after disconnect"
    );
}

/// Server shutdown cancels the per-request child token; the stream winds
/// down without a terminal chunk and side effects stop.
#[tokio::test]
async fn shutdown_cancellation_stops_side_effects() {
    let (orchestrator, _executive_provider, knowledge) = side_effect_fixture();

    let cancel = CancellationToken::new();
    let mut stream = Box::pin(orchestrator.run_streaming(long_request(), cancel.clone()));
    for _ in 0..3 {
        stream.next().await;
    }
    cancel.cancel();

    let rest: Vec<ChatCompletionChunk> = stream.collect().await;
    assert!(
        rest.iter().all(|c| c.choices[0].finish_reason.is_none()),
        "no finish chunk after shutdown"
    );

    tokio::time::sleep(Duration::from_millis(150)).await;
    let settled = exchange_count(&knowledge).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    let later = exchange_count(&knowledge).await;
    assert_eq!(settled, later, "writebacks must stop after shutdown");
}

async fn exchange_count(knowledge: &KnowledgeTools) -> usize {
    knowledge
        .structural_search("(n:Knowledge)", None, None, Default::default())
        .await
        .unwrap()
        .len()
}

// ---- Non-streaming composition ----

#[tokio::test]
async fn non_streaming_appends_interruption_to_content() {
    let h = harness(100);
    seed_paris(&h.knowledge).await;

    h.speaker
        .push_stream_script(content_script(&["The capital of France is Lyon."]))
        .await;
    h.executive
        .push_complete_response(
            r#"{"action": "interrupt", "reason": "wrong",
                "document": "The capital of France is Paris."}"#,
        )
        .await;

    let response = h
        .router
        .oneshot(
            Request::post("/v1/chat/completions")
                .header("content-type", "application/json")
                .body(Body::from(chat_body("What is the capital of France?", false)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    let content = json["choices"][0]["message"]["content"].as_str().unwrap();
    assert!(content.starts_with("The capital of France is Lyon."));
    assert!(content.contains("[Executive Interruption: The capital of France is Paris.]"));
    assert_eq!(json["object"], "chat.completion");
}

// ---- Writeback visibility across requests ----

#[tokio::test]
async fn exchange_writeback_lands_in_graph() {
    let h = harness(100);
    h.speaker
        .push_stream_script(content_script(&["Rust compiles to native code."]))
        .await;
    h.executive
        .push_complete_response(r#"{"action": "none", "reason": "fine", "document": ""}"#)
        .await;

    let _ = post_stream(h.router, &chat_body("Does Rust compile to native code?", true)).await;

    // Writebacks are asynchronous relative to the response.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let topic = h
        .knowledge
        .find_by_name(NodeKind::Topic, "Does Rust compile to native code?")
        .await
        .unwrap();
    assert!(topic.is_some(), "the query became a Topic node");

    let exchanges = exchange_count(&h.knowledge).await;
    assert!(exchanges >= 1, "the exchange became a Knowledge node");
}
