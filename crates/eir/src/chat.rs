// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `eir chat` command implementation.
//!
//! An interactive terminal client speaking to a running EIR server over
//! its OpenAI-compatible API, with streamed output and per-request
//! worker override flags.

use clap::Args;
use colored::Colorize;
use futures::StreamExt;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use eir_core::types::ChatMessage;
use eir_core::EirError;
use eir_openai::sse::{parse_chunk_stream, ChunkEvent};
use eir_openai::ChatCompletionRequest;

/// Arguments for `eir chat`.
#[derive(Args, Debug)]
pub struct ChatArgs {
    /// EIR API URL.
    #[arg(long, default_value = "http://localhost:3000")]
    pub api_url: String,

    /// EIR API key (the server does not require a real one).
    #[arg(long, default_value = "dummy-api-key")]
    pub api_key: String,

    /// Override the Speaker model for this session.
    #[arg(long)]
    pub speaker_model: Option<String>,

    /// Override the Speaker upstream API key.
    #[arg(long)]
    pub speaker_api_key: Option<String>,

    /// Override the Speaker upstream API base URL.
    #[arg(long)]
    pub speaker_api_base: Option<String>,

    /// Override the Executive model for this session.
    #[arg(long)]
    pub executive_model: Option<String>,

    /// Override the Executive upstream API key.
    #[arg(long)]
    pub executive_api_key: Option<String>,

    /// Override the Executive upstream API base URL.
    #[arg(long)]
    pub executive_api_base: Option<String>,

    /// Sampling temperature.
    #[arg(long, default_value_t = 0.7)]
    pub temperature: f64,
}

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant powered by the Executive Interrupting Rectifier (EIR) system.";

/// Runs the interactive chat loop.
pub async fn run_chat(args: ChatArgs) -> Result<(), EirError> {
    let client = build_client(&args)?;
    let endpoint = format!("{}/v1/chat/completions", args.api_url.trim_end_matches('/'));

    println!("{}", "=== Executive Interrupting Rectifier (EIR) Chat ===".bold());
    println!(
        "{}",
        "Type 'exit', 'quit', or press Ctrl+C to leave. 'clear' starts over.".yellow()
    );
    println!("{}", format!("API URL: {}", args.api_url).cyan());
    if let Some(model) = &args.speaker_model {
        println!("{}", format!("Speaker model: {model}").cyan());
    }
    if let Some(model) = &args.executive_model {
        println!("{}", format!("Executive model: {model}").cyan());
    }
    println!();

    let mut rl = DefaultEditor::new()
        .map_err(|e| EirError::Internal(format!("failed to initialize readline: {e}")))?;

    let mut messages = vec![ChatMessage::text("system", SYSTEM_PROMPT)];

    loop {
        let line = match rl.readline(&format!("{}> ", "you".green())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".blue());
                break;
            }
            Err(e) => {
                return Err(EirError::Internal(format!("readline error: {e}")));
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}", "Goodbye!".blue());
            break;
        }
        if input.eq_ignore_ascii_case("clear") {
            messages = vec![ChatMessage::text("system", SYSTEM_PROMPT)];
            println!("{}", "Conversation history cleared.".blue());
            continue;
        }
        let _ = rl.add_history_entry(input);

        messages.push(ChatMessage::text("user", input));

        print!("{}", "assistant> ".blue());
        match stream_turn(&client, &endpoint, &args, &messages).await {
            Ok(reply) => {
                println!();
                messages.push(ChatMessage::text("assistant", reply));
            }
            Err(e) => {
                println!();
                eprintln!("{}: {e}", "error".red());
                eprintln!("{}", "Make sure the EIR server is running (eir serve).".yellow());
                messages.pop();
            }
        }
    }

    Ok(())
}

/// Builds the HTTP client carrying auth and worker override headers.
fn build_client(args: &ChatArgs) -> Result<reqwest::Client, EirError> {
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

    let mut headers = HeaderMap::new();
    headers.insert(
        "authorization",
        HeaderValue::from_str(&format!("Bearer {}", args.api_key))
            .map_err(|e| EirError::Config(format!("invalid api key: {e}")))?,
    );

    let overrides = [
        ("x-speaker-model", &args.speaker_model),
        ("x-speaker-api-key", &args.speaker_api_key),
        ("x-speaker-api-base", &args.speaker_api_base),
        ("x-executive-model", &args.executive_model),
        ("x-executive-api-key", &args.executive_api_key),
        ("x-executive-api-base", &args.executive_api_base),
    ];
    for (name, value) in overrides {
        if let Some(value) = value {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_str(value)
                    .map_err(|e| EirError::Config(format!("invalid {name} value: {e}")))?,
            );
        }
    }

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| EirError::Internal(format!("failed to build HTTP client: {e}")))
}

/// Sends one turn and streams the response to stdout; returns the full
/// assistant reply.
async fn stream_turn(
    client: &reqwest::Client,
    endpoint: &str,
    args: &ChatArgs,
    messages: &[ChatMessage],
) -> Result<String, EirError> {
    use std::io::Write;

    let request = ChatCompletionRequest {
        model: "eir-default".into(),
        messages: messages.to_vec(),
        temperature: Some(args.temperature),
        stream: true,
        ..ChatCompletionRequest::default()
    };

    let response = client
        .post(endpoint)
        .json(&request)
        .send()
        .await
        .map_err(|e| EirError::Provider {
            message: format!("request failed: {e}"),
            source: Some(Box::new(e)),
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(EirError::provider(format!("server returned {status}: {body}")));
    }

    let mut reply = String::new();
    let mut chunks = parse_chunk_stream(response);
    while let Some(event) = chunks.next().await {
        match event? {
            ChunkEvent::Chunk(chunk) => {
                if let Some(choice) = chunk.choices.first() {
                    if let Some(content) = &choice.delta.content {
                        print!("{content}");
                        let _ = std::io::stdout().flush();
                        reply.push_str(content);
                    }
                }
            }
            ChunkEvent::Done => break,
        }
    }

    Ok(reply)
}
