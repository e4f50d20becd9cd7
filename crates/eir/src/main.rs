// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! EIR - the Executive Interrupting Rectifier.
//!
//! Binary entry point: `serve` runs the OpenAI-compatible gateway with
//! both workers, `chat` opens an interactive client against a running
//! server, `schema-init` prepares the Neo4j schema.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod chat;
mod serve;

/// EIR - the Executive Interrupting Rectifier.
#[derive(Parser, Debug)]
#[command(name = "eir", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the EIR server.
    Serve,
    /// Launch an interactive chat session against a running EIR server.
    Chat(chat::ChatArgs),
    /// Create the Neo4j constraints and vector indexes.
    SchemaInit,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match eir_config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Chat(args) => chat::run_chat(args).await,
        Commands::SchemaInit => serve::run_schema_init(config).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
