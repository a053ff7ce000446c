//! # KB Harness CLI (`kbh`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kbh ingest` | Extract the knowledge document into `knowledge_base.json` |
//! | `kbh ask "<query>"` | Print the reply the server would give |
//! | `kbh serve` | Start the mock responses HTTP server |
//!
//! All commands accept `--config <path>`. Without a config file the stock
//! defaults are used.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kb_harness::{ask, config, ingest, server};

/// KB Harness: knowledge-base extraction and a keyword-matching mock
/// responses endpoint.
#[derive(Parser)]
#[command(
    name = "kbh",
    about = "KB Harness: knowledge-base extraction and a keyword-matching mock responses endpoint",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/kbh.toml`. If the file does not exist the
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/kbh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract FAQ, glossary and rule chunks from the source document.
    ///
    /// Reads `[paths].document` and writes `[paths].knowledge`. A missing
    /// source document is reported and nothing is written.
    Ingest,

    /// Answer one query against the knowledge file.
    Ask {
        /// The question text.
        query: String,

        /// Also print which chunk matched and why.
        #[arg(long)]
        explain: bool,
    },

    /// Start the mock responses HTTP server.
    ///
    /// Serves `POST /v1/chat/completions` and `POST /v1/responses` on
    /// `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Ingest => {
            ingest::run_ingest(&cfg)?;
        }
        Commands::Ask { query, explain } => {
            ask::run_ask(&cfg, &query, explain)?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
