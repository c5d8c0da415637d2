//! # FAQ Engine CLI (`faqe`)
//!
//! The `faqe` binary drives the matching engine: database
//! initialization, corpus loading, chat resolution, and diagnostics.
//!
//! ## Usage
//!
//! ```bash
//! faqe --config ./config/faqe.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `faqe init` | Create the SQLite database and run schema migrations |
//! | `faqe load <file>` | Ingest a JSONL corpus file |
//! | `faqe ask "<chat>"` | Resolve a chat message and print the response payload |
//! | `faqe jaccard "<text>"` | Explain the top lexical candidates for a text |
//! | `faqe similar "<text>"` | Rank the corpus by semantic distance to a text |
//! | `faqe keywords` | Most frequent corpus keywords |
//! | `faqe log` | Recent query log records |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use faq_engine::analysis;
use faq_engine::config::{self, Config};
use faq_engine::db;
use faq_engine::embedding::create_embedder;
use faq_engine::handler::{Handler, HandlerError};
use faq_engine::ingest;
use faq_engine::migrate;
use faq_engine::normalizer::create_normalizer;
use faq_engine::sqlite_store::SqliteStore;
use faq_engine_core::matcher::QueryMaker;
use faq_engine_core::store::{QueryLog, QuestionStore};

/// FAQ query matching engine — lexical and semantic matching of chat
/// utterances against a curated question corpus.
#[derive(Parser)]
#[command(
    name = "faqe",
    about = "FAQ query matching engine",
    version,
    long_about = "Matches incoming chat utterances against a curated question corpus, \
    combining lexical token overlap (Jaccard) with semantic vector distance over \
    weighted embeddings, and persists every resolved query for audit."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/faqe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Ingest a JSONL corpus file (one question record per line).
    ///
    /// Records that cannot be embedded are rejected — a question is
    /// never stored without a feature vector.
    Load { file: PathBuf },

    /// Resolve a chat message and print the response payload as JSON.
    Ask { chat: String },

    /// Explain the top lexical (Jaccard) candidates for a text.
    Jaccard { text: String },

    /// Rank corpus questions by semantic distance to a text, ascending.
    Similar {
        text: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Most frequent keywords across the corpus.
    Keywords {
        #[arg(short = 'n', long, default_value_t = 7)]
        limit: usize,
    },

    /// Recent query log records, newest first.
    Log {
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
}

fn build_engine(config: &Config, store: Arc<SqliteStore>) -> Result<Handler> {
    let normalizer = create_normalizer(&config.normalizer)?;
    let embedder = create_embedder(&config.embedding)?;
    let maker = QueryMaker::new(
        normalizer,
        embedder,
        config.match_params(),
        config.tags.policy(),
    );
    let corpus: Arc<dyn QuestionStore> = store.clone();
    let log: Arc<dyn QueryLog> = store;
    Ok(Handler::new(maker, corpus, log))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&config).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized at {}", config.db.path.display());
            pool.close().await;
        }

        Commands::Load { file } => {
            let store = Arc::new(SqliteStore::new(db::connect(&config).await?));
            let handler = build_engine(&config, store.clone())?;
            let report = ingest::load_corpus(store.as_ref(), handler.maker(), &file).await?;
            println!(
                "Loaded {}: {} inserted, {} rejected, {} duplicates",
                file.display(),
                report.inserted,
                report.rejected,
                report.duplicates
            );
        }

        Commands::Ask { chat } => {
            let store = Arc::new(SqliteStore::new(db::connect(&config).await?));
            let handler = build_engine(&config, store)?;
            match handler.handle(&chat, None).await {
                Ok(response) => println!("{}", serde_json::to_string_pretty(&response)?),
                Err(HandlerError::LogWrite { reason, response }) => {
                    // the match was computed; report it alongside the failure
                    eprintln!("Error: query log write failed: {}", reason);
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Jaccard { text } => {
            let store = Arc::new(SqliteStore::new(db::connect(&config).await?));
            let handler = build_engine(&config, store.clone())?;
            let breakdown = analysis::jaccard_breakdown(
                handler.maker(),
                store.as_ref(),
                &text,
                config.matching.top_k,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&breakdown)?);
        }

        Commands::Similar { text, limit } => {
            let store = Arc::new(SqliteStore::new(db::connect(&config).await?));
            let handler = build_engine(&config, store.clone())?;
            let ranked =
                analysis::feature_similarity(handler.maker(), store.as_ref(), &text, limit).await?;
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }

        Commands::Keywords { limit } => {
            let store = Arc::new(SqliteStore::new(db::connect(&config).await?));
            let counts = analysis::keyword_counts(store.as_ref(), limit).await?;
            for (keyword, count) in counts {
                println!("{}  {}", count, keyword);
            }
        }

        Commands::Log { limit } => {
            let store = Arc::new(SqliteStore::new(db::connect(&config).await?));
            let recent = store.find_recent(limit).await?;
            println!("{}", serde_json::to_string_pretty(&recent)?);
        }
    }

    Ok(())
}
