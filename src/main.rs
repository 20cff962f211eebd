//! # Lodestone CLI (`lode`)
//!
//! The `lode` binary drives the indexing engine: database initialization,
//! incremental indexing, hybrid search, release import, and status.
//!
//! ## Usage
//!
//! ```bash
//! lode --config ./config/lode.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lode init` | Create the SQLite database and run schema migrations |
//! | `lode index` | Index all configured sources incrementally |
//! | `lode search "<query>"` | Search indexed chunks |
//! | `lode changed --since <rev>` | List chunks newer than a revision |
//! | `lode release import <file>` | Import a release record (JSON) |
//! | `lode release list` | List imported releases |
//! | `lode status` | Show index counts and per-source breakdown |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lodestone::{config, db, ingest, migrate, releases, search_cmd, status, store::Store};

/// Lodestone CLI — a local-first documentation and code indexing engine
/// with hybrid retrieval.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/lode.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "lode",
    about = "Lodestone — a local-first documentation and code indexing engine with hybrid retrieval",
    version,
    long_about = "Lodestone walks configured source trees, splits files into structure-aware \
    chunks, and indexes them in SQLite for keyword (FTS5), semantic (vector), and hybrid \
    (Reciprocal Rank Fusion) retrieval. Indexing is incremental and hash-gated."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/lode.toml`. All source, database, chunking,
    /// and embedding settings are read from this file.
    #[arg(long, global = true, default_value = "./config/lode.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (files,
    /// chunks, chunks_fts, chunk_vectors, releases, meta). This command is
    /// idempotent — running it multiple times is safe.
    Init,

    /// Index configured sources incrementally.
    ///
    /// Walks every source tree, skips files whose content hash has not
    /// changed, re-chunks and re-embeds the rest, and finally removes
    /// index entries for files that no longer exist.
    Index {
        /// Reindex every file even when its content hash is unchanged.
        #[arg(long)]
        force: bool,

        /// Revision label to stamp on everything indexed in this pass
        /// (e.g. a release tag or commit).
        #[arg(long)]
        revision: Option<String>,

        /// Only index the named source.
        #[arg(long)]
        source: Option<String>,

        /// Dry run — show file and chunk counts without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search indexed chunks.
    ///
    /// Queries the index using the specified mode and prints ranked chunks
    /// with scores and excerpts.
    Search {
        /// The search query string.
        query: String,

        /// Search mode: `keyword` (FTS5), `semantic` (vector), or `hybrid`
        /// (Reciprocal Rank Fusion). Semantic mode requires an embedding
        /// provider; hybrid degrades to keyword order without one.
        #[arg(long, default_value = "hybrid")]
        mode: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Filter results to a named source.
        #[arg(long)]
        source: Option<String>,

        /// Filter results by content type: `doc`, `code`, or `schema`.
        #[arg(long)]
        content_type: Option<String>,
    },

    /// List chunks indexed under revisions newer than a given one.
    Changed {
        /// The baseline revision; only strictly newer chunks are shown.
        #[arg(long)]
        since: String,

        /// Maximum number of chunks to list.
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Manage release records.
    Release {
        #[command(subcommand)]
        action: ReleaseAction,
    },

    /// Show index counts and per-source breakdown.
    Status,
}

/// Release management subcommands.
#[derive(Subcommand)]
enum ReleaseAction {
    /// Import a release record from a JSON file.
    ///
    /// Stores the structured record and indexes its changelog as a
    /// synthetic document under `releases/<tag>.md`, stamped with the tag
    /// as its revision.
    Import {
        /// Path to the release record JSON file.
        file: PathBuf,
    },

    /// List imported releases, newest tag first.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if matches!(cli.command, Commands::Init) {
        let pool = db::connect(&cfg.db.path).await?;
        migrate::run_migrations(&pool).await?;
        pool.close().await;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let store = Store::open(&cfg).await?;

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Index {
            force,
            revision,
            source,
            dry_run,
        } => {
            ingest::run_index(&cfg, &store, force, revision, source, dry_run).await?;
        }
        Commands::Search {
            query,
            mode,
            limit,
            source,
            content_type,
        } => {
            search_cmd::run_search(&cfg, &store, &query, &mode, limit, source, content_type)
                .await?;
        }
        Commands::Changed { since, limit } => {
            releases::run_changed(&store, &since, limit).await?;
        }
        Commands::Release { action } => match action {
            ReleaseAction::Import { file } => {
                releases::run_import(&store, &file).await?;
            }
            ReleaseAction::List => {
                releases::run_list(&store).await?;
            }
        },
        Commands::Status => {
            status::run_status(&cfg, &store).await?;
        }
    }

    store.close().await;
    Ok(())
}
