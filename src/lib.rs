//! # Lodestone
//!
//! A local-first documentation and code indexing engine with hybrid
//! retrieval.
//!
//! Lodestone walks configured source trees, splits files into structure-
//! aware chunks, and stores them in SQLite three ways at once: as rows, in
//! an FTS5 keyword index, and as embedding vectors. Retrieval fuses the
//! keyword and vector rankings with Reciprocal Rank Fusion. Indexing is
//! incremental: unchanged files (by content hash) are skipped, and files
//! that disappear from their sources are swept from the index.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────────┐   ┌───────────┐
//! │ Discovery │──▶│ Classify +    │──▶│  SQLite    │
//! │ walk/glob │   │ Chunk + Embed │   │ FTS5 + Vec │
//! └───────────┘   └───────────────┘   └────┬──────┘
//!                                          │
//!                                          ▼
//!                                    ┌──────────┐
//!                                    │   CLI    │
//!                                    │  (lode)  │
//!                                    └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lode init                         # create database
//! lode index                        # index configured sources
//! lode search "deployment" --mode hybrid
//! lode release import v1.4.0.json  # import a release record
//! lode changed --since v1.3.0      # chunks newer than a revision
//! lode status                       # index overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`discover`] | Source tree walking and glob filtering |
//! | [`classify`] | Path-based content classification |
//! | [`chunker`] | Structure-aware text chunking |
//! | [`embedding`] | Embedding client and vector utilities |
//! | [`store`] | Incremental index store |
//! | [`fusion`] | Reciprocal Rank Fusion |
//! | [`synonyms`] | Static query expansion |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunker;
pub mod classify;
pub mod config;
pub mod db;
pub mod discover;
pub mod embedding;
pub mod fusion;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod releases;
pub mod search_cmd;
pub mod status;
pub mod store;
pub mod synonyms;
