//! Indexing pipeline orchestration.
//!
//! Coordinates the full pass: discovery → hash gate → chunking → embedding
//! → storage, then the deletion sweep. One file failing to index never
//! aborts the pass; the failure is reported and the file's previous indexed
//! state survives.

use std::collections::HashSet;

use anyhow::Result;

use crate::chunker::chunk_file;
use crate::classify::classify;
use crate::config::Config;
use crate::discover;
use crate::store::Store;

pub async fn run_index(
    config: &Config,
    store: &Store,
    force: bool,
    revision: Option<String>,
    source: Option<String>,
    dry_run: bool,
) -> Result<()> {
    let files = discover::discover_all(&config.sources, source.as_deref())?;

    if dry_run {
        let mut total_chunks = 0usize;
        for file in &files {
            let Some(content) = read_text(&file.absolute) else {
                continue;
            };
            let class = classify(&file.relative);
            total_chunks += chunk_file(
                &file.relative,
                &content,
                &file.source,
                &class,
                &config.chunking,
                revision.as_deref(),
            )
            .len();
        }
        println!("index (dry-run)");
        println!("  files found: {}", files.len());
        println!("  estimated chunks: {}", total_chunks);
        return Ok(());
    }

    let mut new_files = 0u64;
    let mut updated = 0u64;
    let mut skipped = 0u64;
    let mut failed = 0u64;
    let mut chunks_written = 0u64;
    let mut discovered: HashSet<String> = HashSet::with_capacity(files.len());

    for file in &files {
        discovered.insert(file.relative.clone());

        let Some(content) = read_text(&file.absolute) else {
            eprintln!("Warning: skipping non-text file {}", file.relative);
            continue;
        };

        match store
            .index_path(
                &file.relative,
                &content,
                &file.source,
                revision.as_deref(),
                force,
            )
            .await
        {
            Ok(report) => {
                use crate::models::IndexOutcome::*;
                match report.outcome {
                    New => new_files += 1,
                    Updated => updated += 1,
                    Skipped => skipped += 1,
                }
                chunks_written += report.chunk_count as u64;
                for warning in &report.warnings {
                    eprintln!("Warning: {}", warning);
                }
            }
            Err(e) => {
                // Previous indexed state for this path is left untouched.
                eprintln!("Warning: failed to index {}: {:#}", file.relative, e);
                failed += 1;
            }
        }
    }

    let removed = store.remove_missing(&discovered, source.as_deref()).await?;

    println!("index");
    println!("  files found: {}", files.len());
    println!("  new: {}", new_files);
    println!("  updated: {}", updated);
    println!("  skipped (unchanged): {}", skipped);
    if failed > 0 {
        println!("  failed: {}", failed);
    }
    println!("  chunks written: {}", chunks_written);
    println!("  removed (missing from sources): {}", removed);
    println!("ok");

    Ok(())
}

/// Read a file as UTF-8, returning `None` for unreadable or binary content.
fn read_text(path: &std::path::Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    String::from_utf8(bytes).ok()
}
