//! Index status and health overview.
//!
//! A quick summary of what is indexed: file and chunk counts, vector
//! coverage, release count, and per-source breakdowns. Used by
//! `lode status` to confirm indexing passes are doing what they should.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::store::Store;

/// Per-source breakdown of file and chunk counts.
struct SourceStats {
    source: String,
    file_count: i64,
    chunk_count: i64,
    embedded_count: i64,
    last_indexed_ts: Option<i64>,
}

pub async fn run_status(config: &Config, store: &Store) -> Result<()> {
    let pool = store.pool();

    let total_files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(pool)
        .await?;

    let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
        .fetch_one(pool)
        .await?;

    let total_embedded: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors")
        .fetch_one(pool)
        .await?;

    let total_releases: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM releases")
        .fetch_one(pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Lodestone — Index Status");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Files:       {}", total_files);
    println!("  Chunks:      {}", total_chunks);
    println!(
        "  Embedded:    {} / {} ({}%)",
        total_embedded,
        total_chunks,
        if total_chunks > 0 {
            (total_embedded * 100) / total_chunks
        } else {
            0
        }
    );
    println!("  Releases:    {}", total_releases);
    println!(
        "  Vectors:     {}",
        if store.vector_enabled() {
            "enabled"
        } else {
            "disabled (keyword-only retrieval)"
        }
    );

    let source_rows = sqlx::query(
        r#"
        SELECT
            f.source,
            COUNT(DISTINCT f.path) AS file_count,
            COUNT(DISTINCT c.id) AS chunk_count,
            COUNT(DISTINCT cv.chunk_id) AS embedded_count,
            MAX(f.indexed_at) AS last_indexed
        FROM files f
        LEFT JOIN chunks c ON c.path = f.path
        LEFT JOIN chunk_vectors cv ON cv.chunk_id = c.id
        GROUP BY f.source
        ORDER BY file_count DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let source_stats: Vec<SourceStats> = source_rows
        .iter()
        .map(|row| SourceStats {
            source: row.get("source"),
            file_count: row.get("file_count"),
            chunk_count: row.get("chunk_count"),
            embedded_count: row.get("embedded_count"),
            last_indexed_ts: row.get("last_indexed"),
        })
        .collect();

    if !source_stats.is_empty() {
        println!();
        println!("  By source:");
        println!(
            "  {:<24} {:>6} {:>8} {:>10}   {}",
            "SOURCE", "FILES", "CHUNKS", "EMBEDDED", "LAST INDEXED"
        );
        println!("  {}", "-".repeat(76));

        for s in &source_stats {
            let indexed_display = match s.last_indexed_ts {
                Some(ts) => format_ts_relative(ts),
                None => "never".to_string(),
            };
            println!(
                "  {:<24} {:>6} {:>8} {:>10}   {}",
                s.source, s.file_count, s.chunk_count, s.embedded_count, indexed_display
            );
        }
    }

    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp as a relative time string (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
