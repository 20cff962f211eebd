use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema. Idempotent; safe to run on every startup.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // File manifest: one row per indexed path, hash-gated.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            path TEXT PRIMARY KEY,
            source TEXT NOT NULL,
            hash TEXT NOT NULL,
            indexed_at INTEGER NOT NULL,
            revision TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            source TEXT NOT NULL,
            content_type TEXT NOT NULL,
            language TEXT,
            category TEXT NOT NULL,
            revision TEXT,
            start_line INTEGER NOT NULL,
            end_line INTEGER NOT NULL,
            text TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 virtual table over chunk text, with filter columns carried
    // through unindexed. FTS5 CREATE is not idempotent natively, so check.
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='chunks_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE chunks_fts USING fts5(
                text,
                chunk_id UNINDEXED,
                path UNINDEXED,
                source UNINDEXED,
                content_type UNINDEXED,
                language UNINDEXED,
                revision UNINDEXED
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    // Vector index: one embedding BLOB per chunk (little-endian f32).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            chunk_id TEXT PRIMARY KEY,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS releases (
            tag TEXT PRIMARY KEY,
            commit_ref TEXT NOT NULL,
            date TEXT NOT NULL,
            previous_tag TEXT,
            commit_count INTEGER NOT NULL DEFAULT 0,
            files_changed INTEGER NOT NULL DEFAULT 0,
            insertions INTEGER NOT NULL DEFAULT 0,
            deletions INTEGER NOT NULL DEFAULT 0,
            changelog TEXT NOT NULL,
            impact TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Single-row settings, e.g. the pinned embedding model.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_path ON chunks(path)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_revision ON chunks(revision)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_source ON files(source)")
        .execute(pool)
        .await?;

    Ok(())
}
