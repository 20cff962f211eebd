//! The Index Store: incremental, hash-gated persistence with three
//! synchronized views per chunk.
//!
//! Each indexed file owns a row in the `files` manifest plus a set of chunk
//! rows mirrored into the FTS5 keyword index and the vector index. Updates
//! are clean-slate per file: chunk identifiers are content-derived, so a
//! changed file's old IDs are not reliably reusable, so delete-all then
//! insert-new inside one transaction avoids orphaned stale chunks.
//!
//! Failure semantics: a keyword- or vector-index write failure for one
//! chunk is downgraded to a warning on the report (recall degrades for that
//! chunk only); a chunk-row write failure aborts and rolls back the whole
//! file. Embedding failure is fatal for the file before the transaction
//! opens, leaving the previous hash in place so a later run retries.

use std::collections::HashSet;

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::chunker::chunk_file;
use crate::classify::classify;
use crate::config::{ChunkingConfig, Config, EmbeddingConfig};
use crate::db;
use crate::embedding;
use crate::fusion;
use crate::models::{
    Chunk, ContentType, IndexOutcome, IndexReport, ReleaseRecord, SearchFilters, SearchHit,
    RELEASE_SOURCE,
};

/// Owns the SQLite pool and the index configuration. Constructed once by
/// the process entry point and passed to every operation; there is no
/// module-level connection state.
pub struct Store {
    pool: SqlitePool,
    chunking: ChunkingConfig,
    embedding: EmbeddingConfig,
    vector_enabled: bool,
}

impl Store {
    /// Open the database and fix the vector backend's availability for the
    /// store's lifetime. With embeddings disabled all vector operations are
    /// no-ops and retrieval degrades to keyword-only.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.db.path).await?;
        let vector_enabled = config.embedding.is_enabled();
        Ok(Self {
            pool,
            chunking: config.chunking.clone(),
            embedding: config.embedding.clone(),
            vector_enabled,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn vector_enabled(&self) -> bool {
        self.vector_enabled
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    // ============ Incremental indexing ============

    /// Index one file's content under its repository-relative path.
    ///
    /// Hash-gated: if the stored hash matches and `force` is false, the
    /// file is skipped without re-chunking or re-embedding. Otherwise the
    /// path's chunk set is wholly replaced in one transaction.
    pub async fn index_path(
        &self,
        path: &str,
        content: &str,
        source: &str,
        revision: Option<&str>,
        force: bool,
    ) -> Result<IndexReport> {
        let hash = hash_bytes(content.as_bytes());

        let existing: Option<String> = sqlx::query_scalar("SELECT hash FROM files WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        if !force && existing.as_deref() == Some(hash.as_str()) {
            return Ok(IndexReport {
                outcome: IndexOutcome::Skipped,
                chunk_count: 0,
                warnings: Vec::new(),
            });
        }

        let class = classify(path);
        let chunks = chunk_file(path, content, source, &class, &self.chunking, revision);

        // Embed the whole file as one batch before touching storage, so an
        // embedding failure leaves the previous indexed state intact.
        let vectors: Option<Vec<Vec<f32>>> = if self.vector_enabled && !chunks.is_empty() {
            self.ensure_model_pin().await?;
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            Some(embedding::embed_texts(&self.embedding, &texts).await?)
        } else {
            None
        };

        let mut warnings: Vec<String> = Vec::new();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT id FROM chunks WHERE path = ?)",
        )
        .bind(path)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM chunks_fts WHERE path = ?")
            .bind(path)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE path = ?")
            .bind(path)
            .execute(&mut *tx)
            .await?;

        for (i, chunk) in chunks.iter().enumerate() {
            // Chunk-row failure is fatal: dropping the transaction rolls
            // back the whole file.
            sqlx::query(
                r#"
                INSERT INTO chunks (id, path, source, content_type, language, category, revision, start_line, end_line, text)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.path)
            .bind(&chunk.source)
            .bind(chunk.content_type.as_str())
            .bind(&chunk.language)
            .bind(&chunk.category)
            .bind(&chunk.revision)
            .bind(chunk.start_line)
            .bind(chunk.end_line)
            .bind(&chunk.text)
            .execute(&mut *tx)
            .await?;

            let fts = sqlx::query(
                r#"
                INSERT INTO chunks_fts (text, chunk_id, path, source, content_type, language, revision)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.text)
            .bind(&chunk.id)
            .bind(&chunk.path)
            .bind(&chunk.source)
            .bind(chunk.content_type.as_str())
            .bind(&chunk.language)
            .bind(&chunk.revision)
            .execute(&mut *tx)
            .await;
            if let Err(e) = fts {
                warnings.push(format!("keyword index write failed for {}: {}", chunk.id, e));
            }

            if let Some(ref vectors) = vectors {
                let blob = embedding::vec_to_blob(&vectors[i]);
                let vec_write =
                    sqlx::query("INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?, ?)")
                        .bind(&chunk.id)
                        .bind(&blob)
                        .execute(&mut *tx)
                        .await;
                if let Err(e) = vec_write {
                    warnings.push(format!("vector index write failed for {}: {}", chunk.id, e));
                }
            }
        }

        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO files (path, source, hash, indexed_at, revision)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                source = excluded.source,
                hash = excluded.hash,
                indexed_at = excluded.indexed_at,
                revision = excluded.revision
            "#,
        )
        .bind(path)
        .bind(source)
        .bind(&hash)
        .bind(now)
        .bind(revision)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(IndexReport {
            outcome: if existing.is_some() {
                IndexOutcome::Updated
            } else {
                IndexOutcome::New
            },
            chunk_count: chunks.len(),
            warnings,
        })
    }

    /// Deletion sweep: remove every previously indexed path absent from
    /// the current discovery pass. When `source` is given, only that
    /// source's files are candidates. Synthetic release documents never
    /// appear in discovery and are exempt from the full sweep; they go
    /// away only via release operations. Returns the number removed.
    pub async fn remove_missing(
        &self,
        discovered: &HashSet<String>,
        source: Option<&str>,
    ) -> Result<u64> {
        let rows = match source {
            Some(s) => {
                sqlx::query("SELECT path FROM files WHERE source = ?")
                    .bind(s)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT path FROM files WHERE source != ?")
                    .bind(RELEASE_SOURCE)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let stale: Vec<String> = rows
            .iter()
            .map(|r| r.get::<String, _>("path"))
            .filter(|p| !discovered.contains(p))
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for path in &stale {
            sqlx::query(
                "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT id FROM chunks WHERE path = ?)",
            )
            .bind(path)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM chunks_fts WHERE path = ?")
                .bind(path)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM chunks WHERE path = ?")
                .bind(path)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM files WHERE path = ?")
                .bind(path)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(stale.len() as u64)
    }

    /// Enforce single-model-per-index-lifetime: pin the embedding model
    /// and dimension on first vector write, and refuse mixed-dimension
    /// writes afterwards.
    async fn ensure_model_pin(&self) -> Result<()> {
        let model = self.embedding.model.clone().unwrap_or_default();
        let dims = self.embedding.dims.unwrap_or(0);

        let pinned_model: Option<String> =
            sqlx::query_scalar("SELECT value FROM meta WHERE key = 'embedding_model'")
                .fetch_optional(&self.pool)
                .await?;
        let pinned_dims: Option<String> =
            sqlx::query_scalar("SELECT value FROM meta WHERE key = 'embedding_dims'")
                .fetch_optional(&self.pool)
                .await?;

        if verify_model_pin(pinned_model.as_deref(), pinned_dims.as_deref(), &model, dims)? {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO meta (key, value) VALUES ('embedding_model', ?), ('embedding_dims', ?)",
        )
        .bind(&model)
        .bind(dims.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ============ Search primitives ============

    /// Keyword search over the FTS5 index.
    ///
    /// Tokenizes the query into alphanumeric/underscore terms joined with
    /// OR; a query with no extractable tokens returns empty rather than
    /// failing. Fetches `3 * limit` candidates to leave room for
    /// post-filtering, and converts the FTS rank statistic into a bounded
    /// score via `1 / (1 + |rank|)`.
    pub async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>> {
        let match_expr = match build_match_expr(query) {
            Some(expr) => expr,
            None => return Ok(Vec::new()),
        };

        let rows = sqlx::query(
            r#"
            SELECT c.id, c.path, c.source, c.content_type, c.language, c.category,
                   c.start_line, c.end_line, c.text, chunks_fts.rank AS rank
            FROM chunks_fts
            JOIN chunks c ON c.id = chunks_fts.chunk_id
            WHERE chunks_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind((limit * 3) as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::new();
        for row in &rows {
            let mut hit = hit_from_row(row);
            if !filters.matches(&hit.source, hit.content_type) {
                continue;
            }
            let rank: f64 = row.get("rank");
            hit.score = 1.0 / (1.0 + rank.abs());
            hits.push(hit);
            if hits.len() == limit {
                break;
            }
        }

        Ok(hits)
    }

    /// Vector search by cosine distance over stored embeddings.
    ///
    /// Same `3 * limit` over-fetch and post-filter pattern as keyword
    /// search; score is `1 - distance`. Returns empty when the vector
    /// backend is unavailable.
    pub async fn vector_search(
        &self,
        query_vec: &[f32],
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>> {
        if !self.vector_enabled || query_vec.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT c.id, c.path, c.source, c.content_type, c.language, c.category,
                   c.start_line, c.end_line, c.text, cv.embedding
            FROM chunk_vectors cv
            JOIN chunks c ON c.id = cv.chunk_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<(f64, SearchHit)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vec = embedding::blob_to_vec(&blob);
                let distance = 1.0 - embedding::cosine_similarity(query_vec, &vec) as f64;
                (distance, hit_from_row(row))
            })
            .collect();

        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(limit * 3);

        let mut hits = Vec::new();
        for (distance, mut hit) in candidates {
            if !filters.matches(&hit.source, hit.content_type) {
                continue;
            }
            hit.score = 1.0 - distance;
            hits.push(hit);
            if hits.len() == limit {
                break;
            }
        }

        Ok(hits)
    }

    /// Hybrid search: run both primitives with `2 * limit` candidates each
    /// and fuse the rankings. With no query vector (vector backend
    /// unavailable) the fused output equals pure keyword order.
    pub async fn hybrid_search(
        &self,
        query_vec: Option<&[f32]>,
        query_text: &str,
        limit: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<SearchHit>> {
        let fetch = limit * fusion::CANDIDATE_FACTOR;

        let keyword_hits = self.keyword_search(query_text, fetch, filters).await?;
        let vector_hits = match query_vec {
            Some(v) => self.vector_search(v, fetch, filters).await?,
            None => Vec::new(),
        };

        Ok(fusion::fuse(vector_hits, keyword_hits, limit))
    }

    // ============ Revision queries ============

    /// Chunks indexed under revisions strictly newer than `revision`,
    /// ordered revision descending then path ascending.
    pub async fn chunks_since(&self, revision: &str, limit: usize) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT id, path, source, content_type, language, category, revision,
                   start_line, end_line, text
            FROM chunks
            WHERE revision IS NOT NULL AND revision > ?
            ORDER BY revision DESC, path ASC
            LIMIT ?
            "#,
        )
        .bind(revision)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(chunk_from_row).collect())
    }

    // ============ Releases ============

    pub async fn upsert_release(&self, release: &ReleaseRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO releases (tag, commit_ref, date, previous_tag, commit_count,
                                  files_changed, insertions, deletions, changelog, impact)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(tag) DO UPDATE SET
                commit_ref = excluded.commit_ref,
                date = excluded.date,
                previous_tag = excluded.previous_tag,
                commit_count = excluded.commit_count,
                files_changed = excluded.files_changed,
                insertions = excluded.insertions,
                deletions = excluded.deletions,
                changelog = excluded.changelog,
                impact = excluded.impact
            "#,
        )
        .bind(&release.tag)
        .bind(&release.commit_ref)
        .bind(&release.date)
        .bind(&release.previous_tag)
        .bind(release.commit_count)
        .bind(release.files_changed)
        .bind(release.insertions)
        .bind(release.deletions)
        .bind(&release.changelog)
        .bind(&release.impact)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_releases(&self) -> Result<Vec<ReleaseRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT tag, commit_ref, date, previous_tag, commit_count,
                   files_changed, insertions, deletions, changelog, impact
            FROM releases
            ORDER BY tag DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ReleaseRecord {
                tag: row.get("tag"),
                commit_ref: row.get("commit_ref"),
                date: row.get("date"),
                previous_tag: row.get("previous_tag"),
                commit_count: row.get("commit_count"),
                files_changed: row.get("files_changed"),
                insertions: row.get("insertions"),
                deletions: row.get("deletions"),
                changelog: row.get("changelog"),
                impact: row.get("impact"),
            })
            .collect())
    }
}

/// Check the configured embedding model and dimension against an existing
/// pin. `Ok(true)` means the pin matches, `Ok(false)` means no pin exists
/// yet; any mismatch on model name or dimension is an error, since vectors
/// written under different settings are not comparable.
fn verify_model_pin(
    pinned_model: Option<&str>,
    pinned_dims: Option<&str>,
    model: &str,
    dims: usize,
) -> Result<bool> {
    let Some(existing_model) = pinned_model else {
        return Ok(false);
    };
    if existing_model != model {
        bail!(
            "Embedding model changed ({} -> {}). Existing vectors are invalid; \
             rebuild the index on a fresh database with `lode init` and `lode index --force`.",
            existing_model,
            model
        );
    }
    if let Some(existing_dims) = pinned_dims {
        if existing_dims != dims.to_string() {
            bail!(
                "Embedding dimension changed ({} -> {}). Existing vectors are invalid; \
                 rebuild the index on a fresh database with `lode init` and `lode index --force`.",
                existing_dims,
                dims
            );
        }
    }
    Ok(true)
}

/// Tokenize a query into alphanumeric/underscore terms and build an
/// OR-joined FTS5 MATCH expression. Returns `None` when no tokens remain.
fn build_match_expr(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn hit_from_row(row: &sqlx::sqlite::SqliteRow) -> SearchHit {
    let content_type: String = row.get("content_type");
    SearchHit {
        chunk_id: row.get("id"),
        path: row.get("path"),
        source: row.get("source"),
        content_type: ContentType::parse(&content_type).unwrap_or(ContentType::Doc),
        language: row.get("language"),
        category: row.get("category"),
        start_line: row.get("start_line"),
        end_line: row.get("end_line"),
        text: row.get("text"),
        score: 0.0,
    }
}

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> Chunk {
    let content_type: String = row.get("content_type");
    Chunk {
        id: row.get("id"),
        path: row.get("path"),
        source: row.get("source"),
        content_type: ContentType::parse(&content_type).unwrap_or(ContentType::Doc),
        language: row.get("language"),
        category: row.get("category"),
        revision: row.get("revision"),
        start_line: row.get("start_line"),
        end_line: row.get("end_line"),
        text: row.get("text"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_match_expr_tokenizes() {
        assert_eq!(
            build_match_expr("hybrid search!"),
            Some("\"hybrid\" OR \"search\"".to_string())
        );
        assert_eq!(
            build_match_expr("fn chunk_file(path)"),
            Some("\"fn\" OR \"chunk_file\" OR \"path\"".to_string())
        );
    }

    #[test]
    fn test_build_match_expr_empty() {
        assert_eq!(build_match_expr(""), None);
        assert_eq!(build_match_expr("!!! --- ???"), None);
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_bytes(b"abc"), hash_bytes(b"abc"));
        assert_ne!(hash_bytes(b"abc"), hash_bytes(b"abd"));
    }

    #[test]
    fn test_verify_model_pin_unpinned() {
        assert!(!verify_model_pin(None, None, "text-embedding-3-small", 1536).unwrap());
    }

    #[test]
    fn test_verify_model_pin_match() {
        let ok = verify_model_pin(
            Some("text-embedding-3-small"),
            Some("1536"),
            "text-embedding-3-small",
            1536,
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_verify_model_pin_rejects_model_change() {
        let err = verify_model_pin(Some("old-model"), Some("1536"), "new-model", 1536);
        assert!(err.is_err());
    }

    #[test]
    fn test_verify_model_pin_rejects_dimension_change() {
        // Same model name, different dimension: mixed-dimension vectors
        // would silently score 0.0, so this must fail loudly.
        let err = verify_model_pin(
            Some("text-embedding-3-small"),
            Some("1536"),
            "text-embedding-3-small",
            768,
        );
        assert!(err.is_err());
        assert!(err.unwrap_err().to_string().contains("dimension"));
    }
}
