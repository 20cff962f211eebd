//! Core data models used throughout Lodestone.
//!
//! These types represent the files, chunks, search results, and release
//! records that flow through the indexing and retrieval pipeline.

use serde::{Deserialize, Serialize};

/// Coarse content classification of a source file, used as a filter
/// predicate in both search indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// Narrative prose: markdown, plain text, rst.
    Doc,
    /// Source code in a recognized programming language.
    Code,
    /// Structured schema/config files: JSON, YAML, TOML, proto, etc.
    Schema,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Doc => "doc",
            ContentType::Code => "code",
            ContentType::Schema => "schema",
        }
    }

    pub fn parse(s: &str) -> Option<ContentType> {
        match s {
            "doc" => Some(ContentType::Doc),
            "code" => Some(ContentType::Code),
            "schema" => Some(ContentType::Schema),
            _ => None,
        }
    }
}

/// Metadata derived from a file's path: content type, language, and a
/// coarser category label. A fixed lookup, computed once per file.
#[derive(Debug, Clone)]
pub struct Classification {
    pub content_type: ContentType,
    pub language: Option<String>,
    pub category: String,
}

/// A retrieval-sized slice of a source file, the atomic unit of indexing
/// and search.
///
/// Identity is content-derived: the first 16 hex chars of the SHA-256 of
/// the stored text, joined with the starting line. Unchanged re-chunking
/// reproduces the same IDs; distinct chunks never collide on both digest
/// and start line.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub path: String,
    pub source: String,
    pub content_type: ContentType,
    pub language: Option<String>,
    pub category: String,
    pub revision: Option<String>,
    /// 1-based, inclusive.
    pub start_line: i64,
    /// Exclusive.
    pub end_line: i64,
    /// Chunk body prefixed with a synthetic `[path:start-end]` header line.
    pub text: String,
}

/// Outcome of indexing a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    New,
    Updated,
    Skipped,
}

/// Report returned by `Store::index_path`: the outcome plus any non-fatal
/// secondary-index write failures that degraded recall for single chunks.
#[derive(Debug, Clone)]
pub struct IndexReport {
    pub outcome: IndexOutcome,
    pub chunk_count: usize,
    pub warnings: Vec<String>,
}

/// Optional filters applied inside both search primitives before fusion.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub source: Option<String>,
    pub content_type: Option<ContentType>,
}

impl SearchFilters {
    pub fn matches(&self, source: &str, content_type: ContentType) -> bool {
        if let Some(ref s) = self.source {
            if s != source {
                return false;
            }
        }
        if let Some(ct) = self.content_type {
            if ct != content_type {
                return false;
            }
        }
        true
    }
}

/// A ranked search result.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_id: String,
    pub path: String,
    pub source: String,
    pub content_type: ContentType,
    pub language: Option<String>,
    pub category: String,
    pub start_line: i64,
    pub end_line: i64,
    pub text: String,
    pub score: f64,
}

/// Source label for synthetic release changelog documents. These never
/// appear in filesystem discovery, so the deletion sweep exempts them;
/// they are replaced only by re-importing the release.
pub const RELEASE_SOURCE: &str = "release";

/// A structured release record, produced by external changelog tooling and
/// imported via `lode release import`. Linked to chunks only through the
/// revision tag stamped on chunks indexed under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub tag: String,
    pub commit_ref: String,
    /// ISO date of the release (YYYY-MM-DD).
    pub date: String,
    pub previous_tag: Option<String>,
    #[serde(default)]
    pub commit_count: i64,
    #[serde(default)]
    pub files_changed: i64,
    #[serde(default)]
    pub insertions: i64,
    #[serde(default)]
    pub deletions: i64,
    /// Categorized changelog text.
    pub changelog: String,
    /// Impact classification: `major`, `minor`, or `patch`.
    pub impact: String,
}
