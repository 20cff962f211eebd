//! End-to-end indexing and retrieval tests against a temporary database.
//!
//! The embedding provider is left disabled throughout, so vector results
//! are empty and hybrid retrieval exercises its keyword-only degradation.

use std::collections::HashSet;

use sqlx::Row;
use tempfile::TempDir;

use lodestone::config::{Config, DbConfig};
use lodestone::models::{ContentType, IndexOutcome, ReleaseRecord, SearchFilters};
use lodestone::store::Store;
use lodestone::{db, migrate, releases};

fn test_config(tmp: &TempDir) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("lode.sqlite"),
        },
        chunking: Default::default(),
        retrieval: Default::default(),
        embedding: Default::default(),
        sources: Vec::new(),
    }
}

async fn open_store(tmp: &TempDir) -> Store {
    let cfg = test_config(tmp);
    let pool = db::connect(&cfg.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    pool.close().await;
    Store::open(&cfg).await.unwrap()
}

async fn chunk_ids(store: &Store, path: &str) -> HashSet<String> {
    sqlx::query("SELECT id FROM chunks WHERE path = ?")
        .bind(path)
        .fetch_all(store.pool())
        .await
        .unwrap()
        .iter()
        .map(|r| r.get::<String, _>("id"))
        .collect()
}

fn no_filters() -> SearchFilters {
    SearchFilters::default()
}

#[tokio::test]
async fn test_index_then_skip_unchanged() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let text = "# Setup\n\nInstall the aardwolf toolchain before anything else.\n";
    let first = store
        .index_path("docs/setup.md", text, "docs", None, false)
        .await
        .unwrap();
    assert_eq!(first.outcome, IndexOutcome::New);
    assert!(first.chunk_count >= 1);
    assert!(first.warnings.is_empty());

    let second = store
        .index_path("docs/setup.md", text, "docs", None, false)
        .await
        .unwrap();
    assert_eq!(second.outcome, IndexOutcome::Skipped);
    assert_eq!(second.chunk_count, 0);
}

#[tokio::test]
async fn test_force_reindex_reproduces_chunk_ids() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let text = "# Guide\n\nSame content produces the same chunk identifiers.\n";
    store
        .index_path("docs/guide.md", text, "docs", None, false)
        .await
        .unwrap();
    let before = chunk_ids(&store, "docs/guide.md").await;
    assert!(!before.is_empty());

    let report = store
        .index_path("docs/guide.md", text, "docs", None, true)
        .await
        .unwrap();
    assert_eq!(report.outcome, IndexOutcome::Updated);

    let after = chunk_ids(&store, "docs/guide.md").await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_changed_content_replaces_chunks() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/notes.md", "Mentions the blorptangle widget.\n", "docs", None, false)
        .await
        .unwrap();
    store
        .index_path("docs/notes.md", "Now mentions the crumplehorn widget.\n", "docs", None, false)
        .await
        .unwrap();

    let stale = store
        .keyword_search("blorptangle", 10, &no_filters())
        .await
        .unwrap();
    assert!(stale.is_empty());

    let fresh = store
        .keyword_search("crumplehorn", 10, &no_filters())
        .await
        .unwrap();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].path, "docs/notes.md");
    assert!(fresh[0].score > 0.0);
}

#[tokio::test]
async fn test_deletion_sweep_removes_missing_paths() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/kept.md", "The snickerdoodle procedure.\n", "docs", None, false)
        .await
        .unwrap();
    store
        .index_path("docs/gone.md", "The vanishment procedure.\n", "docs", None, false)
        .await
        .unwrap();

    let mut discovered = HashSet::new();
    discovered.insert("docs/kept.md".to_string());

    let removed = store.remove_missing(&discovered, None).await.unwrap();
    assert_eq!(removed, 1);

    assert!(chunk_ids(&store, "docs/gone.md").await.is_empty());
    assert!(!chunk_ids(&store, "docs/kept.md").await.is_empty());

    let hits = store
        .keyword_search("vanishment", 10, &no_filters())
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_sweep_scoped_to_source() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/a.md", "Alpha text.\n", "docs", None, false)
        .await
        .unwrap();
    store
        .index_path("code/b.rs", "fn beta() {}\n", "code", None, false)
        .await
        .unwrap();

    // Sweep the docs source with nothing discovered; the code source
    // must be untouched.
    let removed = store
        .remove_missing(&HashSet::new(), Some("docs"))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(!chunk_ids(&store, "code/b.rs").await.is_empty());
}

#[tokio::test]
async fn test_keyword_search_filters() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/deploy.md", "How to deploy the flumph service.\n", "docs", None, false)
        .await
        .unwrap();
    store
        .index_path("code/deploy.rs", "fn deploy_flumph() {}\n", "code", None, false)
        .await
        .unwrap();

    let all = store
        .keyword_search("flumph", 10, &no_filters())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let docs_only = store
        .keyword_search(
            "flumph",
            10,
            &SearchFilters {
                source: Some("docs".to_string()),
                content_type: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(docs_only.len(), 1);
    assert_eq!(docs_only[0].source, "docs");

    let code_only = store
        .keyword_search(
            "flumph",
            10,
            &SearchFilters {
                source: None,
                content_type: Some(ContentType::Code),
            },
        )
        .await
        .unwrap();
    assert_eq!(code_only.len(), 1);
    assert_eq!(code_only[0].content_type, ContentType::Code);
}

#[tokio::test]
async fn test_hybrid_degrades_to_keyword_order() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path(
            "docs/first.md",
            "gribbleflotz gribbleflotz gribbleflotz appears often here.\n",
            "docs",
            None,
            false,
        )
        .await
        .unwrap();
    store
        .index_path(
            "docs/second.md",
            "A single gribbleflotz mention among much other unrelated text about many topics.\n",
            "docs",
            None,
            false,
        )
        .await
        .unwrap();

    let keyword = store
        .keyword_search("gribbleflotz", 10, &no_filters())
        .await
        .unwrap();
    let hybrid = store
        .hybrid_search(None, "gribbleflotz", 10, &no_filters())
        .await
        .unwrap();

    let keyword_ids: Vec<&str> = keyword.iter().map(|h| h.chunk_id.as_str()).collect();
    let hybrid_ids: Vec<&str> = hybrid.iter().map(|h| h.chunk_id.as_str()).collect();
    assert_eq!(keyword_ids, hybrid_ids);
}

#[tokio::test]
async fn test_vector_search_empty_when_disabled() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/a.md", "Some indexed content.\n", "docs", None, false)
        .await
        .unwrap();

    let hits = store
        .vector_search(&[0.1, 0.2, 0.3], 10, &no_filters())
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_tokenless_query_returns_empty() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/a.md", "Content exists.\n", "docs", None, false)
        .await
        .unwrap();

    assert!(store
        .keyword_search("", 10, &no_filters())
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .keyword_search("!!! ---", 10, &no_filters())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_empty_file_indexes_no_chunks() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let report = store
        .index_path("docs/empty.md", "", "docs", None, false)
        .await
        .unwrap();
    assert_eq!(report.outcome, IndexOutcome::New);
    assert_eq!(report.chunk_count, 0);
    assert!(chunk_ids(&store, "docs/empty.md").await.is_empty());

    // The manifest row still exists, so a second pass skips the file.
    let again = store
        .index_path("docs/empty.md", "", "docs", None, false)
        .await
        .unwrap();
    assert_eq!(again.outcome, IndexOutcome::Skipped);
}

#[tokio::test]
async fn test_chunks_since_orders_by_revision_then_path() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/old.md", "Indexed at the baseline.\n", "docs", Some("v1.0.0"), false)
        .await
        .unwrap();
    store
        .index_path("docs/mid.md", "Indexed one release later.\n", "docs", Some("v1.1.0"), false)
        .await
        .unwrap();
    store
        .index_path("docs/newest.md", "Indexed most recently.\n", "docs", Some("v1.2.0"), false)
        .await
        .unwrap();
    store
        .index_path("docs/also-new.md", "Also most recent.\n", "docs", Some("v1.2.0"), false)
        .await
        .unwrap();

    let chunks = store.chunks_since("v1.0.0", 50).await.unwrap();
    let listing: Vec<(&str, &str)> = chunks
        .iter()
        .map(|c| (c.revision.as_deref().unwrap(), c.path.as_str()))
        .collect();

    assert_eq!(
        listing,
        vec![
            ("v1.2.0", "docs/also-new.md"),
            ("v1.2.0", "docs/newest.md"),
            ("v1.1.0", "docs/mid.md"),
        ]
    );
}

#[tokio::test]
async fn test_release_import_indexes_changelog() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    let record = ReleaseRecord {
        tag: "v2.0.0".to_string(),
        commit_ref: "deadbeef".to_string(),
        date: "2026-08-01".to_string(),
        previous_tag: Some("v1.9.0".to_string()),
        commit_count: 40,
        files_changed: 120,
        insertions: 3000,
        deletions: 800,
        changelog: "- Rewrote the quompus subsystem\n- Dropped legacy endpoints".to_string(),
        impact: "major".to_string(),
    };

    let file = tmp.path().join("v2.0.0.json");
    std::fs::write(&file, serde_json::to_string(&record).unwrap()).unwrap();

    releases::run_import(&store, &file).await.unwrap();

    let listed = store.list_releases().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].tag, "v2.0.0");
    assert_eq!(listed[0].insertions, 3000);

    // The changelog text is reachable through ordinary search.
    let hits = store
        .keyword_search("quompus", 10, &no_filters())
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "releases/v2.0.0.md");
    assert_eq!(hits[0].source, "release");

    // Changelog chunks carry the tag as their revision.
    let since = store.chunks_since("v1.9.0", 50).await.unwrap();
    assert!(since.iter().any(|c| c.path == "releases/v2.0.0.md"));

    // Re-import is an upsert, not a duplicate.
    releases::run_import(&store, &file).await.unwrap();
    assert_eq!(store.list_releases().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_sweep_preserves_imported_releases() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/kept.md", "Kept file.\n", "docs", None, false)
        .await
        .unwrap();
    store
        .index_path("docs/gone.md", "Vanishing file.\n", "docs", None, false)
        .await
        .unwrap();

    let record = ReleaseRecord {
        tag: "v3.0.0".to_string(),
        commit_ref: "cafef00d".to_string(),
        date: "2026-08-15".to_string(),
        previous_tag: Some("v2.9.0".to_string()),
        commit_count: 5,
        files_changed: 9,
        insertions: 120,
        deletions: 40,
        changelog: "- Landed the wibbleplex rework".to_string(),
        impact: "minor".to_string(),
    };
    let file = tmp.path().join("v3.0.0.json");
    std::fs::write(&file, serde_json::to_string(&record).unwrap()).unwrap();
    releases::run_import(&store, &file).await.unwrap();

    // A normal full index pass discovers only filesystem files; the
    // synthetic release document must survive the sweep.
    let mut discovered = HashSet::new();
    discovered.insert("docs/kept.md".to_string());
    let removed = store.remove_missing(&discovered, None).await.unwrap();
    assert_eq!(removed, 1);

    assert!(chunk_ids(&store, "docs/gone.md").await.is_empty());
    assert!(!chunk_ids(&store, "releases/v3.0.0.md").await.is_empty());

    let hits = store
        .keyword_search("wibbleplex", 10, &no_filters())
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].path, "releases/v3.0.0.md");
    assert_eq!(hits[0].source, "release");
}

#[tokio::test]
async fn test_synthetic_header_and_line_ranges() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .index_path("docs/header.md", "First line mentioning zanzibar.\nSecond line.\n", "docs", None, false)
        .await
        .unwrap();

    let hits = store
        .keyword_search("zanzibar", 10, &no_filters())
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    let hit = &hits[0];
    assert_eq!(hit.start_line, 1);
    assert_eq!(hit.end_line, 3);
    assert!(hit.text.starts_with("[docs/header.md:1-2]\n"));
}
