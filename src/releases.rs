//! Release records: import, listing, and the chunks-since-revision query.
//!
//! An imported release is stored twice: as a structured row in `releases`
//! and as a synthetic markdown document indexed like any other file under
//! `releases/{tag}.md`, so changelog text is reachable through ordinary
//! search. The synthetic document is stamped with the release tag as its
//! revision.

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::{ReleaseRecord, RELEASE_SOURCE};
use crate::store::Store;

pub async fn run_import(store: &Store, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read release file: {}", file.display()))?;
    let record: ReleaseRecord = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid release record: {}", file.display()))?;

    if record.tag.trim().is_empty() {
        anyhow::bail!("Release record has an empty tag");
    }

    store.upsert_release(&record).await?;

    let path = format!("releases/{}.md", record.tag);
    let text = render_changelog(&record);
    let report = store
        .index_path(&path, &text, RELEASE_SOURCE, Some(&record.tag), true)
        .await?;
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }

    println!("release import {}", record.tag);
    println!("  chunks written: {}", report.chunk_count);
    println!("ok");

    Ok(())
}

pub async fn run_list(store: &Store) -> Result<()> {
    let releases = store.list_releases().await?;

    if releases.is_empty() {
        println!("No releases.");
        return Ok(());
    }

    for release in &releases {
        println!("{}  {}  ({})", release.tag, release.date, release.commit_ref);
        if let Some(ref prev) = release.previous_tag {
            println!(
                "    since {}: {} commits, {} files, +{} -{}",
                prev,
                release.commit_count,
                release.files_changed,
                release.insertions,
                release.deletions
            );
        }
    }

    Ok(())
}

/// Print chunks indexed under revisions newer than `since`.
pub async fn run_changed(store: &Store, since: &str, limit: usize) -> Result<()> {
    let chunks = store.chunks_since(since, limit).await?;

    if chunks.is_empty() {
        println!("No chunks newer than {}.", since);
        return Ok(());
    }

    for chunk in &chunks {
        let revision = chunk.revision.as_deref().unwrap_or("?");
        println!(
            "{}  {}:{}-{}  [{}]",
            revision,
            chunk.path,
            chunk.start_line,
            chunk.end_line - 1,
            chunk.id
        );
    }

    Ok(())
}

/// Render a release record as the markdown document that gets indexed.
fn render_changelog(record: &ReleaseRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Release {}\n\n", record.tag));
    out.push_str(&format!("Date: {}\n", record.date));
    out.push_str(&format!("Commit: {}\n", record.commit_ref));
    if let Some(ref prev) = record.previous_tag {
        out.push_str(&format!("Previous release: {}\n", prev));
        out.push_str(&format!(
            "Changes: {} commits, {} files changed, +{} -{}\n",
            record.commit_count, record.files_changed, record.insertions, record.deletions
        ));
    }
    if !record.impact.is_empty() {
        out.push_str(&format!("Impact: {}\n", record.impact));
    }
    out.push_str("\n## Changelog\n\n");
    out.push_str(record.changelog.trim_end());
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ReleaseRecord {
        ReleaseRecord {
            tag: "v1.4.0".to_string(),
            commit_ref: "abc1234".to_string(),
            date: "2026-07-01".to_string(),
            previous_tag: Some("v1.3.0".to_string()),
            commit_count: 12,
            files_changed: 30,
            insertions: 900,
            deletions: 240,
            changelog: "- Added retries to the embedding client\n- Fixed sweep ordering".to_string(),
            impact: "minor".to_string(),
        }
    }

    #[test]
    fn test_render_includes_sections() {
        let text = render_changelog(&record());
        assert!(text.starts_with("# Release v1.4.0"));
        assert!(text.contains("Previous release: v1.3.0"));
        assert!(text.contains("Impact: minor"));
        assert!(text.contains("## Changelog"));
        assert!(text.contains("12 commits, 30 files changed, +900 -240"));
    }

    #[test]
    fn test_render_first_release_has_no_diff_stats() {
        let mut rec = record();
        rec.previous_tag = None;
        rec.impact = String::new();
        let text = render_changelog(&rec);
        assert!(!text.contains("Previous release"));
        assert!(!text.contains("Impact:"));
        assert!(text.contains("## Changelog"));
    }
}
