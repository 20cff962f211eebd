//! Filesystem discovery for configured source trees.
//!
//! Walks each source root, applying include/exclude glob patterns, and
//! returns already-filtered (absolute path, relative path, source) triples
//! in deterministic order. The indexing core treats this listing as its
//! complete view of the world: paths missing from it are swept from the
//! index.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::SourceConfig;

/// A file found under a configured source root.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub absolute: PathBuf,
    /// Source-prefixed relative path used as the file's index identity,
    /// e.g. `docs/guides/setup.md`.
    pub relative: String,
    pub source: String,
}

/// Walk one source root and return its matching files.
pub fn discover(source: &SourceConfig) -> Result<Vec<DiscoveredFile>> {
    if !source.root.exists() {
        bail!(
            "Source '{}' root does not exist: {}",
            source.name,
            source.root.display()
        );
    }

    let include_set = build_globset(&source.include)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(source.exclude.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(&source.root).follow_links(source.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(&source.root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(DiscoveredFile {
            absolute: path.to_path_buf(),
            relative: format!("{}/{}", source.name, rel_str),
            source: source.name.clone(),
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(files)
}

/// Walk every configured source, optionally restricted to one by name.
pub fn discover_all(
    sources: &[SourceConfig],
    only: Option<&str>,
) -> Result<Vec<DiscoveredFile>> {
    let mut files = Vec::new();
    let mut matched = false;

    for source in sources {
        if let Some(name) = only {
            if source.name != name {
                continue;
            }
        }
        matched = true;
        files.extend(discover(source)?);
    }

    if let Some(name) = only {
        if !matched {
            bail!("No configured source named '{}'", name);
        }
    }

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
