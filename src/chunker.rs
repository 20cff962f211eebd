//! Boundary-aware line chunker.
//!
//! Splits file content into [`Chunk`]s that respect a per-content-type
//! character budget. Breaks prefer semantically meaningful lines: function,
//! class, and type declarations for code; markdown headings and blank lines
//! for prose. A hard override at 1.2x the budget bounds worst-case chunk
//! size when no boundary appears.
//!
//! Each chunk after the first is seeded with a trailing window of its
//! predecessor's lines, so retrieval at chunk boundaries keeps context.
//! Chunk identity is content-derived: SHA-256 of the stored text plus the
//! starting line, stable across unchanged re-chunking.

use sha2::{Digest, Sha256};

use crate::config::ChunkingConfig;
use crate::models::{Chunk, Classification, ContentType};

/// Split file content into an ordered list of chunks.
///
/// The union of chunk line ranges, after subtracting each chunk's leading
/// overlap, covers the file exactly once. Empty input produces no chunks.
/// A single line exceeding the budget still becomes one (oversized) chunk;
/// physical lines are never split.
pub fn chunk_file(
    path: &str,
    content: &str,
    source: &str,
    class: &Classification,
    cfg: &ChunkingConfig,
    revision: Option<&str>,
) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let is_code = class.content_type == ContentType::Code;
    let budget = if is_code {
        cfg.code_budget_chars
    } else {
        cfg.doc_budget_chars
    };
    let hard_cap = budget + budget / 5;

    let mut chunks: Vec<Chunk> = Vec::new();
    // Current chunk as (1-based line number, line) pairs. After a break this
    // starts with the carried overlap tail of the previous chunk.
    let mut cur: Vec<(usize, &str)> = Vec::new();
    let mut cur_chars = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_chars = line.chars().count() + 1; // +1 for the newline

        if !cur.is_empty() && cur_chars + line_chars > budget {
            let at_boundary = if is_code {
                is_strong_boundary(line)
            } else {
                is_weak_boundary(line)
            };
            let force = cur_chars + line_chars > hard_cap;

            if at_boundary || force {
                chunks.push(make_chunk(path, source, class, revision, &cur));
                let carried = trailing_overlap(&cur, cfg.overlap_chars);
                cur_chars = carried
                    .iter()
                    .map(|(_, l)| l.chars().count() + 1)
                    .sum();
                cur = carried;
            }
        }

        cur.push((line_no, line));
        cur_chars += line_chars;
    }

    if !cur.is_empty() {
        chunks.push(make_chunk(path, source, class, revision, &cur));
    }

    chunks
}

/// Lines that open a function, class, or type/interface/enum declaration.
/// Covers Rust, TypeScript/JavaScript (including exported variants and
/// const-assigned function expressions), Python, and Go.
fn is_strong_boundary(line: &str) -> bool {
    let mut t = line.trim_start();

    // Strip visibility/modifier keywords so `pub async fn` and
    // `export default class` reduce to their declaration keyword.
    let modifiers = [
        "export default ",
        "export ",
        "pub(crate) ",
        "pub(super) ",
        "pub ",
        "async ",
        "abstract ",
        "unsafe ",
    ];
    loop {
        let mut stripped = false;
        for m in modifiers {
            if let Some(rest) = t.strip_prefix(m) {
                t = rest;
                stripped = true;
            }
        }
        if !stripped {
            break;
        }
    }

    const DECLARATIONS: &[&str] = &[
        "fn ",
        "function ",
        "class ",
        "struct ",
        "enum ",
        "trait ",
        "interface ",
        "type ",
        "impl ",
        "def ",
        "func ",
    ];
    if DECLARATIONS.iter().any(|d| t.starts_with(d)) {
        return true;
    }

    // Const-assigned function expressions: `const handler = async (req) =>`
    if t.starts_with("const ") || t.starts_with("let ") || t.starts_with("var ") {
        return t.contains("=>") || t.contains("= function");
    }

    false
}

/// Markdown heading or blank line.
fn is_weak_boundary(line: &str) -> bool {
    let t = line.trim();
    t.is_empty() || t.starts_with('#')
}

/// Walk backward over the just-emitted lines, accumulating characters until
/// the overlap budget is reached. Returns the carried tail in file order,
/// with original line numbers.
///
/// The final line is always carried, even when it alone exceeds the budget,
/// so a successor chunk never starts without predecessor context; the
/// budget can therefore be exceeded by at most that one line. A zero budget
/// disables overlap entirely.
fn trailing_overlap<'a>(emitted: &[(usize, &'a str)], overlap_chars: usize) -> Vec<(usize, &'a str)> {
    if overlap_chars == 0 {
        return Vec::new();
    }

    let mut carried: Vec<(usize, &'a str)> = Vec::new();
    let mut acc = 0usize;

    for &(no, line) in emitted.iter().rev() {
        let chars = line.chars().count() + 1;
        if !carried.is_empty() && acc + chars > overlap_chars {
            break;
        }
        carried.push((no, line));
        acc += chars;
        if acc >= overlap_chars {
            break;
        }
    }

    carried.reverse();
    carried
}

fn make_chunk(
    path: &str,
    source: &str,
    class: &Classification,
    revision: Option<&str>,
    lines: &[(usize, &str)],
) -> Chunk {
    let start_line = lines[0].0 as i64;
    let end_line = lines[lines.len() - 1].0 as i64 + 1;

    // Synthetic header naming the origin, indexed alongside the body so
    // path-aware queries can match on it.
    let mut text = format!("[{}:{}-{}]\n", path, start_line, end_line - 1);
    for (i, (_, line)) in lines.iter().enumerate() {
        text.push_str(line);
        if i + 1 < lines.len() {
            text.push('\n');
        }
    }

    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let id = format!("{}-{}", &digest[..16], start_line);

    Chunk {
        id,
        path: path.to_string(),
        source: source.to_string(),
        content_type: class.content_type,
        language: class.language.clone(),
        category: class.category.clone(),
        revision: revision.map(|r| r.to_string()),
        start_line,
        end_line,
        text,
    }
}
