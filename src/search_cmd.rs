//! The `search` command: query expansion, mode dispatch, result printing.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding;
use crate::models::{ContentType, SearchFilters, SearchHit};
use crate::store::Store;
use crate::synonyms;

pub async fn run_search(
    config: &Config,
    store: &Store,
    query: &str,
    mode: &str,
    limit: Option<usize>,
    source: Option<String>,
    content_type: Option<String>,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    match mode {
        "keyword" | "semantic" | "hybrid" => {}
        _ => bail!(
            "Unknown search mode: {}. Use keyword, semantic, or hybrid.",
            mode
        ),
    }

    // Semantic is meaningless without a vector backend; hybrid degrades
    // to keyword order instead.
    if mode == "semantic" && !config.embedding.is_enabled() {
        bail!("Mode 'semantic' requires embeddings. Set [embedding] provider in config.");
    }

    let content_type = match content_type.as_deref() {
        None => None,
        Some(raw) => match ContentType::parse(raw) {
            Some(ct) => Some(ct),
            None => bail!("Unknown content type: {}. Use doc, code, or schema.", raw),
        },
    };

    let filters = SearchFilters {
        source,
        content_type,
    };
    let limit = limit.unwrap_or(config.retrieval.final_limit);

    let expanded = synonyms::expand(query);

    let query_vec = if mode != "keyword" && config.embedding.is_enabled() {
        Some(embedding::embed_query(&config.embedding, &expanded).await?)
    } else {
        None
    };

    let hits = match mode {
        "keyword" => store.keyword_search(&expanded, limit, &filters).await?,
        "semantic" => {
            let vec = query_vec.as_deref().unwrap_or(&[]);
            store.vector_search(vec, limit, &filters).await?
        }
        _ => {
            store
                .hybrid_search(query_vec.as_deref(), &expanded, limit, &filters)
                .await?
        }
    };

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        print_hit(i + 1, hit);
    }

    Ok(())
}

fn print_hit(position: usize, hit: &SearchHit) {
    println!(
        "{}. [{:.4}] {}:{}-{}",
        position,
        hit.score,
        hit.path,
        hit.start_line,
        hit.end_line - 1
    );
    match &hit.language {
        Some(lang) => println!(
            "    source: {} | type: {} ({}) | category: {}",
            hit.source,
            hit.content_type.as_str(),
            lang,
            hit.category
        ),
        None => println!(
            "    source: {} | type: {} | category: {}",
            hit.source,
            hit.content_type.as_str(),
            hit.category
        ),
    }
    println!("    excerpt: \"{}\"", excerpt(&hit.text, 160));
    println!("    id: {}", hit.chunk_id);
    println!();
}

/// Flatten a chunk body to a single line capped at `max` characters,
/// skipping the synthetic header line.
fn excerpt(text: &str, max: usize) -> String {
    let body = match text.split_once('\n') {
        Some((first, rest)) if first.starts_with('[') && first.ends_with(']') => rest,
        _ => text,
    };
    let flat: String = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let truncated: String = flat.chars().take(max).collect();
        format!("{}...", truncated.trim_end())
    }
}
