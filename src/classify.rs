//! Path-based metadata derivation.
//!
//! Content type, language tag, and category label are deterministic
//! functions of the file extension and path substrings. These fields are
//! the filter predicates used by both search primitives, so every chunk
//! must carry them.

use crate::models::{Classification, ContentType};

/// Extension → language tag for recognized programming languages.
const CODE_LANGUAGES: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("mjs", "javascript"),
    ("py", "python"),
    ("go", "go"),
    ("java", "java"),
    ("rb", "ruby"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("sh", "shell"),
    ("bash", "shell"),
    ("sql", "sql"),
];

/// Extension → language tag for structured schema/config formats.
const SCHEMA_LANGUAGES: &[(&str, &str)] = &[
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("toml", "toml"),
    ("proto", "protobuf"),
    ("graphql", "graphql"),
    ("xsd", "xml"),
];

/// Extensions treated as narrative documentation.
const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "txt", "rst", "adoc"];

/// Classify a repository-relative path into content type, language, and
/// category. Unknown extensions fall back to narrative doc handling.
pub fn classify(path: &str) -> Classification {
    let lower = path.to_ascii_lowercase();
    let ext = lower.rsplit('.').next().filter(|e| *e != lower).unwrap_or("");
    let file_name = lower.rsplit('/').next().unwrap_or(&lower);

    if let Some((_, lang)) = CODE_LANGUAGES.iter().find(|(e, _)| *e == ext) {
        return Classification {
            content_type: ContentType::Code,
            language: Some((*lang).to_string()),
            category: "code".to_string(),
        };
    }

    if let Some((_, lang)) = SCHEMA_LANGUAGES.iter().find(|(e, _)| *e == ext) {
        return Classification {
            content_type: ContentType::Schema,
            language: Some((*lang).to_string()),
            category: "config".to_string(),
        };
    }

    // Schema-like names without a schema extension still count as config.
    if file_name.contains("schema") || file_name.starts_with("types.") {
        return Classification {
            content_type: ContentType::Schema,
            language: None,
            category: "config".to_string(),
        };
    }

    let language = if DOC_EXTENSIONS.contains(&ext) {
        Some("markdown".to_string()).filter(|_| ext == "md" || ext == "mdx" || ext == "markdown")
    } else {
        None
    };

    let category = doc_category(&lower);

    Classification {
        content_type: ContentType::Doc,
        language,
        category,
    }
}

/// Category label for narrative content, keyed on path substrings.
fn doc_category(lower_path: &str) -> String {
    let in_tree = |tree: &str| {
        lower_path.starts_with(&format!("{}/", tree)) || lower_path.contains(&format!("/{}/", tree))
    };

    if in_tree("skills") {
        "skill".to_string()
    } else if in_tree("releases") || in_tree("changelog") {
        "release".to_string()
    } else if in_tree("reference") || in_tree("api") {
        "reference".to_string()
    } else {
        "guide".to_string()
    }
}
