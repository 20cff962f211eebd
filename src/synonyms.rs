//! Static-dictionary query expansion.
//!
//! A trivial rewrite applied before both search primitives: tokens with a
//! known synonym get the synonym appended to the query. The original query
//! text is always preserved. Pure function, no failure mode.

/// Fixed synonym table for common developer-documentation vocabulary.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("auth", &["authentication"]),
    ("authentication", &["auth", "login"]),
    ("config", &["configuration", "settings"]),
    ("configuration", &["config"]),
    ("db", &["database"]),
    ("database", &["db"]),
    ("docs", &["documentation"]),
    ("documentation", &["docs"]),
    ("deploy", &["deployment"]),
    ("deployment", &["deploy", "release"]),
    ("env", &["environment"]),
    ("init", &["initialize", "setup"]),
    ("k8s", &["kubernetes"]),
    ("kubernetes", &["k8s"]),
    ("perf", &["performance"]),
    ("repo", &["repository"]),
    ("test", &["testing"]),
];

/// Expand a query by appending synonyms of its recognized tokens. The
/// returned string always begins with the original query.
pub fn expand(query: &str) -> String {
    let mut expanded = query.to_string();
    let mut seen: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
        .collect();

    let tokens = seen.clone();
    for token in &tokens {
        if let Some((_, additions)) = SYNONYMS.iter().find(|(word, _)| word == token) {
            for addition in *additions {
                if !seen.iter().any(|s| s == addition) {
                    expanded.push(' ');
                    expanded.push_str(addition);
                    seen.push((*addition).to_string());
                }
            }
        }
    }

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_includes_original() {
        let out = expand("db migration errors");
        assert!(out.starts_with("db migration errors"));
        assert!(out.contains("database"));
    }

    #[test]
    fn test_no_synonyms_is_identity() {
        assert_eq!(expand("quux frobnicate"), "quux frobnicate");
    }

    #[test]
    fn test_no_duplicate_additions() {
        // "db database" already contains the expansion of "db".
        let out = expand("db database");
        assert_eq!(out, "db database");
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let out = expand("K8s setup");
        assert!(out.contains("kubernetes"));
    }

    #[test]
    fn test_empty_query() {
        assert_eq!(expand(""), "");
    }

    #[test]
    fn test_pure() {
        assert_eq!(expand("deploy notes"), expand("deploy notes"));
    }
}
