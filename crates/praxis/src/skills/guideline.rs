//! Lookup into the embedded conventions corpus.

use std::collections::HashMap;

use include_dir::{include_dir, Dir};

use super::require;

static GUIDELINES: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/docs/guidelines");

pub fn lookup(args: &HashMap<String, String>) -> String {
    let topic = match require(args, "topic") {
        Ok(value) => value,
        Err(error) => return error,
    };

    let slug = slugify(topic);
    if let Some(body) = find(&slug) {
        return body.to_string();
    }

    format!(
        "Error: no guideline found for `{topic}`. Available topics: {}",
        topics().join(", ")
    )
}

/// Exact stem match first, then a substring match in either direction.
fn find(slug: &str) -> Option<&'static str> {
    if let Some(file) = GUIDELINES.get_file(format!("{slug}.md")) {
        return file.contents_utf8();
    }
    GUIDELINES
        .files()
        .find(|file| {
            let stem = file
                .path()
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default();
            stem.contains(slug) || slug.contains(stem)
        })
        .and_then(|file| file.contents_utf8())
}

fn topics() -> Vec<String> {
    let mut topics: Vec<String> = GUIDELINES
        .files()
        .filter_map(|file| file.path().file_stem())
        .filter_map(|stem| stem.to_str())
        .map(String::from)
        .collect();
    topics.sort();
    topics
}

fn slugify(topic: &str) -> String {
    topic
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(topic: &str) -> HashMap<String, String> {
        HashMap::from([("topic".to_string(), topic.to_string())])
    }

    #[test]
    fn test_exact_topic() {
        let body = lookup(&args("kafka"));
        assert!(body.starts_with("# Kafka"), "{body}");
    }

    #[test]
    fn test_topic_is_case_and_whitespace_insensitive() {
        let body = lookup(&args("  Flyway Migrations "));
        assert!(body.contains("Flyway"), "{body}");
    }

    #[test]
    fn test_partial_topic_matches() {
        let body = lookup(&args("observ"));
        assert!(body.contains("Observability"), "{body}");
    }

    #[test]
    fn test_unknown_topic_lists_available() {
        let body = lookup(&args("quantum-databases"));
        assert!(body.starts_with("Error: no guideline found"));
        assert!(body.contains("kafka"));
        assert!(body.contains("persistence"));
    }
}
