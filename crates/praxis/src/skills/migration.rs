//! Flyway migration filename arithmetic.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::require;

lazy_static! {
    static ref VERSIONED: Regex = Regex::new(r"^V(\d+)__.+\.sql$").unwrap();
}

pub fn next_filename(args: &HashMap<String, String>) -> String {
    let existing = match require(args, "existing_filenames") {
        Ok(value) => value,
        Err(error) => return error,
    };
    let description = match require(args, "description") {
        Ok(value) => value,
        Err(error) => return error,
    };

    let mut max_version: u64 = 0;
    let mut parsed = 0usize;
    let mut skipped = Vec::new();
    for line in existing.lines() {
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        match VERSIONED
            .captures(name)
            .and_then(|captures| captures[1].parse::<u64>().ok())
        {
            Some(version) => {
                parsed += 1;
                max_version = max_version.max(version);
            }
            None => skipped.push(name.to_string()),
        }
    }

    let slug = slugify(description);
    if slug.is_empty() {
        return "Error: description contains no usable characters".to_string();
    }

    let next = max_version + 1;
    let mut result = format!(
        "Next migration filename: `V{next}__{slug}.sql` ({parsed} versioned migration(s) found, highest V{max_version})."
    );
    if !skipped.is_empty() {
        result.push_str(&format!(
            "\nIgnored {} filename(s) that do not match `V<n>__<description>.sql`: {}",
            skipped.len(),
            skipped.join(", ")
        ));
    }
    result
}

/// Lowercase the description and collapse every non-alphanumeric run to a
/// single underscore.
fn slugify(description: &str) -> String {
    let mut slug = String::new();
    for ch in description.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}
