//! Heuristic review of a JPA entity class.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::require;

lazy_static! {
    static ref ENTITY: Regex = Regex::new(r"@Entity\b").unwrap();
    static ref ID: Regex = Regex::new(r"@Id\b").unwrap();
    static ref PUBLIC_FIELD: Regex =
        Regex::new(r"(?m)^\s*public\s+[\w.<>\[\], ]+\s+\w+\s*(=[^;]+)?;").unwrap();
    static ref TABLE_NAME: Regex =
        Regex::new(r#"@Table\s*\(\s*name\s*=\s*"([^"]+)""#).unwrap();
    static ref SNAKE_CASE: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    static ref TO_ONE: Regex =
        Regex::new(r"@(ManyToOne|OneToOne)(\s*\(([^)]*)\))?").unwrap();
    static ref LOMBOK_DATA: Regex = Regex::new(r"@Data\b").unwrap();
}

pub fn check_entity(args: &HashMap<String, String>) -> String {
    let source = match require(args, "entity_source") {
        Ok(value) => value,
        Err(error) => return error,
    };

    let mut findings = Vec::new();

    if ENTITY.is_match(source) {
        findings.push("✅ Class is annotated with `@Entity`.".to_string());
    } else {
        findings.push("⚠️ No `@Entity` annotation found; is this the right class?".to_string());
    }

    if ID.is_match(source) {
        findings.push("✅ An `@Id` field is present.".to_string());
    } else {
        findings.push("⚠️ No `@Id` field found; every entity needs a primary key.".to_string());
    }

    if PUBLIC_FIELD.is_match(source) {
        findings.push(
            "⚠️ Public fields found; entity state should be private with accessors.".to_string(),
        );
    } else {
        findings.push("✅ No public fields.".to_string());
    }

    match TABLE_NAME.captures(source) {
        Some(captures) if SNAKE_CASE.is_match(&captures[1]) => {
            findings.push(format!("✅ Table name `{}` is snake_case.", &captures[1]));
        }
        Some(captures) => findings.push(format!(
            "⚠️ Table name `{}` should be snake_case.",
            &captures[1]
        )),
        None => findings.push(
            "⚠️ No explicit `@Table(name = ...)`; rely on explicit names, not dialect defaults."
                .to_string(),
        ),
    }

    let eager_to_one = TO_ONE
        .captures_iter(source)
        .filter(|captures| {
            !captures
                .get(3)
                .map(|params| params.as_str().contains("FetchType.LAZY"))
                .unwrap_or(false)
        })
        .count();
    if eager_to_one > 0 {
        findings.push(format!(
            "⚠️ {eager_to_one} `@ManyToOne`/`@OneToOne` association(s) without \
             `fetch = FetchType.LAZY`; to-one associations are eager by default."
        ));
    } else {
        findings.push("✅ To-one associations are lazy (or absent).".to_string());
    }

    if LOMBOK_DATA.is_match(source) {
        findings.push(
            "⚠️ Lombok `@Data` on an entity generates equals/hashCode over all fields; \
             use `@Getter`/`@Setter` and identifier-based equality instead."
                .to_string(),
        );
    }

    format!("## JPA entity review\n\n{}", findings.join("\n"))
}
