//! Heuristic review of a Kafka topic configuration.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::require;

lazy_static! {
    static ref TOPIC_NAME: Regex =
        Regex::new(r"^[a-z][a-z0-9]*([.-][a-z0-9]+)*$").unwrap();
    static ref PARTITIONS: Regex =
        Regex::new(r"(?i)partitions\s*[:=]\s*(\d+)").unwrap();
    static ref REPLICATION: Regex =
        Regex::new(r"(?i)replication[._-]factor\s*[:=]\s*(\d+)").unwrap();
    static ref CLEANUP_POLICY: Regex =
        Regex::new(r"cleanup\.policy\s*[:=]\s*([\w,]+)").unwrap();
    static ref MIN_INSYNC: Regex =
        Regex::new(r"min\.insync\.replicas\s*[:=]\s*(\d+)").unwrap();
    static ref DEAD_LETTER: Regex =
        Regex::new(r"(?i)(\.dlt\b|dead[._-]?letter)").unwrap();
}

pub fn check_topic(args: &HashMap<String, String>) -> String {
    let topic_name = match require(args, "topic_name") {
        Ok(value) => value,
        Err(error) => return error,
    };
    let config_source = match require(args, "config_source") {
        Ok(value) => value,
        Err(error) => return error,
    };

    let mut findings = Vec::new();

    if TOPIC_NAME.is_match(topic_name) {
        findings.push(format!("✅ Topic name `{topic_name}` follows the lowercase kebab/dot convention."));
    } else {
        findings.push(format!(
            "⚠️ Topic name `{topic_name}` does not match the convention \
             (lowercase words separated by `-` or `.`, e.g. `order-events`)."
        ));
    }

    match PARTITIONS.captures(config_source).and_then(|c| c[1].parse::<u32>().ok()) {
        Some(0) => findings.push("⚠️ `partitions` is 0; topics need at least one partition.".to_string()),
        Some(n) => findings.push(format!("✅ Partition count declared ({n}).")),
        None => findings.push("⚠️ No explicit `partitions` setting found; partition count should be declared, not defaulted.".to_string()),
    }

    match REPLICATION.captures(config_source).and_then(|c| c[1].parse::<u32>().ok()) {
        Some(n) if n >= 3 => findings.push(format!("✅ Replication factor is {n}.")),
        Some(n) => findings.push(format!(
            "⚠️ Replication factor is {n}; production topics use at least 3."
        )),
        None => findings.push("⚠️ No `replication-factor` setting found.".to_string()),
    }

    if let Some(captures) = CLEANUP_POLICY.captures(config_source) {
        findings.push(format!("✅ `cleanup.policy` is set ({}).", &captures[1]));
    } else {
        findings.push(
            "⚠️ No `cleanup.policy` set; choose `delete` or `compact` explicitly.".to_string(),
        );
    }

    match MIN_INSYNC.captures(config_source).and_then(|c| c[1].parse::<u32>().ok()) {
        Some(n) if n >= 2 => findings.push(format!("✅ `min.insync.replicas` is {n}.")),
        Some(n) => findings.push(format!(
            "⚠️ `min.insync.replicas` is {n}; use at least 2 with acks=all producers."
        )),
        None => findings.push("⚠️ No `min.insync.replicas` setting found.".to_string()),
    }

    if DEAD_LETTER.is_match(config_source) {
        findings.push("✅ A dead-letter topic is configured.".to_string());
    } else {
        findings.push(
            "⚠️ No dead-letter topic found; consumers should route poison messages to `<topic>.DLT`."
                .to_string(),
        );
    }

    format!(
        "## Kafka topic review: `{topic_name}`\n\n{}",
        findings.join("\n")
    )
}
