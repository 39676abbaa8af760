//! The fixed catalog of skills the model can invoke.
//!
//! Skills are deliberately shallow text utilities: regex heuristics over
//! pasted source, filename arithmetic and guideline lookup. Execution never
//! fails from the caller's point of view; every problem becomes a textual
//! result the model can read and react to.

use std::collections::HashMap;

use serde_json::json;

use crate::models::tool::Tool;

mod guideline;
mod jpa;
mod kafka;
mod migration;

pub struct SkillRegistry {
    tools: Vec<Tool>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        let check_kafka_topic = Tool::new(
            "check_kafka_topic",
            "Review a Kafka topic configuration against the team's conventions: \
             naming, partition count, replication, cleanup policy and dead-letter \
             topic. Pass the topic name and the raw configuration source.",
            json!({
                "type": "object",
                "required": ["topic_name", "config_source"],
                "properties": {
                    "topic_name": {
                        "type": "string",
                        "description": "Name of the Kafka topic under review."
                    },
                    "config_source": {
                        "type": "string",
                        "description": "Raw topic configuration (properties, YAML or code)."
                    }
                }
            }),
        );

        let check_jpa_entity = Tool::new(
            "check_jpa_entity",
            "Review a JPA entity class against the team's persistence conventions: \
             annotations, field visibility, association fetching and table naming.",
            json!({
                "type": "object",
                "required": ["entity_source"],
                "properties": {
                    "entity_source": {
                        "type": "string",
                        "description": "Full Java source of the entity class."
                    }
                }
            }),
        );

        let next_migration_filename = Tool::new(
            "next_migration_filename",
            "Compute the next Flyway migration filename from the list of existing \
             migration files and a short description of the change.",
            json!({
                "type": "object",
                "required": ["existing_filenames", "description"],
                "properties": {
                    "existing_filenames": {
                        "type": "string",
                        "description": "Existing migration filenames, one per line."
                    },
                    "description": {
                        "type": "string",
                        "description": "Short description of the change, e.g. 'add customer index'."
                    }
                }
            }),
        );

        let lookup_guideline = Tool::new(
            "lookup_guideline",
            "Fetch the team's convention document for a topic, e.g. 'kafka', \
             'persistence' or 'security'. Returns the full markdown document.",
            json!({
                "type": "object",
                "required": ["topic"],
                "properties": {
                    "topic": {
                        "type": "string",
                        "description": "Topic of the guideline to look up."
                    }
                }
            }),
        );

        Self {
            tools: vec![
                check_kafka_topic,
                check_jpa_entity,
                next_migration_filename,
                lookup_guideline,
            ],
        }
    }

    /// The machine-readable tool catalog sent to the completion API
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.clone()
    }

    /// Dispatch a tool call by name. Always returns a string: unknown tools
    /// and skill-level problems surface as error text, never as a failure.
    pub async fn execute(&self, name: &str, args: &HashMap<String, String>) -> String {
        match name {
            "check_kafka_topic" => kafka::check_topic(args),
            "check_jpa_entity" => jpa::check_entity(args),
            "next_migration_filename" => migration::next_filename(args),
            "lookup_guideline" => guideline::lookup(args),
            _ => format!("Error: unknown tool: {name}"),
        }
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch a required argument or produce the standard error text.
fn require<'a>(args: &'a HashMap<String, String>, name: &str) -> Result<&'a str, String> {
    args.get(name)
        .map(String::as_str)
        .ok_or_else(|| format!("Error: missing required argument: {name}"))
}
