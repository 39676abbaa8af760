//! Client for the platform's chat completion API.

use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub host: String,
    pub model: String,
}

pub struct CompletionClient {
    client: Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(config: CompletionConfig) -> AgentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    /// POST the conversation and tool catalog, requesting a streamed
    /// response. The bearer token is the one the platform supplied with the
    /// inbound request, passed through unmodified.
    ///
    /// A non-success status is fatal for the whole request and carries the
    /// status and body text back to the caller.
    pub async fn stream_chat(
        &self,
        token: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> AgentResult<reqwest::Response> {
        let url = format!("{}/chat/completions", self.config.host.trim_end_matches('/'));

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": true,
        });
        if !tools.is_empty() {
            let spec = tools_to_spec(tools);
            let object = payload.as_object_mut().expect("payload is an object");
            object.insert("tools".to_string(), json!(spec));
            object.insert("tool_choice".to_string(), json!("auto"));
        }

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Completion {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

/// Convert the internal Tool format to the completion API's tool specification
fn tools_to_spec(tools: &[Tool]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                }
            })
        })
        .collect()
}
