//! The agentic reply loop.
//!
//! Each turn sends the conversation plus the tool catalog to the completion
//! API, streams text back to the caller, and executes whatever tool calls the
//! model requested before going around again. The loop is bounded: a model
//! that keeps requesting tools gets cut off after `MAX_TURNS` completions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::completion::CompletionClient;
use crate::errors::AgentResult;
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::skills::SkillRegistry;
use crate::stream::collect_stream;

/// Upper bound on completion calls for one reply.
pub const MAX_TURNS: usize = 5;

/// Agent ties the completion API to the skills it can execute
pub struct Agent {
    completion: Arc<CompletionClient>,
    skills: Arc<SkillRegistry>,
}

impl Agent {
    pub fn new(completion: Arc<CompletionClient>, skills: Arc<SkillRegistry>) -> Self {
        Self { completion, skills }
    }

    /// Run the reply loop to completion, writing plain-text deltas to `sink`
    /// as they arrive.
    ///
    /// Returns once the model produces a final answer, or silently once the
    /// turn bound is reached. Completion API failures abort the reply; tool
    /// failures never do.
    pub async fn reply(
        &self,
        token: &str,
        mut messages: Vec<Message>,
        sink: mpsc::Sender<String>,
    ) -> AgentResult<()> {
        let tools = self.skills.tools();

        for turn in 0..MAX_TURNS {
            let response = self
                .completion
                .stream_chat(token, &messages, &tools)
                .await?;

            let tool_calls = collect_stream(response.bytes_stream(), &sink).await?;

            if tool_calls.is_empty() {
                // No more tool calls, the reply is complete
                return Ok(());
            }

            tracing::debug!(turn, count = tool_calls.len(), "executing tool calls");

            messages.push(Message::assistant().with_tool_calls(tool_calls.clone()));
            for call in tool_calls {
                let result = self.run_tool(&call).await;
                messages.push(Message::tool(call.id, result));
            }
        }

        tracing::warn!("reply stopped at the turn bound without a final answer");
        Ok(())
    }

    /// Execute one tool call, always producing a textual result. Argument
    /// parse failures and unknown tools come back as error strings so a bad
    /// call never aborts the reply.
    async fn run_tool(&self, call: &ToolCall) -> String {
        match serde_json::from_str::<HashMap<String, String>>(&call.function.arguments) {
            Ok(args) => self.skills.execute(&call.function.name, &args).await,
            Err(error) => format!(
                "Error: invalid arguments for {}: {error}",
                call.function.name
            ),
        }
    }
}
