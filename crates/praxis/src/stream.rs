//! Collector for the completion API's chunked event stream.
//!
//! The transport makes no guarantee about where read boundaries fall, so
//! incoming bytes are buffered and split on newlines, keeping any trailing
//! partial line for the next read. Records the collector does not recognize
//! are skipped so new upstream event shapes never break an in-flight reply.

use std::collections::BTreeMap;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::ToolCall;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Default, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallFragment>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// One tool call being reassembled from fragments at a single index.
#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn push(&mut self, fragment: ToolCallFragment) {
        if let Some(id) = fragment.id {
            self.id.push_str(&id);
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name {
                self.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }

    fn finish(self) -> ToolCall {
        ToolCall::new(self.id, self.name, self.arguments)
    }
}

/// Consume a completion response stream until it ends.
///
/// Plain text deltas are forwarded to `sink` in arrival order as they are
/// decoded; tool call fragments are accumulated per index. Returns the
/// reassembled tool calls in ascending index order. A closed sink means the
/// client went away, which aborts collection.
pub async fn collect_stream<S, E>(
    mut body: S,
    sink: &mpsc::Sender<String>,
) -> AgentResult<Vec<ToolCall>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<AgentError>,
{
    let mut buffer: Vec<u8> = Vec::new();
    let mut partials: BTreeMap<u32, PartialToolCall> = BTreeMap::new();
    let mut done = false;

    'read: while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(Into::into)?;
        buffer.extend_from_slice(&chunk);

        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            if handle_line(&line, sink, &mut partials).await? {
                done = true;
                break 'read;
            }
        }
    }

    // The end marker normally terminates the stream, but flush a trailing
    // record that arrived without its final newline.
    if !done && !buffer.is_empty() {
        handle_line(&buffer, sink, &mut partials).await?;
    }

    Ok(partials.into_values().map(PartialToolCall::finish).collect())
}

/// Process one record line. Returns true when the end marker was seen.
async fn handle_line(
    raw: &[u8],
    sink: &mpsc::Sender<String>,
    partials: &mut BTreeMap<u32, PartialToolCall>,
) -> AgentResult<bool> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);

    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(false);
    };
    let payload = payload.trim_start();
    if payload.is_empty() {
        return Ok(false);
    }
    if payload == DONE_MARKER {
        return Ok(true);
    }

    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(error) => {
            tracing::debug!(%error, "skipping unparsable stream record");
            return Ok(false);
        }
    };

    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            if sink.send(content).await.is_err() {
                return Err(AgentError::Disconnected);
            }
        }
        for fragment in choice.delta.tool_calls {
            partials.entry(fragment.index).or_default().push(fragment);
        }
        if let Some(reason) = choice.finish_reason {
            tracing::debug!(reason, "completion stream finished");
        }
    }

    Ok(false)
}
