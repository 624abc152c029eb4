//! Folds a stream of events back into a complete message, for callers that
//! want batch semantics over a streaming transport.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::types::{ContentBlock, Event, FinishReason, Message, Role, TextBlock, ToolCall};

use super::sse::EventStream;

/// Aggregation result.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// Assistant message rebuilt from the deltas: an optional leading text
    /// block followed by tool calls in ascending index order.
    pub message: Message,
    /// Reason from the last `done` event; `None` when none arrived.
    pub finish_reason: Option<FinishReason>,
    /// Concatenated reasoning/thinking content, kept separate from the
    /// message body.
    pub reasoning: String,
}

#[derive(Default)]
struct ToolBuffer {
    id: String,
    name: String,
    arguments: String,
}

/// Incremental aggregator over [`Event`]s.
///
/// Text deltas concatenate into one text block. Tool-call deltas are bucketed
/// by index; within a bucket the last non-empty `id`/`name` wins and argument
/// fragments concatenate, decoded once at the end. Buckets that never
/// received an id are dropped; arguments that fail to decode produce a tool
/// call with a `null` input rather than losing the call.
#[derive(Default)]
pub struct StreamCollector {
    text: String,
    reasoning: String,
    tools: BTreeMap<usize, ToolBuffer>,
    finish_reason: Option<FinishReason>,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one event. Unknown event kinds are ignored.
    pub fn feed(&mut self, event: &Event) {
        match event {
            Event::Text { text_delta } => self.text.push_str(text_delta),
            Event::Reasoning { reasoning } | Event::Thinking { reasoning } => {
                self.reasoning.push_str(&reasoning.thought_delta);
            }
            Event::ToolCall { tool_call } => {
                let buffer = self.tools.entry(tool_call.index).or_default();
                if let Some(id) = tool_call.id.as_deref().filter(|id| !id.is_empty()) {
                    buffer.id = id.to_string();
                }
                if let Some(name) = tool_call.name.as_deref().filter(|name| !name.is_empty()) {
                    buffer.name = name.to_string();
                }
                if let Some(delta) = &tool_call.arguments_delta {
                    buffer.arguments.push_str(delta);
                }
            }
            Event::Done { finish_reason } => self.finish_reason = Some(finish_reason.clone()),
            Event::Error { .. } => {}
        }
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Reasoning content accumulated so far.
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// Builds the message from the current state without consuming the
    /// collector.
    pub fn message(&self) -> Message {
        let mut blocks = Vec::new();
        if !self.text.is_empty() {
            blocks.push(ContentBlock::Text(TextBlock {
                text: self.text.clone(),
            }));
        }
        for buffer in self.tools.values() {
            if buffer.id.is_empty() {
                continue;
            }
            let input = serde_json::from_str(&buffer.arguments).unwrap_or(Value::Null);
            blocks.push(ContentBlock::ToolCall(ToolCall {
                id: buffer.id.clone(),
                name: buffer.name.clone(),
                input,
            }));
        }
        Message::with_blocks(Role::Assistant, blocks)
    }

    pub fn finish(self) -> StreamOutcome {
        let message = self.message();
        StreamOutcome {
            message,
            finish_reason: self.finish_reason,
            reasoning: self.reasoning,
        }
    }

    /// Drains a stream to completion and aggregates it.
    pub async fn collect(stream: &mut EventStream) -> StreamOutcome {
        let mut collector = StreamCollector::new();
        while let Some(event) = stream.next().await {
            collector.feed(&event);
        }
        collector.finish()
    }
}

/// Convenience wrapper over [`StreamCollector::collect`].
pub async fn collect_stream(stream: &mut EventStream) -> StreamOutcome {
    StreamCollector::collect(stream).await
}
