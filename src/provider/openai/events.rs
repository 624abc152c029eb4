//! SSE frame handling for the chat-completions dialect.

use serde_json::Value;

use crate::core::sse::EventHandler;
use crate::types::{Event, FinishReason, ToolCallDelta};

use super::types::ChatStreamChunk;

/// Frame interpreter for OpenAI-style streams.
///
/// The dialect sends bare `data:` lines (no `event:` framing). A frame with a
/// non-empty `finish_reason` produces `done` but never stops the parser: some
/// compatible backends append a usage chunk after it, so only the `[DONE]`
/// sentinel terminates the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiEventHandler;

impl EventHandler for OpenAiEventHandler {
    fn handle_event(&self, _event_type: &str, data: Value) -> (Vec<Event>, bool) {
        let mut events = Vec::new();

        let Ok(chunk) = serde_json::from_value::<ChatStreamChunk>(data) else {
            return (events, false);
        };
        let Some(choice) = chunk.choices.into_iter().next() else {
            return (events, false);
        };

        if let Some(reason) = choice
            .finish_reason
            .filter(|reason| !reason.is_empty())
        {
            events.push(Event::done(FinishReason::from(reason.as_str())));
            return (events, false);
        }

        let Some(delta) = choice.delta else {
            return (events, false);
        };

        if let Some(content) = delta.content.filter(|content| !content.is_empty()) {
            events.push(Event::text(content));
        }

        if let Some(reasoning) = delta
            .reasoning_content
            .filter(|reasoning| !reasoning.is_empty())
        {
            events.push(Event::reasoning(reasoning));
        }

        for call in delta.tool_calls {
            let (name, arguments_delta) = match call.function {
                Some(function) => (function.name, function.arguments),
                None => (None, None),
            };
            events.push(Event::ToolCall {
                tool_call: ToolCallDelta {
                    index: call.index.unwrap_or(0),
                    id: call.id,
                    name,
                    arguments_delta,
                },
            });
        }

        (events, false)
    }

    fn should_stop_on_data(&self, data: &str) -> bool {
        data == "[DONE]"
    }
}
