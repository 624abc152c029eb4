//! SSE frame handling for the GenerateContent dialect.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use crate::core::sse::EventHandler;
use crate::types::{Event, ToolCallDelta};

use super::adapter::map_finish_reason;
use super::types::GenerateContentResponse;

/// Frame interpreter for Gemini streams.
///
/// Frames are whole `GenerateContentResponse` objects on `data:` lines.
/// There is no sentinel: a non-empty `finishReason` ends the stream, after
/// the same frame's parts have been translated.
///
/// The handler is cloned per streaming request and `Clone` resets the
/// synthetic-id counter, so ids are scoped to one stream.
#[derive(Debug, Default)]
pub struct GeminiEventHandler {
    call_ids: AtomicU64,
}

impl GeminiEventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_call_id(&self) -> String {
        let n = self.call_ids.fetch_add(1, Ordering::Relaxed) + 1;
        format!("call_{n}")
    }
}

impl Clone for GeminiEventHandler {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl EventHandler for GeminiEventHandler {
    fn handle_event(&self, _event_type: &str, data: Value) -> (Vec<Event>, bool) {
        let mut events = Vec::new();

        let Ok(chunk) = serde_json::from_value::<GenerateContentResponse>(data) else {
            return (events, false);
        };
        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return (events, false);
        };

        if let Some(content) = candidate.content {
            for (index, part) in content.parts.into_iter().enumerate() {
                if let Some(text) = part.text.filter(|text| !text.is_empty()) {
                    if part.thought {
                        events.push(Event::thinking(text));
                    } else {
                        events.push(Event::text(text));
                    }
                }
                if let Some(call) = part.function_call {
                    // The full argument object arrives in one frame; the
                    // aggregator treats it as a single-shot delta.
                    let arguments_delta = if call.args.is_null() {
                        None
                    } else {
                        Some(call.args.to_string())
                    };
                    events.push(Event::ToolCall {
                        tool_call: ToolCallDelta {
                            index,
                            id: Some(self.next_call_id()),
                            name: Some(call.name),
                            arguments_delta,
                        },
                    });
                }
            }
        }

        if let Some(reason) = candidate
            .finish_reason
            .filter(|reason| !reason.is_empty())
        {
            events.push(Event::done(map_finish_reason(&reason)));
            return (events, true);
        }

        (events, false)
    }
}
