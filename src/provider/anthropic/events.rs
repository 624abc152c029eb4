//! SSE frame handling for the Messages dialect.

use serde_json::Value;

use crate::core::sse::EventHandler;
use crate::types::{Event, FinishReason, ToolCallDelta};

use super::adapter::map_stop_reason;
use super::types::{
    ContentBlockDelta, ContentBlockStart, DeltaPayload, MessageDeltaFrame, StartBlock,
};

/// Frame interpreter for Anthropic streams.
///
/// The dialect frames every payload with an explicit `event:` type. There is
/// no sentinel data line; the stream ends at EOF, with `message_stop`
/// guaranteeing a final `done`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicEventHandler;

impl EventHandler for AnthropicEventHandler {
    fn handle_event(&self, event_type: &str, data: Value) -> (Vec<Event>, bool) {
        let mut events = Vec::new();

        match event_type {
            "content_block_start" => {
                if let Ok(frame) = serde_json::from_value::<ContentBlockStart>(data) {
                    if let Some(StartBlock::ToolUse { id, name }) = frame.content_block {
                        events.push(Event::ToolCall {
                            tool_call: ToolCallDelta {
                                index: frame.index,
                                id: Some(id),
                                name: Some(name),
                                arguments_delta: None,
                            },
                        });
                    }
                }
            }

            "content_block_delta" => {
                if let Ok(frame) = serde_json::from_value::<ContentBlockDelta>(data) {
                    match frame.delta {
                        Some(DeltaPayload::TextDelta { text }) if !text.is_empty() => {
                            events.push(Event::text(text));
                        }
                        Some(DeltaPayload::InputJsonDelta { partial_json })
                            if !partial_json.is_empty() =>
                        {
                            events.push(Event::ToolCall {
                                tool_call: ToolCallDelta {
                                    index: frame.index,
                                    id: None,
                                    name: None,
                                    arguments_delta: Some(partial_json),
                                },
                            });
                        }
                        Some(DeltaPayload::ThinkingDelta { thinking })
                            if !thinking.is_empty() =>
                        {
                            events.push(Event::thinking(thinking));
                        }
                        _ => {}
                    }
                }
            }

            "message_delta" => {
                if let Ok(frame) = serde_json::from_value::<MessageDeltaFrame>(data) {
                    if let Some(reason) = frame
                        .delta
                        .and_then(|delta| delta.stop_reason)
                        .filter(|reason| !reason.is_empty())
                    {
                        events.push(Event::done(map_stop_reason(&reason)));
                    }
                }
            }

            "message_stop" => {
                events.push(Event::done(FinishReason::Stop));
            }

            // message_start, content_block_stop, ping and unknown event types
            // produce nothing.
            _ => {}
        }

        (events, false)
    }
}
