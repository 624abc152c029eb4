//! Protocol adapter for the Messages dialect.

use serde_json::{json, Map, Value};

use crate::core::protocol::{ProtocolAdapter, SystemMessageHandling};
use crate::types::{
    ContentBlock, FinishReason, Message, Role, TextBlock, ThinkingBlock, TokenUsage, ToolCall,
};

use super::types::{MessagesResponse, WireBlock};

/// Translator for the Anthropic wire format.
///
/// Dialect rules: `content` is always an array of typed blocks, tool-call
/// input stays a raw object, tool results remain inline in the same message,
/// and a message whose content array would be empty is dropped entirely (the
/// API rejects empty content).
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicAdapter;

impl ProtocolAdapter for AnthropicAdapter {
    type Response = MessagesResponse;

    fn convert_to_api(&self, messages: &[Message]) -> Vec<Value> {
        let mut result = Vec::with_capacity(messages.len());

        for msg in messages {
            if msg.role == Role::System {
                continue;
            }

            let mut content = Vec::new();
            if !msg.content_blocks.is_empty() {
                for block in &msg.content_blocks {
                    match block {
                        ContentBlock::Text(text) => {
                            content.push(json!({"type": "text", "text": text.text}));
                        }
                        ContentBlock::ToolCall(call) => {
                            content.push(json!({
                                "type": "tool_use",
                                "id": call.id,
                                "name": call.name,
                                "input": call.input,
                            }));
                        }
                        ContentBlock::ToolResult(result_block) => {
                            let mut wire = Map::new();
                            wire.insert("type".to_string(), json!("tool_result"));
                            wire.insert(
                                "tool_use_id".to_string(),
                                json!(result_block.tool_use_id),
                            );
                            wire.insert("content".to_string(), json!(result_block.content));
                            if result_block.is_error {
                                wire.insert("is_error".to_string(), json!(true));
                            }
                            content.push(Value::Object(wire));
                        }
                        // Replayed thinking requires the vendor's signature
                        // blocks; omitted on the way out.
                        ContentBlock::Thinking(_) => {}
                    }
                }
            } else if !msg.content.is_empty() {
                content.push(json!({"type": "text", "text": msg.content}));
            }

            if !content.is_empty() {
                result.push(json!({
                    "role": msg.role.as_str(),
                    "content": content,
                }));
            }
        }

        result
    }

    fn convert_from_api(&self, resp: &MessagesResponse) -> (Message, Option<FinishReason>) {
        let mut message = Message::assistant("");
        let mut blocks = Vec::new();
        let mut text_content = String::new();

        for block in &resp.content {
            match block {
                WireBlock::Text { text } => {
                    text_content = text.clone();
                    blocks.push(ContentBlock::Text(TextBlock { text: text.clone() }));
                }
                WireBlock::ToolUse { id, name, input } => {
                    blocks.push(ContentBlock::ToolCall(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    }));
                }
                WireBlock::Thinking { thinking } => {
                    blocks.push(ContentBlock::Thinking(ThinkingBlock {
                        thinking: thinking.clone(),
                    }));
                }
                WireBlock::Unknown => {}
            }
        }

        if !blocks.is_empty() {
            let single_text = blocks.len() == 1 && !text_content.is_empty();
            message.content_blocks = blocks;
            if single_text {
                message.content = text_content;
            }
        }

        let finish_reason = resp
            .stop_reason
            .as_deref()
            .filter(|reason| !reason.is_empty())
            .map(map_stop_reason);

        (message, finish_reason)
    }

    fn convert_usage(&self, resp: &MessagesResponse) -> Option<TokenUsage> {
        let usage = resp.usage.as_ref()?;
        Some(TokenUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            // The vendor reports no total; derive it.
            total_tokens: usage.input_tokens + usage.output_tokens,
            reasoning_tokens: 0,
            cached_tokens: usage.cache_read_input_tokens,
        })
    }

    fn response_model(&self, resp: &MessagesResponse) -> Option<String> {
        resp.model.clone()
    }

    fn system_message_handling(&self) -> SystemMessageHandling {
        SystemMessageHandling::Separate
    }
}

/// `stop_reason` to the normalized vocabulary; unknown reasons pass through.
pub(crate) fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        other => FinishReason::Other(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResultBlock;

    fn adapter() -> AnthropicAdapter {
        AnthropicAdapter
    }

    #[test]
    fn content_is_always_an_array_even_for_plain_text() {
        let wire = adapter().convert_to_api(&[Message::user("Hello, Claude")]);
        assert_eq!(wire.len(), 1);
        let content = wire[0]["content"].as_array().expect("array content");
        assert_eq!(content.len(), 1);
        assert_eq!(content[0], json!({"type": "text", "text": "Hello, Claude"}));
    }

    #[test]
    fn tool_input_stays_an_object() {
        let msg = Message::with_blocks(
            Role::Assistant,
            vec![ContentBlock::ToolCall(ToolCall {
                id: "toolu_1".to_string(),
                name: "get_weather".to_string(),
                input: json!({"city": "Paris"}),
            })],
        );
        let wire = adapter().convert_to_api(&[msg]);
        let input = &wire[0]["content"][0]["input"];
        assert!(input.is_object(), "no JSON-string indirection here");
        assert_eq!(input["city"], json!("Paris"));
    }

    #[test]
    fn tool_results_stay_inline_in_one_message() {
        let msg = Message::with_blocks(
            Role::User,
            vec![
                ContentBlock::ToolResult(ToolResultBlock {
                    tool_use_id: "t1".to_string(),
                    content: "ok".to_string(),
                    is_error: false,
                }),
                ContentBlock::ToolResult(ToolResultBlock {
                    tool_use_id: "t2".to_string(),
                    content: "done".to_string(),
                    is_error: true,
                }),
            ],
        );
        let wire = adapter().convert_to_api(&[msg]);
        assert_eq!(wire.len(), 1, "results are not expanded");
        let content = wire[0]["content"].as_array().expect("array");
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["tool_use_id"], json!("t1"));
        assert!(content[0].get("is_error").is_none());
        assert_eq!(content[1]["is_error"], json!(true));
    }

    #[test]
    fn empty_content_drops_the_whole_message() {
        let empty = Message::with_blocks(Role::Assistant, Vec::new());
        let wire = adapter().convert_to_api(&[empty, Message::user("hi")]);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0]["role"], json!("user"));
    }

    #[test]
    fn response_blocks_map_to_neutral_blocks() {
        let resp: MessagesResponse = serde_json::from_value(json!({
            "model": "claude-3-5-haiku-latest",
            "content": [
                {"type": "text", "text": "Checking the weather."},
                {"type": "tool_use", "id": "toolu_1", "name": "get_weather",
                 "input": {"city": "Paris"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        }))
        .expect("decode");

        let (message, finish) = adapter().convert_from_api(&resp);
        assert_eq!(finish, Some(FinishReason::ToolCalls));
        assert_eq!(message.content_blocks.len(), 2);
        let calls = message.tool_calls();
        assert_eq!(calls[0].input, json!({"city": "Paris"}));
        assert!(
            message.content.is_empty(),
            "mixed content keeps text in blocks only"
        );
    }

    #[test]
    fn single_text_block_also_fills_content() {
        let resp: MessagesResponse = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "Hi!"}],
            "stop_reason": "end_turn"
        }))
        .expect("decode");
        let (message, finish) = adapter().convert_from_api(&resp);
        assert_eq!(message.content, "Hi!");
        assert_eq!(finish, Some(FinishReason::Stop));
    }

    #[test]
    fn thinking_blocks_survive_parsing() {
        let resp: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "Let me reason."},
                {"type": "text", "text": "Done."}
            ],
            "stop_reason": "end_turn"
        }))
        .expect("decode");
        let (message, _) = adapter().convert_from_api(&resp);
        assert!(matches!(
            message.content_blocks[0],
            ContentBlock::Thinking(_)
        ));
    }

    #[test]
    fn stop_reason_mapping_matches_the_vendor_taxonomy() {
        assert_eq!(map_stop_reason("end_turn"), FinishReason::Stop);
        assert_eq!(map_stop_reason("stop_sequence"), FinishReason::Stop);
        assert_eq!(map_stop_reason("max_tokens"), FinishReason::Length);
        assert_eq!(map_stop_reason("tool_use"), FinishReason::ToolCalls);
        assert_eq!(
            map_stop_reason("pause_turn"),
            FinishReason::Other("pause_turn".to_string())
        );
    }

    #[test]
    fn usage_total_is_computed() {
        let resp: MessagesResponse = serde_json::from_value(json!({
            "content": [],
            "usage": {"input_tokens": 10, "output_tokens": 5, "cache_read_input_tokens": 3}
        }))
        .expect("decode");
        let usage = adapter().convert_usage(&resp).expect("usage");
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.cached_tokens, 3);
    }

    #[test]
    fn unknown_block_kinds_are_skipped() {
        let resp: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "server_tool_use", "id": "x"},
                {"type": "text", "text": "kept"}
            ]
        }))
        .expect("decode");
        let (message, _) = adapter().convert_from_api(&resp);
        assert_eq!(message.content_blocks.len(), 1);
        assert_eq!(message.text(), "kept");
    }
}
