//! Protocol adapter for the chat-completions dialect.

use serde_json::{json, Map, Value};

use crate::core::protocol::{ProtocolAdapter, SystemMessageHandling};
use crate::types::{
    ContentBlock, FinishReason, Message, Role, TextBlock, TokenUsage, ToolCall,
};

use super::types::ChatResponse;

/// Translator for the OpenAI wire format.
///
/// The two rules that set this dialect apart:
/// - tool-call arguments travel as a JSON-encoded **string**
///   (`function.arguments`), decoded back into an object on the way in;
/// - tool results cannot stay inline: each [`ContentBlock::ToolResult`]
///   becomes its own `role: tool` wire message and the enclosing message is
///   dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiAdapter;

impl ProtocolAdapter for OpenAiAdapter {
    type Response = ChatResponse;

    fn convert_to_api(&self, messages: &[Message]) -> Vec<Value> {
        let mut result = Vec::with_capacity(messages.len());

        for msg in messages {
            if msg.role == Role::System {
                continue;
            }

            // Tool results expand into standalone tool messages, order
            // preserved; everything else in the message is dropped.
            if msg.has_tool_results() {
                for block in &msg.content_blocks {
                    if let ContentBlock::ToolResult(result_block) = block {
                        result.push(json!({
                            "role": "tool",
                            "tool_call_id": result_block.tool_use_id,
                            "content": result_block.content,
                        }));
                    }
                }
                continue;
            }

            let mut wire = Map::new();
            wire.insert("role".to_string(), Value::String(msg.role.as_str().to_string()));

            let text = msg.text();
            if !text.is_empty() {
                wire.insert("content".to_string(), Value::String(text.to_string()));
            }

            if msg.role == Role::Assistant {
                let tool_calls: Vec<Value> =
                    msg.tool_calls().iter().map(|call| wire_tool_call(call)).collect();
                if !tool_calls.is_empty() {
                    wire.insert("tool_calls".to_string(), Value::Array(tool_calls));
                    // The dialect requires a content field next to tool_calls,
                    // empty string included.
                    wire.entry("content".to_string())
                        .or_insert_with(|| Value::String(String::new()));
                }
            }

            result.push(Value::Object(wire));
        }

        result
    }

    fn convert_from_api(&self, resp: &ChatResponse) -> (Message, Option<FinishReason>) {
        let mut message = Message::assistant("");

        let Some(choice) = resp.choices.first() else {
            return (message, None);
        };

        let finish_reason = choice
            .finish_reason
            .as_deref()
            .filter(|reason| !reason.is_empty())
            .map(FinishReason::from);

        if let Some(wire) = &choice.message {
            if let Some(content) = &wire.content {
                message.content = content.clone();
            }

            if !wire.tool_calls.is_empty() {
                let mut blocks = Vec::new();
                if !message.content.is_empty() {
                    blocks.push(ContentBlock::Text(TextBlock {
                        text: message.content.clone(),
                    }));
                }
                for call in &wire.tool_calls {
                    let (name, arguments) = match &call.function {
                        Some(function) => (
                            function.name.clone().unwrap_or_default(),
                            function.arguments.as_deref(),
                        ),
                        None => (String::new(), None),
                    };
                    // Undo the string indirection; undecodable arguments keep
                    // the call with a null input.
                    let input = arguments
                        .map(|args| serde_json::from_str(args).unwrap_or(Value::Null))
                        .unwrap_or(Value::Null);
                    blocks.push(ContentBlock::ToolCall(ToolCall {
                        id: call.id.clone().unwrap_or_default(),
                        name,
                        input,
                    }));
                }
                message.content_blocks = blocks;
                message.content.clear();
            }
        }

        (message, finish_reason)
    }

    fn convert_usage(&self, resp: &ChatResponse) -> Option<TokenUsage> {
        let usage = resp.usage.as_ref()?;
        Some(TokenUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            reasoning_tokens: usage
                .completion_tokens_details
                .as_ref()
                .map(|details| details.reasoning_tokens)
                .unwrap_or_default(),
            cached_tokens: usage
                .prompt_tokens_details
                .as_ref()
                .map(|details| details.cached_tokens)
                .unwrap_or_default(),
        })
    }

    fn response_model(&self, resp: &ChatResponse) -> Option<String> {
        resp.model.clone()
    }

    fn system_message_handling(&self) -> SystemMessageHandling {
        SystemMessageHandling::Inline
    }
}

fn wire_tool_call(call: &ToolCall) -> Value {
    let arguments =
        serde_json::to_string(&call.input).unwrap_or_else(|_| "null".to_string());
    json!({
        "id": call.id,
        "type": "function",
        "function": {
            "name": call.name,
            "arguments": arguments,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolResultBlock;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter
    }

    #[test]
    fn arguments_encode_as_a_string_that_decodes_back() {
        let input = json!({"city": "Paris", "days": 3});
        let msg = Message::with_blocks(
            Role::Assistant,
            vec![ContentBlock::ToolCall(ToolCall {
                id: "call_1".to_string(),
                name: "get_weather".to_string(),
                input: input.clone(),
            })],
        );

        let wire = adapter().convert_to_api(&[msg]);
        let arguments = wire[0]["tool_calls"][0]["function"]["arguments"]
            .as_str()
            .expect("arguments must be a JSON string, not an object");
        let decoded: Value = serde_json::from_str(arguments).expect("decode");
        assert_eq!(decoded, input, "round-trip must be exact");
    }

    #[test]
    fn assistant_tool_calls_force_a_content_field() {
        let msg = Message::with_blocks(
            Role::Assistant,
            vec![ContentBlock::ToolCall(ToolCall {
                id: "call_1".to_string(),
                name: "f".to_string(),
                input: json!({}),
            })],
        );

        let wire = adapter().convert_to_api(&[msg]);
        assert_eq!(wire[0]["content"], json!(""));
    }

    #[test]
    fn tool_results_expand_in_order_and_drop_the_envelope() {
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
                    is_error: false,
                }),
            ],
        );

        let wire = adapter().convert_to_api(&[msg]);
        assert_eq!(wire.len(), 2, "one wire message per tool result");
        assert_eq!(wire[0]["role"], json!("tool"));
        assert_eq!(wire[0]["tool_call_id"], json!("t1"));
        assert_eq!(wire[1]["tool_call_id"], json!("t2"));
    }

    #[test]
    fn system_messages_are_skipped_by_the_adapter() {
        let wire = adapter().convert_to_api(&[
            Message::system("prompt"),
            Message::user("hi"),
        ]);
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0]["role"], json!("user"));
    }

    #[test]
    fn response_tool_calls_decode_the_argument_string() {
        let body = json!({
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "content": "Let me check.",
                    "tool_calls": [{
                        "id": "call_a",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Paris\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });
        let resp: ChatResponse = serde_json::from_value(body).expect("decode");
        let (message, finish) = adapter().convert_from_api(&resp);

        assert_eq!(finish, Some(FinishReason::ToolCalls));
        assert!(message.content.is_empty(), "content moves into blocks");
        let calls = message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].input, json!({"city": "Paris"}));
        assert_eq!(message.content_blocks.len(), 2, "leading text block kept");
    }

    #[test]
    fn undecodable_arguments_become_null_input() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {"tool_calls": [{
                    "id": "call_a",
                    "function": {"name": "f", "arguments": "{broken"}
                }]},
                "finish_reason": "tool_calls"
            }]
        }))
        .expect("decode");
        let (message, _) = adapter().convert_from_api(&resp);
        assert_eq!(message.tool_calls()[0].input, Value::Null);
    }

    #[test]
    fn usage_reads_nested_detail_fields() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15,
                "completion_tokens_details": {"reasoning_tokens": 4},
                "prompt_tokens_details": {"cached_tokens": 6}
            }
        }))
        .expect("decode");
        let usage = adapter().convert_usage(&resp).expect("usage");
        assert_eq!(usage.input_tokens, 10);
        assert_eq!(usage.output_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.reasoning_tokens, 4);
        assert_eq!(usage.cached_tokens, 6);
    }

    #[test]
    fn unknown_finish_reasons_pass_through() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "x"}, "finish_reason": "weird_reason"}]
        }))
        .expect("decode");
        let (_, finish) = adapter().convert_from_api(&resp);
        assert_eq!(finish, Some(FinishReason::Other("weird_reason".to_string())));
    }

    #[test]
    fn plain_text_round_trips_up_to_content_collapsing() {
        let resp: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "Hi!"}, "finish_reason": "stop"}]
        }))
        .expect("decode");
        let (message, finish) = adapter().convert_from_api(&resp);
        assert_eq!(message.text(), "Hi!");
        assert_eq!(finish, Some(FinishReason::Stop));

        let wire = adapter().convert_to_api(&[message]);
        assert_eq!(wire[0], json!({"role": "assistant", "content": "Hi!"}));
    }
}
