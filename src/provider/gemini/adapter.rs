//! Protocol adapter for the GenerateContent dialect.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

use crate::core::protocol::{ProtocolAdapter, SystemMessageHandling};
use crate::types::{
    ContentBlock, FinishReason, Message, Role, TextBlock, ThinkingBlock, TokenUsage, ToolCall,
};

use super::types::GenerateContentResponse;

/// Translator for the Gemini wire format.
///
/// Dialect rules: messages are `{role, parts[]}` with `assistant` mapped to
/// `model` and `tool` to `function`; tool results become `functionResponse`
/// parts keyed by the originating call's id (the dialect has no id scheme of
/// its own); thinking content is a text part flagged `thought: true`.
///
/// Because the vendor returns no tool-call ids, the adapter synthesizes
/// locally-unique ones from an instance-scoped counter.
#[derive(Debug, Default)]
pub struct GeminiAdapter {
    call_ids: AtomicU64,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_call_id(&self) -> String {
        let n = self.call_ids.fetch_add(1, Ordering::Relaxed) + 1;
        format!("call_{n}")
    }
}

impl ProtocolAdapter for GeminiAdapter {
    type Response = GenerateContentResponse;

    fn convert_to_api(&self, messages: &[Message]) -> Vec<Value> {
        let mut result = Vec::with_capacity(messages.len());

        for msg in messages {
            if msg.role == Role::System {
                continue;
            }

            let mut parts = Vec::new();
            for block in &msg.content_blocks {
                match block {
                    ContentBlock::Text(text) => {
                        parts.push(json!({"text": text.text}));
                    }
                    ContentBlock::ToolCall(call) => {
                        parts.push(json!({
                            "functionCall": {"name": call.name, "args": call.input},
                        }));
                    }
                    ContentBlock::ToolResult(result_block) => {
                        parts.push(json!({
                            "functionResponse": {
                                "name": result_block.tool_use_id,
                                "response": {
                                    "content": result_block.content,
                                    "error": result_block.is_error,
                                },
                            },
                        }));
                    }
                    ContentBlock::Thinking(thinking) => {
                        parts.push(json!({"text": thinking.thinking, "thought": true}));
                    }
                }
            }
            if parts.is_empty() && !msg.content.is_empty() {
                parts.push(json!({"text": msg.content}));
            }

            result.push(json!({
                "role": map_role(msg.role),
                "parts": parts,
            }));
        }

        result
    }

    fn convert_from_api(&self, resp: &GenerateContentResponse) -> (Message, Option<FinishReason>) {
        let mut message = Message::assistant("");

        let Some(candidate) = resp.candidates.first() else {
            return (message, None);
        };

        let finish_reason = candidate
            .finish_reason
            .as_deref()
            .filter(|reason| !reason.is_empty())
            .map(map_finish_reason);

        let Some(content) = &candidate.content else {
            return (message, finish_reason);
        };

        let mut blocks = Vec::new();
        for part in &content.parts {
            if let Some(text) = &part.text {
                if part.thought {
                    blocks.push(ContentBlock::Thinking(ThinkingBlock {
                        thinking: text.clone(),
                    }));
                } else {
                    blocks.push(ContentBlock::Text(TextBlock { text: text.clone() }));
                }
            }
            if let Some(call) = &part.function_call {
                blocks.push(ContentBlock::ToolCall(ToolCall {
                    id: self.next_call_id(),
                    name: call.name.clone(),
                    input: call.args.clone(),
                }));
            }
        }

        if blocks.len() == 1 {
            if let ContentBlock::Text(text) = &blocks[0] {
                message.content = text.text.clone();
            }
        }
        message.content_blocks = blocks;

        (message, finish_reason)
    }

    fn convert_usage(&self, resp: &GenerateContentResponse) -> Option<TokenUsage> {
        let usage = resp.usage_metadata.as_ref()?;
        Some(TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
            reasoning_tokens: usage.thoughts_token_count,
            cached_tokens: usage.cached_content_token_count,
        })
    }

    fn response_model(&self, resp: &GenerateContentResponse) -> Option<String> {
        resp.model_version.clone()
    }

    fn system_message_handling(&self) -> SystemMessageHandling {
        SystemMessageHandling::Separate
    }
}

fn map_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        Role::Tool => "function",
        Role::User | Role::System => "user",
    }
}

/// Vendor finish taxonomy to the normalized one; unknown reasons pass
/// through.
pub(crate) fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" | "OTHER" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}
