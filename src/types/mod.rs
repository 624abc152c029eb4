//! Vendor-neutral data model shared by every protocol adapter.
//!
//! Messages and streaming events are plain values: adapters construct them,
//! callers consume them, nothing here touches the network. The tagged enums
//! mirror the wire vocabulary (`text`, `tool_use`, `tool_result`, `thinking`)
//! so serialized conversations stay readable.

use std::collections::HashMap;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Conversation role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// One turn in a conversation.
///
/// `content` carries a single textual payload; `content_blocks` carries an
/// ordered mix of text, tool calls, tool results and thinking. When
/// `content_blocks` is non-empty it is authoritative and `content` is ignored
/// by protocol translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_blocks: Vec<ContentBlock>,
}

impl Message {
    /// Plain text message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            content_blocks: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Message carrying structured content blocks.
    pub fn with_blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: String::new(),
            content_blocks: blocks,
        }
    }

    /// Returns the textual content: `content` when set, otherwise the first
    /// text block.
    pub fn text(&self) -> &str {
        if !self.content.is_empty() {
            return &self.content;
        }
        for block in &self.content_blocks {
            if let ContentBlock::Text(text) = block {
                return &text.text;
            }
        }
        ""
    }

    /// Tool calls proposed by this message, in block order.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content_blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// Tool results carried by this message, in block order.
    pub fn tool_results(&self) -> Vec<&ToolResultBlock> {
        self.content_blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content_blocks
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolCall(_)))
    }

    pub fn has_tool_results(&self) -> bool {
        self.content_blocks
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolResult(_)))
    }
}

/// Tagged content block inside a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextBlock),
    #[serde(rename = "tool_use")]
    ToolCall(ToolCall),
    ToolResult(ToolResultBlock),
    Thinking(ThinkingBlock),
}

/// Plain text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

/// A function invocation proposed by the model.
///
/// `input` is a structured JSON object (argument name to value), never a
/// JSON-encoded string; the OpenAI adapter handles that dialect's string
/// indirection internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// The caller's reply to a [`ToolCall`]; `tool_use_id` references the
/// originating call's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    pub tool_use_id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// Extended chain-of-thought content surfaced by reasoning-capable models
/// (Claude extended thinking, Gemini 2.5 thoughts, DeepSeek R1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub thinking: String,
}

/// Request-time knobs, uniform across providers. Adapters ignore knobs their
/// dialect has no field for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options {
    /// System prompt; supersedes any stale system-role message in the input.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop_sequences: Vec<String>,
    /// Reasoning effort preset for models that accept one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningEffort>,
    /// Requests native reasoning tokens (Claude extended thinking, Gemini
    /// thoughts).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub enable_reasoning: bool,
    /// Token budget for the reasoning chain (Anthropic minimum is 1024).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

/// Reasoning effort presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Minimal => "minimal",
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

/// Structured-output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        schema: Option<Value>,
    },
}

/// Declaration of a tool available to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the tool input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    /// Example invocations; providers without a native field get them folded
    /// into the description.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_examples: Vec<Value>,
}

/// Result of one sync completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub message: Message,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// Vendor-reported model when present, else the configured model.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Normalized terminal status of a completion. Reasons no dialect documents
/// pass through unchanged in [`FinishReason::Other`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Other(other) => other,
        }
    }
}

impl From<&str> for FinishReason {
    fn from(value: &str) -> Self {
        match value {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinishReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(FinishReason::from(value.as_str()))
    }
}

/// Token accounting reported by the vendor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    /// Tokens spent deliberating but absent from the visible output.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub reasoning_tokens: u64,
    /// Prompt-caching hits.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub cached_tokens: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// One streaming chunk.
///
/// Within one stream, all [`Event::ToolCall`] deltas that share a
/// `tool_call.index` reconstruct exactly one [`ToolCall`]; see
/// [`crate::core::collect::StreamCollector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Text increment.
    Text { text_delta: String },
    /// Reasoning increment (DeepSeek R1, OpenAI o-series).
    Reasoning { reasoning: ReasoningDelta },
    /// Thinking increment (Claude extended thinking, Gemini thoughts).
    Thinking { reasoning: ReasoningDelta },
    /// Tool-call increment; fields accumulate across chunks.
    ToolCall { tool_call: ToolCallDelta },
    /// Completion signal. The stream may continue after it (OpenAI-compatible
    /// backends append usage chunks before the sentinel).
    Done { finish_reason: FinishReason },
    /// Mid-stream failure; the channel closes right after.
    Error { message: String },
}

impl Event {
    pub fn text(delta: impl Into<String>) -> Self {
        Event::Text {
            text_delta: delta.into(),
        }
    }

    pub fn reasoning(delta: impl Into<String>) -> Self {
        Event::Reasoning {
            reasoning: ReasoningDelta {
                thought_delta: delta.into(),
            },
        }
    }

    pub fn thinking(delta: impl Into<String>) -> Self {
        Event::Thinking {
            reasoning: ReasoningDelta {
                thought_delta: delta.into(),
            },
        }
    }

    pub fn done(finish_reason: FinishReason) -> Self {
        Event::Done { finish_reason }
    }
}

/// Incremental tool-call fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// JSON-string fragment; fragments concatenate to one complete value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments_delta: Option<String>,
}

/// Incremental reasoning content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningDelta {
    pub thought_delta: String,
}
