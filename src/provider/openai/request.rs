//! Request-body construction for the chat-completions dialect.

use serde_json::{json, Map, Value};

use crate::core::client::RequestBuilder;
use crate::core::transformer::{resolve_system_prompt, Transformer};
use crate::error::LlmError;
use crate::types::{Message, Options, ResponseFormat, ToolSchema};

use super::adapter::OpenAiAdapter;

/// Model prefixes with reasoning-model restrictions: temperature is pinned to
/// 1 and `top_p` is rejected upstream.
const REASONING_MODEL_PREFIXES: &[&str] =
    &["o1", "o3", "o4", "gpt-5", "deepseek-reasoner", "deepseek-r1"];

pub(crate) fn is_reasoning_model(model: &str) -> bool {
    let lower = model.to_ascii_lowercase();
    REASONING_MODEL_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Builds chat-completions request bodies.
pub struct OpenAiRequestBuilder {
    transformer: Transformer<OpenAiAdapter>,
    model: String,
}

impl OpenAiRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            transformer: Transformer::new(OpenAiAdapter),
            model: model.into(),
        }
    }
}

impl RequestBuilder for OpenAiRequestBuilder {
    fn build_request(
        &self,
        messages: &[Message],
        opts: &Options,
        stream: bool,
    ) -> Result<Value, LlmError> {
        let system_prompt = resolve_system_prompt(messages, opts);
        let api_messages = self.transformer.build_api_messages(messages, &system_prompt);

        let mut body = Map::new();
        body.insert("model".to_string(), Value::String(self.model.clone()));
        body.insert("messages".to_string(), Value::Array(api_messages));
        body.insert("stream".to_string(), Value::Bool(stream));

        let reasoning_model = is_reasoning_model(&self.model);

        if let Some(max_tokens) = opts.max_tokens {
            body.insert("max_tokens".to_string(), Value::from(max_tokens));
        }
        if let Some(temperature) = opts.temperature {
            // Reasoning models reject anything but the default temperature.
            let effective = if reasoning_model { 1.0 } else { temperature };
            body.insert("temperature".to_string(), Value::from(effective));
        }
        if let Some(top_p) = opts.top_p {
            if !reasoning_model {
                body.insert("top_p".to_string(), Value::from(top_p));
            }
        }
        if let Some(penalty) = opts.frequency_penalty {
            body.insert("frequency_penalty".to_string(), Value::from(penalty));
        }
        if let Some(penalty) = opts.presence_penalty {
            body.insert("presence_penalty".to_string(), Value::from(penalty));
        }
        if !opts.stop_sequences.is_empty() {
            body.insert("stop".to_string(), json!(opts.stop_sequences));
        }

        if !opts.tools.is_empty() {
            let tools: Vec<Value> = opts.tools.iter().map(wire_tool).collect();
            body.insert("tools".to_string(), Value::Array(tools));
        }

        if let Some(effort) = opts.reasoning {
            body.insert(
                "reasoning_effort".to_string(),
                Value::String(effort.as_str().to_string()),
            );
        }

        match &opts.response_format {
            Some(ResponseFormat::JsonSchema { name, schema }) => {
                body.insert(
                    "response_format".to_string(),
                    json!({
                        "type": "json_schema",
                        "json_schema": {"name": name, "schema": schema},
                    }),
                );
            }
            Some(ResponseFormat::JsonObject) => {
                body.insert("response_format".to_string(), json!({"type": "json_object"}));
            }
            Some(ResponseFormat::Text) | None => {}
        }

        if let Some(metadata) = &opts.metadata {
            body.insert("metadata".to_string(), json!(metadata));
        }

        Ok(Value::Object(body))
    }
}

/// The dialect has no `input_examples` field; examples are folded into the
/// description as a numbered list.
fn wire_tool(tool: &ToolSchema) -> Value {
    let mut description = tool.description.clone();
    if !tool.input_examples.is_empty() {
        description.push_str("\n\nExamples:");
        for (i, example) in tool.input_examples.iter().enumerate() {
            let rendered = serde_json::to_string(example).unwrap_or_default();
            description.push_str(&format!("\n{}. {rendered}", i + 1));
        }
    }

    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": description,
            "parameters": tool.input_schema,
        },
    })
}
