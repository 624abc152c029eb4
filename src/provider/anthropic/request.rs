//! Request-body construction for the Messages dialect.

use serde_json::{json, Map, Value};

use crate::core::client::RequestBuilder;
use crate::core::transformer::{resolve_system_prompt, Transformer};
use crate::error::LlmError;
use crate::types::{Message, Options, ToolSchema};

use super::adapter::AnthropicAdapter;

/// The API refuses requests without `max_tokens`; applied when the caller
/// sets none.
const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Beta flag unlocking `input_examples` on tool definitions.
const TOOL_EXAMPLES_BETA: &str = "advanced-tool-use-2025-11-20";

/// Builds Messages request bodies.
pub struct AnthropicRequestBuilder {
    transformer: Transformer<AnthropicAdapter>,
    model: String,
}

impl AnthropicRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            transformer: Transformer::new(AnthropicAdapter),
            model: model.into(),
        }
    }
}

impl RequestBuilder for AnthropicRequestBuilder {
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
        body.insert(
            "max_tokens".to_string(),
            Value::from(opts.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        );
        body.insert("stream".to_string(), Value::Bool(stream));

        // System prompt travels separately in this dialect.
        if !system_prompt.is_empty() {
            body.insert("system".to_string(), Value::String(system_prompt));
        }

        if let Some(temperature) = opts.temperature {
            body.insert("temperature".to_string(), Value::from(temperature));
        }
        if let Some(top_p) = opts.top_p {
            body.insert("top_p".to_string(), Value::from(top_p));
        }
        if !opts.stop_sequences.is_empty() {
            body.insert("stop_sequences".to_string(), json!(opts.stop_sequences));
        }

        if !opts.tools.is_empty() {
            let mut has_examples = false;
            let tools: Vec<Value> = opts
                .tools
                .iter()
                .map(|tool| wire_tool(tool, &mut has_examples))
                .collect();
            body.insert("tools".to_string(), Value::Array(tools));
            if has_examples {
                body.insert("betas".to_string(), json!([TOOL_EXAMPLES_BETA]));
            }
        }

        if opts.enable_reasoning {
            let mut thinking = Map::new();
            thinking.insert("type".to_string(), json!("enabled"));
            if let Some(budget) = opts.reasoning_budget {
                thinking.insert("budget_tokens".to_string(), Value::from(budget));
            }
            body.insert("thinking".to_string(), Value::Object(thinking));
        }

        if let Some(metadata) = &opts.metadata {
            body.insert("metadata".to_string(), json!(metadata));
        }

        Ok(Value::Object(body))
    }
}

fn wire_tool(tool: &ToolSchema, has_examples: &mut bool) -> Value {
    let mut wire = Map::new();
    wire.insert("name".to_string(), json!(tool.name));
    wire.insert("description".to_string(), json!(tool.description));
    wire.insert("input_schema".to_string(), json!(tool.input_schema));
    if !tool.input_examples.is_empty() {
        wire.insert("input_examples".to_string(), json!(tool.input_examples));
        *has_examples = true;
    }
    Value::Object(wire)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(messages: &[Message], opts: &Options) -> Value {
        AnthropicRequestBuilder::new("claude-3-5-haiku-latest")
            .build_request(messages, opts, false)
            .expect("build")
    }

    #[test]
    fn system_prompt_is_a_top_level_field_not_a_message() {
        let opts = Options {
            system: "You are helpful.".to_string(),
            ..Options::default()
        };
        let body = build(&[Message::user("Weather in Paris?")], &opts);
        assert_eq!(body["system"], json!("You are helpful."));
        let messages = body["messages"].as_array().expect("array");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], json!("user"));
    }

    #[test]
    fn stale_system_message_feeds_the_top_level_field() {
        let body = build(
            &[Message::system("from history"), Message::user("q")],
            &Options::default(),
        );
        assert_eq!(body["system"], json!("from history"));
        assert_eq!(body["messages"].as_array().expect("array").len(), 1);
    }

    #[test]
    fn max_tokens_defaults_when_unset() {
        let body = build(&[Message::user("q")], &Options::default());
        assert_eq!(body["max_tokens"], json!(DEFAULT_MAX_TOKENS));

        let opts = Options {
            max_tokens: Some(256),
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        assert_eq!(body["max_tokens"], json!(256));
    }

    #[test]
    fn input_examples_pass_through_and_set_the_beta_flag() {
        let opts = Options {
            tools: vec![ToolSchema {
                name: "get_weather".to_string(),
                description: "Weather lookup".to_string(),
                input_schema: Some(json!({"type": "object"})),
                input_examples: vec![json!({"city": "Paris"})],
            }],
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        assert_eq!(
            body["tools"][0]["input_examples"],
            json!([{"city": "Paris"}])
        );
        assert_eq!(body["betas"], json!([TOOL_EXAMPLES_BETA]));
    }

    #[test]
    fn tools_without_examples_skip_the_beta_flag() {
        let opts = Options {
            tools: vec![ToolSchema {
                name: "get_weather".to_string(),
                description: String::new(),
                input_schema: None,
                input_examples: Vec::new(),
            }],
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        assert!(body.get("betas").is_none());
    }

    #[test]
    fn extended_thinking_uses_budget_tokens() {
        let opts = Options {
            enable_reasoning: true,
            reasoning_budget: Some(2048),
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        assert_eq!(
            body["thinking"],
            json!({"type": "enabled", "budget_tokens": 2048})
        );
    }
}
