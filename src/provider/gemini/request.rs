//! Request-body construction for the GenerateContent dialect.

use serde_json::{json, Map, Value};

use crate::core::client::RequestBuilder;
use crate::core::transformer::{resolve_system_prompt, Transformer};
use crate::error::LlmError;
use crate::types::{Message, Options, ResponseFormat, ToolSchema};

use super::adapter::GeminiAdapter;

/// Applied when the caller sets no output budget.
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Builds GenerateContent request bodies.
pub struct GeminiRequestBuilder {
    transformer: Transformer<GeminiAdapter>,
    model: String,
}

impl GeminiRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            transformer: Transformer::new(GeminiAdapter::new()),
            model: model.into(),
        }
    }
}

impl RequestBuilder for GeminiRequestBuilder {
    fn build_request(
        &self,
        messages: &[Message],
        opts: &Options,
        _stream: bool,
    ) -> Result<Value, LlmError> {
        // Streaming is selected by the endpoint, not a body flag.
        let system_prompt = resolve_system_prompt(messages, opts);
        let contents = self.transformer.build_api_messages(messages, &system_prompt);

        let mut body = Map::new();
        body.insert("contents".to_string(), Value::Array(contents));

        if !system_prompt.is_empty() {
            body.insert(
                "systemInstruction".to_string(),
                json!({"parts": [{"text": system_prompt}]}),
            );
        }

        let mut generation = Map::new();
        generation.insert(
            "maxOutputTokens".to_string(),
            Value::from(opts.max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS)),
        );
        if let Some(temperature) = opts.temperature {
            generation.insert("temperature".to_string(), Value::from(temperature));
        }
        if let Some(top_p) = opts.top_p {
            generation.insert("topP".to_string(), Value::from(top_p));
        }
        if !opts.stop_sequences.is_empty() {
            generation.insert("stopSequences".to_string(), json!(opts.stop_sequences));
        }
        match &opts.response_format {
            Some(ResponseFormat::JsonSchema { schema, .. }) => {
                generation.insert(
                    "responseMimeType".to_string(),
                    json!("application/json"),
                );
                if let Some(schema) = schema {
                    generation.insert("responseSchema".to_string(), wire_schema(schema));
                }
            }
            Some(ResponseFormat::JsonObject) => {
                generation.insert(
                    "responseMimeType".to_string(),
                    json!("application/json"),
                );
            }
            Some(ResponseFormat::Text) | None => {}
        }
        body.insert("generationConfig".to_string(), Value::Object(generation));

        if opts.enable_reasoning {
            if !supports_thinking(&self.model) {
                return Err(LlmError::config(format!(
                    "model {} does not support thinking mode",
                    self.model
                )));
            }
            let mut thinking = Map::new();
            thinking.insert("includeThoughts".to_string(), Value::Bool(true));
            if let Some(budget) = opts.reasoning_budget {
                thinking.insert("thinkingBudget".to_string(), Value::from(budget));
            }
            body.insert("thinkingConfig".to_string(), Value::Object(thinking));
        }

        if !opts.tools.is_empty() {
            let declarations: Vec<Value> = opts.tools.iter().map(wire_tool).collect();
            body.insert(
                "tools".to_string(),
                json!([{"functionDeclarations": declarations}]),
            );
        }

        Ok(Value::Object(body))
    }
}

fn supports_thinking(model: &str) -> bool {
    model.starts_with("gemini-2.5")
}

fn wire_tool(tool: &ToolSchema) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool
            .input_schema
            .as_ref()
            .map(wire_schema)
            .unwrap_or_else(|| json!({"type": "OBJECT"})),
    })
}

/// Standard JSON Schema to the dialect's schema shape: uppercased type names,
/// recursion through `properties` and `items`; unknown keywords dropped.
fn wire_schema(schema: &Value) -> Value {
    let Some(schema) = schema.as_object() else {
        return json!({"type": "OBJECT"});
    };

    let mut result = Map::new();
    if let Some(kind) = schema.get("type").and_then(Value::as_str) {
        result.insert("type".to_string(), json!(wire_schema_type(kind)));
    }
    if let Some(description) = schema.get("description") {
        result.insert("description".to_string(), description.clone());
    }
    if let Some(Value::Object(properties)) = schema.get("properties") {
        let converted: Map<String, Value> = properties
            .iter()
            .map(|(name, prop)| (name.clone(), wire_schema(prop)))
            .collect();
        result.insert("properties".to_string(), Value::Object(converted));
    }
    if let Some(required) = schema.get("required") {
        result.insert("required".to_string(), required.clone());
    }
    if let Some(items) = schema.get("items") {
        result.insert("items".to_string(), wire_schema(items));
    }
    if let Some(variants) = schema.get("enum") {
        result.insert("enum".to_string(), variants.clone());
    }
    Value::Object(result)
}

fn wire_schema_type(kind: &str) -> &'static str {
    match kind {
        "number" => "NUMBER",
        "integer" => "INTEGER",
        "boolean" => "BOOLEAN",
        "array" => "ARRAY",
        "object" => "OBJECT",
        _ => "STRING",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(messages: &[Message], opts: &Options) -> Value {
        GeminiRequestBuilder::new("gemini-2.5-flash")
            .build_request(messages, opts, false)
            .expect("build")
    }

    #[test]
    fn system_prompt_goes_into_system_instruction() {
        let opts = Options {
            system: "Be terse.".to_string(),
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        assert_eq!(
            body["systemInstruction"],
            json!({"parts": [{"text": "Be terse."}]})
        );
        let contents = body["contents"].as_array().expect("contents");
        assert_eq!(contents.len(), 1, "system message never joins contents");
    }

    #[test]
    fn generation_config_carries_the_sampling_knobs() {
        let opts = Options {
            max_tokens: Some(512),
            temperature: Some(0.3),
            top_p: Some(0.8),
            stop_sequences: vec!["END".to_string()],
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        let config = &body["generationConfig"];
        assert_eq!(config["maxOutputTokens"], json!(512));
        assert_eq!(config["temperature"], json!(0.3));
        assert_eq!(config["topP"], json!(0.8));
        assert_eq!(config["stopSequences"], json!(["END"]));
    }

    #[test]
    fn max_output_tokens_defaults() {
        let body = build(&[Message::user("q")], &Options::default());
        assert_eq!(
            body["generationConfig"]["maxOutputTokens"],
            json!(DEFAULT_MAX_OUTPUT_TOKENS)
        );
    }

    #[test]
    fn thinking_config_requires_a_capable_model() {
        let opts = Options {
            enable_reasoning: true,
            reasoning_budget: Some(1024),
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        assert_eq!(
            body["thinkingConfig"],
            json!({"includeThoughts": true, "thinkingBudget": 1024})
        );

        let err = GeminiRequestBuilder::new("gemini-1.5-flash")
            .build_request(&[Message::user("q")], &opts, false)
            .unwrap_err();
        assert!(matches!(err, LlmError::Config { .. }));
    }

    #[test]
    fn tool_schemas_convert_to_uppercase_types_recursively() {
        let opts = Options {
            tools: vec![ToolSchema {
                name: "get_weather".to_string(),
                description: "Weather".to_string(),
                input_schema: Some(json!({
                    "type": "object",
                    "properties": {
                        "city": {"type": "string", "description": "City name"},
                        "days": {"type": "array", "items": {"type": "integer"}},
                        "unit": {"type": "string", "enum": ["c", "f"]}
                    },
                    "required": ["city"]
                })),
                input_examples: Vec::new(),
            }],
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        let params = &body["tools"][0]["functionDeclarations"][0]["parameters"];
        assert_eq!(params["type"], json!("OBJECT"));
        assert_eq!(params["properties"]["city"]["type"], json!("STRING"));
        assert_eq!(params["properties"]["days"]["type"], json!("ARRAY"));
        assert_eq!(
            params["properties"]["days"]["items"]["type"],
            json!("INTEGER")
        );
        assert_eq!(params["properties"]["unit"]["enum"], json!(["c", "f"]));
        assert_eq!(params["required"], json!(["city"]));
    }

    #[test]
    fn structured_output_sets_mime_type_and_schema() {
        let opts = Options {
            response_format: Some(ResponseFormat::JsonSchema {
                name: String::new(),
                schema: Some(json!({"type": "object"})),
            }),
            ..Options::default()
        };
        let body = build(&[Message::user("q")], &opts);
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], json!("application/json"));
        assert_eq!(config["responseSchema"]["type"], json!("OBJECT"));
    }
}
