//! Provider-type registry and client configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default request timeout for sync completions.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default retry budget advertised to retry middleware; the crate itself does
/// not retry.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Provider tag dispatched on by the factory.
///
/// Ten of the thirteen tags speak the OpenAI wire dialect and share one client
/// implementation; `anthropic` and `gemini` have dedicated adapters; `mock`
/// is reserved for test harnesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    OpenRouter,
    Anthropic,
    DeepSeek,
    Ollama,
    Azure,
    Gemini,
    Mock,
    Glm,
    Doubao,
    Moonshot,
    Groq,
    Mistral,
}

impl Default for ProviderType {
    fn default() -> Self {
        ProviderType::OpenRouter
    }
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "openai",
            ProviderType::OpenRouter => "openrouter",
            ProviderType::Anthropic => "anthropic",
            ProviderType::DeepSeek => "deepseek",
            ProviderType::Ollama => "ollama",
            ProviderType::Azure => "azure",
            ProviderType::Gemini => "gemini",
            ProviderType::Mock => "mock",
            ProviderType::Glm => "glm",
            ProviderType::Doubao => "doubao",
            ProviderType::Moonshot => "moonshot",
            ProviderType::Groq => "groq",
            ProviderType::Mistral => "mistral",
        }
    }

    /// True when this tag speaks the OpenAI chat-completions dialect.
    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            ProviderType::OpenAi
                | ProviderType::OpenRouter
                | ProviderType::DeepSeek
                | ProviderType::Ollama
                | ProviderType::Azure
                | ProviderType::Glm
                | ProviderType::Doubao
                | ProviderType::Moonshot
                | ProviderType::Groq
                | ProviderType::Mistral
        )
    }

    /// Registry default base URL. Empty for tags that require explicit
    /// configuration (Azure deployments, the test mock).
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "https://api.openai.com/v1",
            ProviderType::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderType::Anthropic => "https://api.anthropic.com/v1",
            ProviderType::DeepSeek => "https://api.deepseek.com/v1",
            ProviderType::Ollama => "http://localhost:11434/v1",
            ProviderType::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderType::Glm => "https://open.bigmodel.cn/api/paas/v4",
            ProviderType::Doubao => "https://ark.cn-beijing.volces.com/api/v3",
            ProviderType::Moonshot => "https://api.moonshot.cn/v1",
            ProviderType::Groq => "https://api.groq.com/openai/v1",
            ProviderType::Mistral => "https://api.mistral.ai/v1",
            ProviderType::Azure | ProviderType::Mock => "",
        }
    }

    /// Registry default model. Empty where only the user can choose
    /// (Doubao endpoints, Azure deployments).
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "gpt-4o-mini",
            ProviderType::OpenRouter => "anthropic/claude-haiku-4.5",
            ProviderType::Anthropic => "claude-3-5-haiku-latest",
            ProviderType::DeepSeek => "deepseek-chat",
            ProviderType::Ollama => "llama3.2",
            ProviderType::Gemini => "gemini-1.5-flash",
            ProviderType::Glm => "glm-4-flash",
            ProviderType::Moonshot => "moonshot-v1-128k",
            ProviderType::Groq => "llama-3.3-70b-versatile",
            ProviderType::Mistral => "mistral-large-latest",
            ProviderType::Mock => "mock",
            ProviderType::Azure | ProviderType::Doubao => "",
        }
    }

    /// Whether the factory requires an API key for this tag.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderType::Ollama | ProviderType::Mock)
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "OPENAI",
            ProviderType::OpenRouter => "OPENROUTER",
            ProviderType::Anthropic => "ANTHROPIC",
            ProviderType::DeepSeek => "DEEPSEEK",
            ProviderType::Ollama => "OLLAMA",
            ProviderType::Azure => "AZURE",
            ProviderType::Gemini => "GEMINI",
            ProviderType::Mock => "MOCK",
            ProviderType::Glm => "GLM",
            ProviderType::Doubao => "DOUBAO",
            ProviderType::Moonshot => "MOONSHOT",
            ProviderType::Groq => "GROQ",
            ProviderType::Mistral => "MISTRAL",
        }
    }

    /// Environment variable consulted for the API key, e.g. `OPENAI_API_KEY`.
    pub fn api_key_env(&self) -> String {
        format!("{}_API_KEY", self.env_prefix())
    }

    /// Environment variable consulted for the model, e.g. `OPENAI_MODEL`.
    pub fn model_env(&self) -> String {
        format!("{}_MODEL", self.env_prefix())
    }

    /// Environment variable consulted for the base URL, e.g.
    /// `OPENAI_BASE_URL`.
    pub fn base_url_env(&self) -> String {
        format!("{}_BASE_URL", self.env_prefix())
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Factory configuration.
///
/// Missing values fall back first to the tag's environment variables, then to
/// the registry defaults; explicit values always win.
///
/// ```
/// use tsunagi_llm::{Config, ProviderType};
///
/// let cfg = Config {
///     provider_type: ProviderType::DeepSeek,
///     api_key: "sk-test".to_string(),
///     ..Config::default()
/// };
/// assert_eq!(cfg.provider_type.default_model(), "deepseek-chat");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "type", default)]
    pub provider_type: ProviderType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds; defaults to 120.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Retry budget for external retry middleware; defaults to 3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Opaque provider-specific settings. The OpenAI-compatible path reads an
    /// optional `headers` map; Gemini reads `vertex_project` /
    /// `vertex_location`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

impl Config {
    pub fn new(provider_type: ProviderType, api_key: impl Into<String>) -> Self {
        Self {
            provider_type,
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    /// Applies the resolution precedence: explicit config, then the tag's
    /// environment variables, then registry defaults.
    pub fn resolved(&self) -> ResolvedConfig {
        let ptype = self.provider_type;
        let api_key = non_empty(self.api_key.clone())
            .or_else(|| env_non_empty(&ptype.api_key_env()))
            .unwrap_or_default();
        let model = self
            .model
            .clone()
            .and_then(non_empty)
            .or_else(|| env_non_empty(&ptype.model_env()))
            .unwrap_or_else(|| ptype.default_model().to_string());
        let base_url = self
            .base_url
            .clone()
            .and_then(non_empty)
            .or_else(|| env_non_empty(&ptype.base_url_env()))
            .unwrap_or_else(|| ptype.default_base_url().to_string());

        ResolvedConfig {
            provider_type: ptype,
            api_key,
            model,
            base_url,
            timeout: self.timeout_duration(),
        }
    }

    /// Extra request headers from `extra.headers`, non-string values skipped.
    pub fn extra_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        if let Some(Value::Object(map)) = self.extra.get("headers") {
            for (name, value) in map {
                if let Value::String(text) = value {
                    headers.insert(name.clone(), text.clone());
                }
            }
        }
        headers
    }

    /// String-typed lookup into `extra`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// Output of [`Config::resolved`].
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider_type: ProviderType,
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(non_empty)
}
