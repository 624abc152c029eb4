//! Client for the ten OpenAI-compatible backends.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ProviderType, DEFAULT_TIMEOUT};
use crate::core::client::{BaseClient, ProviderConfig, ProviderDefaults};
use crate::core::sse::EventStream;
use crate::error::LlmError;
use crate::http::reqwest::default_dyn_transport;
use crate::http::DynHttpTransport;
use crate::provider::Provider;
use crate::types::{Message, Options, Response};

use super::adapter::OpenAiAdapter;
use super::events::OpenAiEventHandler;
use super::request::OpenAiRequestBuilder;

/// Configuration for one OpenAI-compatible backend.
///
/// `provider_type` selects the registry defaults and the tag reported in
/// errors; all ten compatible tags go through this one config.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    /// Empty means the tag's registry default.
    pub base_url: String,
    /// Empty means the tag's registry default.
    pub model: String,
    pub timeout: Option<Duration>,
    /// 额外的请求头
    pub headers: HashMap<String, String>,
    pub provider_type: ProviderType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            model: String::new(),
            timeout: None,
            headers: HashMap::new(),
            provider_type: ProviderType::OpenAi,
        }
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

impl ProviderConfig for Config {
    fn validate(&self) -> Result<(), LlmError> {
        // Local Ollama daemons are unauthenticated; every other backend
        // needs a key.
        if self.api_key.is_empty() && self.provider_type != ProviderType::Ollama {
            return Err(LlmError::config(format!(
                "API key is required for provider {}",
                self.provider_type
            )));
        }
        Ok(())
    }

    fn defaults(&self) -> ProviderDefaults {
        let base_url = if self.base_url.is_empty() {
            self.provider_type.default_base_url().to_string()
        } else {
            self.base_url.clone()
        };
        let model = if self.model.is_empty() {
            self.provider_type.default_model().to_string()
        } else {
            self.model.clone()
        };
        ProviderDefaults {
            base_url,
            model,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]);
        if !self.api_key.is_empty() {
            headers.insert("Authorization".to_string(), format!("Bearer {}", self.api_key));
        }
        headers.extend(self.headers.clone());
        headers
    }

    fn provider_name(&self) -> &'static str {
        self.provider_type.as_str()
    }
}

/// OpenAI-compatible chat client; fixed `/chat/completions` endpoint.
pub struct Client {
    base: BaseClient<OpenAiAdapter, OpenAiEventHandler>,
    builder: OpenAiRequestBuilder,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, LlmError> {
        Self::with_transport(config, default_dyn_transport()?)
    }

    pub fn with_transport(config: Config, transport: DynHttpTransport) -> Result<Self, LlmError> {
        let base = BaseClient::new(&config, OpenAiAdapter, OpenAiEventHandler, transport)?;
        let builder = OpenAiRequestBuilder::new(base.model());
        Ok(Self { base, builder })
    }

    pub(crate) fn from_config(
        config: &crate::config::Config,
        transport: DynHttpTransport,
    ) -> Result<Self, LlmError> {
        let resolved = config.resolved();
        Self::with_transport(
            Config {
                api_key: resolved.api_key,
                base_url: resolved.base_url,
                model: resolved.model,
                timeout: Some(resolved.timeout),
                headers: config.extra_headers(),
                provider_type: resolved.provider_type,
            },
            transport,
        )
    }
}

#[async_trait]
impl Provider for Client {
    async fn complete(&self, messages: &[Message], opts: &Options) -> Result<Response, LlmError> {
        self.base.complete(messages, opts, &self.builder).await
    }

    async fn stream(
        &self,
        messages: &[Message],
        opts: &Options,
    ) -> Result<EventStream, LlmError> {
        self.base.stream(messages, opts, &self.builder).await
    }
}
