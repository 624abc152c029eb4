//! Client for the Anthropic Messages API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{ProviderType, DEFAULT_TIMEOUT};
use crate::core::client::{BaseClient, EndpointBuilder, ProviderConfig, ProviderDefaults};
use crate::core::sse::EventStream;
use crate::error::LlmError;
use crate::http::reqwest::default_dyn_transport;
use crate::http::DynHttpTransport;
use crate::provider::Provider;
use crate::types::{Message, Options, Response};

use super::adapter::AnthropicAdapter;
use super::events::AnthropicEventHandler;
use super::request::AnthropicRequestBuilder;

const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic backend.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_key: String,
    /// Empty means `https://api.anthropic.com/v1`.
    pub base_url: String,
    /// Empty means the registry default model.
    pub model: String,
    pub timeout: Option<Duration>,
    /// 额外的请求头
    pub headers: HashMap<String, String>,
    /// `anthropic-version` header; empty means `2023-06-01`.
    pub version: String,
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
        if self.api_key.is_empty() {
            return Err(LlmError::config("API key is required for provider anthropic"));
        }
        Ok(())
    }

    fn defaults(&self) -> ProviderDefaults {
        let base_url = if self.base_url.is_empty() {
            ProviderType::Anthropic.default_base_url().to_string()
        } else {
            self.base_url.clone()
        };
        let model = if self.model.is_empty() {
            ProviderType::Anthropic.default_model().to_string()
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
        let version = if self.version.is_empty() {
            DEFAULT_API_VERSION.to_string()
        } else {
            self.version.clone()
        };
        let mut headers = HashMap::from([
            ("X-Api-Key".to_string(), self.api_key.clone()),
            ("anthropic-version".to_string(), version),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]);
        headers.extend(self.headers.clone());
        headers
    }

    fn provider_name(&self) -> &'static str {
        ProviderType::Anthropic.as_str()
    }
}

/// Fixed `/messages` path for both modes.
struct MessagesEndpoint;

impl EndpointBuilder for MessagesEndpoint {
    fn complete_endpoint(&self) -> String {
        "/messages".to_string()
    }

    fn stream_endpoint(&self) -> String {
        "/messages".to_string()
    }
}

/// Anthropic Messages client.
pub struct Client {
    base: BaseClient<AnthropicAdapter, AnthropicEventHandler>,
    builder: AnthropicRequestBuilder,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, LlmError> {
        Self::with_transport(config, default_dyn_transport()?)
    }

    pub fn with_transport(config: Config, transport: DynHttpTransport) -> Result<Self, LlmError> {
        let base = BaseClient::new(&config, AnthropicAdapter, AnthropicEventHandler, transport)?
            .with_endpoint_builder(MessagesEndpoint);
        let builder = AnthropicRequestBuilder::new(base.model());
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
                version: String::new(),
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
