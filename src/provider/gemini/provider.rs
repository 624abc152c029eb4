//! Client for the Gemini API, key-authenticated or Vertex AI.

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

use super::adapter::GeminiAdapter;
use super::events::GeminiEventHandler;
use super::request::GeminiRequestBuilder;

const DEFAULT_VERTEX_LOCATION: &str = "us-central1";

/// Configuration for the Gemini backend.
///
/// Setting `vertex_project` switches to Vertex AI mode: endpoints take the
/// publisher-model shape and no API key is required (platform credentials
/// authenticate the transport instead).
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_key: String,
    /// Empty means the mode's default host.
    pub base_url: String,
    /// Empty means the registry default model.
    pub model: String,
    pub timeout: Option<Duration>,
    /// 额外的请求头
    pub headers: HashMap<String, String>,
    pub vertex_project: Option<String>,
    pub vertex_location: Option<String>,
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    fn vertex_mode(&self) -> bool {
        self.vertex_project.is_some()
    }

    fn location(&self) -> &str {
        self.vertex_location
            .as_deref()
            .filter(|location| !location.is_empty())
            .unwrap_or(DEFAULT_VERTEX_LOCATION)
    }
}

impl ProviderConfig for Config {
    fn validate(&self) -> Result<(), LlmError> {
        if !self.vertex_mode() && self.api_key.is_empty() {
            return Err(LlmError::config(
                "API key is required for the Gemini API backend",
            ));
        }
        Ok(())
    }

    fn defaults(&self) -> ProviderDefaults {
        let base_url = if !self.base_url.is_empty() {
            self.base_url.clone()
        } else if self.vertex_mode() {
            format!("https://{}-aiplatform.googleapis.com/v1", self.location())
        } else {
            ProviderType::Gemini.default_base_url().to_string()
        };
        let model = if self.model.is_empty() {
            ProviderType::Gemini.default_model().to_string()
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
        // Key auth travels in the URL, not a header.
        let mut headers = HashMap::from([(
            "Content-Type".to_string(),
            "application/json".to_string(),
        )]);
        headers.extend(self.headers.clone());
        headers
    }

    fn provider_name(&self) -> &'static str {
        ProviderType::Gemini.as_str()
    }
}

/// Endpoint synthesis: the path depends on model, mode and streaming.
struct GeminiEndpoint {
    model: String,
    api_key: String,
    vertex: Option<(String, String)>,
}

impl GeminiEndpoint {
    fn action(&self, stream: bool) -> &'static str {
        if stream {
            "streamGenerateContent"
        } else {
            "generateContent"
        }
    }

    fn endpoint(&self, stream: bool) -> String {
        let action = self.action(stream);
        // `alt=sse` is required for event-stream framing; without it the API
        // answers with a JSON array.
        match &self.vertex {
            Some((project, location)) => {
                let mut url = format!(
                    "/projects/{project}/locations/{location}/publishers/google/models/{}:{action}",
                    self.model
                );
                if stream {
                    url.push_str("?alt=sse");
                }
                url
            }
            None => {
                if stream {
                    format!(
                        "/models/{}:{action}?alt=sse&key={}",
                        self.model, self.api_key
                    )
                } else {
                    format!("/models/{}:{action}?key={}", self.model, self.api_key)
                }
            }
        }
    }
}

impl EndpointBuilder for GeminiEndpoint {
    fn complete_endpoint(&self) -> String {
        self.endpoint(false)
    }

    fn stream_endpoint(&self) -> String {
        self.endpoint(true)
    }
}

/// Gemini GenerateContent client.
pub struct Client {
    base: BaseClient<GeminiAdapter, GeminiEventHandler>,
    builder: GeminiRequestBuilder,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, LlmError> {
        Self::with_transport(config, default_dyn_transport()?)
    }

    pub fn with_transport(config: Config, transport: DynHttpTransport) -> Result<Self, LlmError> {
        let vertex = config
            .vertex_project
            .clone()
            .map(|project| (project, config.location().to_string()));
        let api_key = config.api_key.clone();

        let base =
            BaseClient::new(&config, GeminiAdapter::new(), GeminiEventHandler::new(), transport)?;
        let endpoint = GeminiEndpoint {
            model: base.model().to_string(),
            api_key,
            vertex,
        };
        let builder = GeminiRequestBuilder::new(base.model());
        let base = base.with_endpoint_builder(endpoint);
        Ok(Self { base, builder })
    }

    pub(crate) fn from_config(
        config: &crate::config::Config,
        transport: DynHttpTransport,
    ) -> Result<Self, LlmError> {
        let resolved = config.resolved();
        // Registry fallback must not apply here: with no explicit base URL the
        // provider picks its own per-mode host (Vertex uses a regional one).
        let base_url = config
            .base_url
            .clone()
            .or_else(|| std::env::var(ProviderType::Gemini.base_url_env()).ok())
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_default();
        Self::with_transport(
            Config {
                api_key: resolved.api_key,
                base_url,
                model: resolved.model,
                timeout: Some(resolved.timeout),
                headers: config.extra_headers(),
                vertex_project: config.extra_str("vertex_project").map(str::to_string),
                vertex_location: config.extra_str("vertex_location").map(str::to_string),
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
