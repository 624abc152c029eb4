//! Provider contract and the factory dispatching on [`ProviderType`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Config, ProviderType};
use crate::core::sse::EventStream;
use crate::error::LlmError;
use crate::http::reqwest::default_dyn_transport;
use crate::http::DynHttpTransport;
use crate::types::{Message, Options, Response};

pub mod anthropic;
pub mod gemini;
pub mod openai;

/// Uniform completion interface over every backend.
///
/// Cancellation is Rust-native: dropping the future returned by
/// [`Provider::complete`] aborts the request, dropping an [`EventStream`]
/// cancels its parser task.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Sends the conversation and waits for the complete response.
    async fn complete(&self, messages: &[Message], opts: &Options) -> Result<Response, LlmError>;

    /// Sends the conversation and returns a channel of incremental events.
    async fn stream(&self, messages: &[Message], opts: &Options)
        -> Result<EventStream, LlmError>;

    /// Releases held resources. The default is a no-op; HTTP connection pools
    /// need no explicit shutdown.
    async fn close(&self) -> Result<(), LlmError> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Provider")
    }
}

/// Thread-safe provider handle.
pub type DynProvider = Arc<dyn Provider>;

/// Builds a provider from configuration using the default transport.
pub fn new(config: &Config) -> Result<DynProvider, LlmError> {
    new_with_transport(config, default_dyn_transport()?)
}

/// Builds a provider on an explicit transport (tests inject mocks here).
pub fn new_with_transport(
    config: &Config,
    transport: DynHttpTransport,
) -> Result<DynProvider, LlmError> {
    let ptype = config.provider_type;

    // Vertex AI authenticates through platform credentials, not an API key.
    let vertex_mode =
        ptype == ProviderType::Gemini && config.extra_str("vertex_project").is_some();

    if ptype.requires_api_key() && !vertex_mode && config.resolved().api_key.is_empty() {
        return Err(LlmError::config(format!(
            "API key is required for provider {ptype} (set {} or Config.api_key)",
            ptype.api_key_env()
        )));
    }

    match ptype {
        _ if ptype.is_openai_compatible() => {
            openai::Client::from_config(config, transport).map(|c| Arc::new(c) as DynProvider)
        }
        ProviderType::Anthropic => {
            anthropic::Client::from_config(config, transport).map(|c| Arc::new(c) as DynProvider)
        }
        ProviderType::Gemini => {
            gemini::Client::from_config(config, transport).map(|c| Arc::new(c) as DynProvider)
        }
        ProviderType::Mock => Err(LlmError::config(
            "provider type `mock` is reserved for test harnesses; register a custom Provider implementation instead",
        )),
        other => Err(LlmError::config(format!("unsupported provider type: {other}"))),
    }
}

/// Zero-argument construction: registry defaults plus the tag's environment
/// variables. `None` selects the default tag (`openrouter`).
pub fn from_env(provider_type: Option<ProviderType>) -> Result<DynProvider, LlmError> {
    let config = Config {
        provider_type: provider_type.unwrap_or_default(),
        ..Config::default()
    };
    new(&config)
}

/// Like [`new`] but panics on error. For setup code where a missing provider
/// is unrecoverable anyway.
pub fn must(config: &Config) -> DynProvider {
    match new(config) {
        Ok(provider) => provider,
        Err(err) => panic!("failed to build provider: {err}"),
    }
}
