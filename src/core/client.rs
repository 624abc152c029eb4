//! Generic request orchestration shared by every provider.
//!
//! A provider contributes four plug-ins: a [`ProviderConfig`] (validation,
//! defaults, auth headers), a [`RequestBuilder`] (wire request body), the
//! protocol adapter / event handler pair, and optionally an
//! [`EndpointBuilder`] for dialects whose URL depends on model or deployment.
//! Everything else (POST, status classification, response parsing, stream
//! plumbing) lives here once.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;

use crate::error::{ApiError, LlmError};
use crate::http::{header_value, DynHttpTransport, HttpBodyStream, HttpRequest};
use crate::types::{Message, Options, Response};

use super::protocol::ProtocolAdapter;
use super::sse::{EventHandler, EventStream, SseParser};
use super::transformer::Transformer;

/// Fixed path used when no [`EndpointBuilder`] is installed.
const DEFAULT_COMPLETION_PATH: &str = "/chat/completions";

/// Values a provider config resolves to at construction time.
#[derive(Debug, Clone)]
pub struct ProviderDefaults {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Provider-specific configuration surface.
pub trait ProviderConfig {
    /// Rejects unusable configurations (missing credentials and the like).
    fn validate(&self) -> Result<(), LlmError>;

    /// Resolved base URL, model and timeout.
    fn defaults(&self) -> ProviderDefaults;

    /// Auth and content headers attached to every request.
    fn build_headers(&self) -> HashMap<String, String>;

    /// Provider tag used in error reporting.
    fn provider_name(&self) -> &'static str;
}

/// Builds the dialect-specific request body.
pub trait RequestBuilder: Send + Sync {
    fn build_request(
        &self,
        messages: &[Message],
        opts: &Options,
        stream: bool,
    ) -> Result<Value, LlmError>;
}

/// Synthesizes endpoints for dialects whose path depends on model, project or
/// stream mode (Gemini, Vertex).
pub trait EndpointBuilder: Send + Sync {
    fn complete_endpoint(&self) -> String;
    fn stream_endpoint(&self) -> String;
}

/// Generic completion client.
///
/// Immutable after construction; safe to share across tasks.
pub struct BaseClient<A, H> {
    transport: DynHttpTransport,
    transformer: Transformer<A>,
    handler: H,
    provider_name: &'static str,
    base_url: String,
    model: String,
    timeout: Duration,
    headers: HashMap<String, String>,
    endpoint_builder: Option<Box<dyn EndpointBuilder>>,
}

impl<A, H> BaseClient<A, H>
where
    A: ProtocolAdapter,
    H: EventHandler + Clone + Send + Sync + 'static,
{
    pub fn new(
        config: &dyn ProviderConfig,
        adapter: A,
        handler: H,
        transport: DynHttpTransport,
    ) -> Result<Self, LlmError> {
        config.validate()?;
        let defaults = config.defaults();
        Ok(Self {
            transport,
            transformer: Transformer::new(adapter),
            handler,
            provider_name: config.provider_name(),
            base_url: defaults.base_url,
            model: defaults.model,
            timeout: defaults.timeout,
            headers: config.build_headers(),
            endpoint_builder: None,
        })
    }

    pub fn with_endpoint_builder(mut self, builder: impl EndpointBuilder + 'static) -> Self {
        self.endpoint_builder = Some(Box::new(builder));
        self
    }

    pub fn transformer(&self) -> &Transformer<A> {
        &self.transformer
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sync completion: build, POST, classify, parse.
    pub async fn complete(
        &self,
        messages: &[Message],
        opts: &Options,
        builder: &dyn RequestBuilder,
    ) -> Result<Response, LlmError> {
        let body = builder.build_request(messages, opts, false)?;
        let payload =
            serde_json::to_vec(&body).map_err(|err| LlmError::request("serialize", err))?;

        let url = self.endpoint_url(&self.complete_path());
        tracing::debug!(provider = self.provider_name, url = %url, "completion request");

        let mut request = HttpRequest::post_json(url, payload);
        request.headers.extend(self.headers.clone());
        request.timeout = Some(self.timeout);

        let response = self.transport.send(request).await?;
        if response.status >= 400 {
            let status = response.status;
            let headers = response.headers.clone();
            let body_text = String::from_utf8_lossy(&response.body).into_owned();
            return Err(self.api_error(status, &headers, body_text).into());
        }

        let text = response.into_string()?;
        let parsed = self.transformer.parse_api_response(&text)?;

        let model = parsed
            .model
            .filter(|model| !model.is_empty())
            .unwrap_or_else(|| self.model.clone());

        Ok(Response {
            message: parsed.message,
            finish_reason: parsed.finish_reason,
            model,
            usage: parsed.usage,
        })
    }

    /// Streaming completion: same prologue with `stream=true`, then one
    /// spawned parser task feeding the bounded event channel.
    ///
    /// The request deadline only covers connection establishment (via the
    /// transport); the stream body has none. Dropping the returned
    /// [`EventStream`] cancels the parser task through channel closure.
    pub async fn stream(
        &self,
        messages: &[Message],
        opts: &Options,
        builder: &dyn RequestBuilder,
    ) -> Result<EventStream, LlmError> {
        let body = builder.build_request(messages, opts, true)?;
        let payload =
            serde_json::to_vec(&body).map_err(|err| LlmError::request("serialize", err))?;

        let url = self.endpoint_url(&self.stream_path());
        tracing::debug!(provider = self.provider_name, url = %url, "streaming request");

        let mut request = HttpRequest::post_json(url, payload);
        request.headers.extend(self.headers.clone());

        let response = self.transport.send_stream(request).await?;
        if response.status >= 400 {
            let text = drain_body(response.body).await;
            return Err(self.api_error(response.status, &response.headers, text).into());
        }

        let (sender, stream) = EventStream::channel();
        let parser = SseParser::new(self.handler.clone());
        let body = response.body;
        tokio::spawn(async move {
            parser.parse(body, sender).await;
        });

        Ok(stream)
    }

    fn api_error(
        &self,
        status: u16,
        headers: &HashMap<String, String>,
        body: String,
    ) -> ApiError {
        let mut error = ApiError::new(status, body).with_provider(self.provider_name);
        if let Some(request_id) = header_value(headers, "x-request-id") {
            error = error.with_request_id(request_id);
        }
        error
    }

    fn complete_path(&self) -> String {
        self.endpoint_builder
            .as_ref()
            .map(|builder| builder.complete_endpoint())
            .unwrap_or_else(|| DEFAULT_COMPLETION_PATH.to_string())
    }

    fn stream_path(&self) -> String {
        self.endpoint_builder
            .as_ref()
            .map(|builder| builder.stream_endpoint())
            .unwrap_or_else(|| DEFAULT_COMPLETION_PATH.to_string())
    }

    fn endpoint_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Best-effort drain of an error body so status failures carry their payload.
async fn drain_body(mut body: HttpBodyStream) -> String {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(part) => bytes.extend_from_slice(&part),
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
