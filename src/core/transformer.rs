//! Generic message-array construction and response parsing. Every vendor
//! difference is expressed through the [`ProtocolAdapter`]; this module
//! contains no dialect conditionals.

use serde_json::{json, Value};

use crate::error::LlmError;
use crate::types::{FinishReason, Message, Role, TokenUsage};

use super::protocol::{ProtocolAdapter, SystemMessageHandling};

/// Result of parsing one complete response body.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub message: Message,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<TokenUsage>,
    /// Vendor-reported model, when the response names one.
    pub model: Option<String>,
}

/// Orchestrates translation through a [`ProtocolAdapter`].
#[derive(Debug, Clone)]
pub struct Transformer<A> {
    adapter: A,
}

impl<A: ProtocolAdapter> Transformer<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Builds the wire message array.
    ///
    /// System-role messages in the input are dropped: a stale inline system
    /// prompt is superseded by the explicit `system_prompt` argument. For
    /// [`SystemMessageHandling::Inline`] dialects the prompt is prepended as a
    /// wire message; for `Separate` dialects the request builder places it in
    /// the dialect's top-level field instead.
    pub fn build_api_messages(&self, messages: &[Message], system_prompt: &str) -> Vec<Value> {
        let kept: Vec<Message> = messages
            .iter()
            .filter(|msg| msg.role != Role::System)
            .cloned()
            .collect();

        let mut wire = self.adapter.convert_to_api(&kept);

        if !system_prompt.is_empty()
            && self.adapter.system_message_handling() == SystemMessageHandling::Inline
        {
            wire.insert(0, json!({"role": "system", "content": system_prompt}));
        }

        wire
    }

    /// Decodes a complete response body once into the adapter's typed record
    /// and chains the adapter's extraction operations.
    pub fn parse_api_response(&self, body: &str) -> Result<ParsedResponse, LlmError> {
        let resp: A::Response = serde_json::from_str(body)
            .map_err(|err| LlmError::response("failed to decode response body", err))?;

        let (message, finish_reason) = self.adapter.convert_from_api(&resp);
        let usage = self.adapter.convert_usage(&resp);
        let model = self.adapter.response_model(&resp);

        Ok(ParsedResponse {
            message,
            finish_reason,
            usage,
            model,
        })
    }
}

/// System prompt effective for one request: the explicit option wins,
/// otherwise the first system-role message in the input supplies it.
pub fn resolve_system_prompt(messages: &[Message], opts: &crate::types::Options) -> String {
    if !opts.system.is_empty() {
        return opts.system.clone();
    }
    messages
        .iter()
        .find(|msg| msg.role == Role::System)
        .map(|msg| msg.text().to_string())
        .unwrap_or_default()
}
