//! The protocol adapter seam. All vendor knowledge lives behind this trait;
//! the transformer and base client stay dialect-free.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{FinishReason, Message, TokenUsage};

/// Bidirectional translator between the neutral message model and one wire
/// dialect.
///
/// Requests are built as `serde_json::Value` objects (vendor request bodies
/// are open-ended); responses decode once into the adapter's typed
/// [`Self::Response`] record, and every accessor after that reads typed
/// fields.
pub trait ProtocolAdapter: Send + Sync {
    /// Concrete shape of this dialect's completion response.
    type Response: DeserializeOwned + Send;

    /// Translates neutral messages into the dialect's wire message objects.
    ///
    /// System-role messages are skipped here; the transformer owns system
    /// prompt placement.
    fn convert_to_api(&self, messages: &[Message]) -> Vec<Value>;

    /// Extracts the assistant message and the normalized finish reason from a
    /// decoded response. `None` means the vendor reported no reason.
    fn convert_from_api(&self, resp: &Self::Response) -> (Message, Option<FinishReason>);

    /// Extracts token accounting; `None` when the response carries none.
    fn convert_usage(&self, resp: &Self::Response) -> Option<TokenUsage>;

    /// Vendor-reported model identifier, used for response attribution.
    fn response_model(&self, resp: &Self::Response) -> Option<String> {
        let _ = resp;
        None
    }

    /// How this dialect receives the system prompt.
    fn system_message_handling(&self) -> SystemMessageHandling;
}

/// System prompt placement strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMessageHandling {
    /// Prepended to the message array as `{"role": "system", ...}` (OpenAI).
    Inline,
    /// Carried in a dedicated top-level request field (`system` for
    /// Anthropic, `systemInstruction` for Gemini); the request builder sets
    /// it.
    Separate,
}
