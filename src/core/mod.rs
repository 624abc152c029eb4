//! Vendor-free machinery: the protocol adapter seam, the generic message
//! transformer, the SSE parser, the streaming aggregator and the base client.

pub mod client;
pub mod collect;
pub mod protocol;
pub mod sse;
pub mod transformer;

pub use client::{BaseClient, EndpointBuilder, ProviderConfig, ProviderDefaults, RequestBuilder};
pub use collect::{StreamCollector, StreamOutcome};
pub use protocol::{ProtocolAdapter, SystemMessageHandling};
pub use sse::{EventHandler, EventStream, SseParser};
pub use transformer::{resolve_system_prompt, ParsedResponse, Transformer};
