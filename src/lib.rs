//! LLM 多厂商统一客户端库
//!
//! One vendor-neutral message model, three wire dialects. The OpenAI-compatible
//! dialect covers OpenRouter, DeepSeek, Ollama, Azure, GLM, Doubao, Moonshot,
//! Groq and Mistral in addition to OpenAI itself; Anthropic and Gemini get
//! dedicated protocol adapters. Sync completion, token-by-token streaming,
//! tool use and reasoning tokens all go through the same [`Provider`] trait.

pub mod config;
pub mod core;
pub mod error;
pub mod http;
pub mod provider;
pub mod types;

pub use crate::config::{Config, ProviderType};
pub use crate::core::collect::{StreamCollector, StreamOutcome};
pub use crate::core::sse::EventStream;
pub use crate::error::LlmError;
pub use crate::provider::{DynProvider, Provider};
pub use crate::types::*;
