//! OpenAI chat-completions dialect, shared by the ten compatible backends
//! (OpenAI, OpenRouter, DeepSeek, Ollama, Azure, GLM, Doubao, Moonshot,
//! Groq, Mistral).

mod adapter;
mod events;
mod provider;
mod request;
mod types;

pub use adapter::OpenAiAdapter;
pub use events::OpenAiEventHandler;
pub use provider::{Client, Config};
pub use request::OpenAiRequestBuilder;
