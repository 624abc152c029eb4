//! 抽象的 HTTP 传输层，便于在测试中注入 Mock。

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::LlmError;

pub mod reqwest;

/// HTTP 方法枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// HTTP 请求
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    /// Per-request deadline. Sync completions set it; streaming requests
    /// leave it empty so long-lived bodies are not cut off.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// 构建 JSON POST 请求
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(body),
            timeout: None,
        }
    }
}

/// HTTP 响应
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 将响应体转换为 UTF-8 字符串
    pub fn into_string(self) -> Result<String, LlmError> {
        String::from_utf8(self.body)
            .map_err(|err| LlmError::http("response body is not valid UTF-8", Some(err.into())))
    }
}

/// Case-insensitive header lookup.
pub fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Chunked response body used for streaming completions.
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, LlmError>> + Send>>;

/// Response whose body is consumed incrementally.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

/// 抽象的 HTTP 传输层
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends a request and buffers the full response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LlmError>;

    /// Sends a request and hands back the body as a byte stream.
    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LlmError>;
}

/// 线程安全别名
pub type DynHttpTransport = Arc<dyn HttpTransport>;
