//! Shared test transport: replays canned bodies or SSE scripts and captures
//! every wire request for assertion.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;
use tsunagi_llm::error::LlmError;
use tsunagi_llm::http::{
    HttpBodyStream, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport,
};

#[derive(Default)]
pub struct MockTransport {
    sync_responses: Mutex<VecDeque<HttpResponse>>,
    stream_responses: Mutex<VecDeque<(u16, Vec<Vec<u8>>)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a JSON body for the next sync request.
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_response(HttpResponse {
            status,
            headers: HashMap::new(),
            body: body.to_string().into_bytes(),
        });
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.sync_responses
            .lock()
            .expect("lock")
            .push_back(response);
    }

    /// Queues an SSE script for the next streaming request; each entry
    /// becomes one network chunk.
    pub fn push_sse(&self, status: u16, chunks: &[&str]) {
        self.stream_responses.lock().expect("lock").push_back((
            status,
            chunks.iter().map(|chunk| chunk.as_bytes().to_vec()).collect(),
        ));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock").clone()
    }

    /// JSON body of the most recent request.
    pub fn last_body(&self) -> Value {
        let requests = self.requests.lock().expect("lock");
        let request = requests.last().expect("at least one request captured");
        let body = request.body.as_deref().expect("request body");
        serde_json::from_slice(body).expect("request body is JSON")
    }

    pub fn last_url(&self) -> String {
        let requests = self.requests.lock().expect("lock");
        requests.last().expect("at least one request").url.clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LlmError> {
        self.requests.lock().expect("lock").push(request);
        self.sync_responses
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or_else(|| LlmError::http("mock transport has no queued response", None))
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LlmError> {
        self.requests.lock().expect("lock").push(request);
        let (status, chunks) = self
            .stream_responses
            .lock()
            .expect("lock")
            .pop_front()
            .ok_or_else(|| LlmError::http("mock transport has no queued stream", None))?;

        let items: Vec<Result<Vec<u8>, LlmError>> = chunks.into_iter().map(Ok).collect();
        let body: HttpBodyStream = Box::pin(stream::iter(items));
        Ok(HttpStreamResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    }
}
