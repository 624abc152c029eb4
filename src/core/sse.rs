//! Generic server-sent-events parsing.
//!
//! The parser owns the line scanning (`event:` / `data:` framing) and the
//! event channel; per-dialect frame semantics live behind [`EventHandler`].
//! One streaming request runs exactly two tasks: the caller draining an
//! [`EventStream`] and the parser task feeding it through a bounded channel.

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::http::HttpBodyStream;
use crate::types::{Event, FinishReason};

/// Bound of the event channel. Combined with task cancellation on receiver
/// drop this keeps an abandoned stream from buffering unboundedly.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 10;

/// Per-dialect interpretation of one decoded SSE frame.
///
/// Handlers are cloned per streaming request, so implementations may carry
/// per-stream state (the Gemini handler keeps its synthetic-id counter here).
pub trait EventHandler: Send + Sync {
    /// Converts one frame into zero or more neutral events.
    ///
    /// `event_type` is the value of the preceding `event:` line (empty for
    /// dialects that only send `data:` lines). Returning `true` in the second
    /// slot stops the parser after the produced events are delivered.
    fn handle_event(&self, event_type: &str, data: Value) -> (Vec<Event>, bool);

    /// Checked against the raw payload before JSON decoding; a `true` return
    /// emits `done(stop)` and ends the stream (the OpenAI `[DONE]` sentinel).
    fn should_stop_on_data(&self, data: &str) -> bool {
        let _ = data;
        false
    }
}

/// Receiving side of one streaming completion.
///
/// Dropping the stream cancels the request: the parser task notices the
/// closed channel on its next send and stops reading the network body.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn channel() -> (mpsc::Sender<Event>, EventStream) {
        let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        (sender, EventStream { receiver })
    }

    /// Next event, or `None` once the stream is closed.
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

impl futures_core::Stream for EventStream {
    type Item = Event;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Event>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

enum LineFlow {
    Continue,
    Stop,
}

/// Line-oriented SSE scanner delegating frame semantics to an
/// [`EventHandler`].
#[derive(Debug, Clone)]
pub struct SseParser<H> {
    handler: H,
}

impl<H: EventHandler> SseParser<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Consumes the body until the handler stops, the body ends, or the
    /// receiver goes away. The channel closes exactly once, when the sender
    /// drops on return.
    pub async fn parse(&self, mut body: HttpBodyStream, events: mpsc::Sender<Event>) {
        let mut buffer: Vec<u8> = Vec::new();
        let mut current_event = String::new();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(err) => {
                    // A failed read is the one condition surfaced on the
                    // channel; plain EOF closes silently.
                    let _ = events
                        .send(Event::Error {
                            message: err.to_string(),
                        })
                        .await;
                    return;
                }
            };

            buffer.extend_from_slice(&bytes);
            while let Some(line) = drain_line(&mut buffer) {
                match self.handle_line(&line, &mut current_event, &events).await {
                    LineFlow::Continue => {}
                    LineFlow::Stop => return,
                }
            }
        }

        // A final line without a trailing newline still counts.
        if !buffer.is_empty() {
            let line = std::mem::take(&mut buffer);
            let _ = self.handle_line(&line, &mut current_event, &events).await;
        }
    }

    async fn handle_line(
        &self,
        line: &[u8],
        current_event: &mut String,
        events: &mpsc::Sender<Event>,
    ) -> LineFlow {
        let Ok(line) = std::str::from_utf8(line) else {
            tracing::debug!("skipping non-UTF-8 SSE line");
            return LineFlow::Continue;
        };

        if let Some(name) = line.strip_prefix("event:") {
            *current_event = name.trim().to_string();
            return LineFlow::Continue;
        }

        // Comments, `id:`, `retry:` and blank lines carry no payload.
        let Some(payload) = line.strip_prefix("data:") else {
            return LineFlow::Continue;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);

        if self.handler.should_stop_on_data(payload) {
            let _ = events.send(Event::done(FinishReason::Stop)).await;
            return LineFlow::Stop;
        }

        let decoded: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(err) => {
                // A vendor emitting one stray line must not kill the
                // connection; skipped frames only show up in diagnostics.
                tracing::debug!(error = %err, "skipping malformed SSE frame");
                return LineFlow::Continue;
            }
        };

        let (parsed, stop) = self.handler.handle_event(current_event, decoded);
        for event in parsed {
            if events.send(event).await.is_err() {
                // Receiver dropped: the caller cancelled.
                return LineFlow::Stop;
            }
        }

        if stop {
            LineFlow::Stop
        } else {
            LineFlow::Continue
        }
    }
}

fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    buffer.iter().position(|b| *b == b'\n').map(|pos| {
        let mut line: Vec<u8> = buffer.drain(..=pos).collect();
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        line
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use futures_util::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn body_from(chunks: Vec<&[u8]>) -> HttpBodyStream {
        let owned: Vec<Result<Vec<u8>, LlmError>> =
            chunks.into_iter().map(|c| Ok(c.to_vec())).collect();
        Box::pin(stream::iter(owned))
    }

    /// Emits one text event per frame carrying a `text` field and records
    /// the event types it saw.
    #[derive(Clone, Default)]
    struct RecordingHandler {
        seen_types: Arc<std::sync::Mutex<Vec<String>>>,
        frames: Arc<AtomicUsize>,
    }

    impl EventHandler for RecordingHandler {
        fn handle_event(&self, event_type: &str, data: Value) -> (Vec<Event>, bool) {
            self.frames.fetch_add(1, Ordering::SeqCst);
            self.seen_types
                .lock()
                .expect("lock")
                .push(event_type.to_string());
            let mut events = Vec::new();
            if let Some(text) = data.get("text").and_then(Value::as_str) {
                events.push(Event::text(text));
            }
            let stop = data.get("stop").and_then(Value::as_bool).unwrap_or(false);
            (events, stop)
        }

        fn should_stop_on_data(&self, data: &str) -> bool {
            data == "[DONE]"
        }
    }

    async fn run(parser: SseParser<RecordingHandler>, body: HttpBodyStream) -> Vec<Event> {
        let (tx, mut stream) = EventStream::channel();
        let task = tokio::spawn(async move { parser.parse(body, tx).await });
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        task.await.expect("parser task");
        events
    }

    #[tokio::test]
    async fn data_lines_flow_through_the_handler() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![b"data: {\"text\":\"hel\"}\n\ndata: {\"text\":\"lo\"}\n\n"]);

        let events = run(parser, body).await;
        assert_eq!(events, vec![Event::text("hel"), Event::text("lo")]);
        assert_eq!(handler.frames.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn event_lines_set_the_type_for_following_data() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![
            b"event: message_start\ndata: {}\n",
            b"event: content_block_delta\ndata: {\"text\":\"x\"}\n",
        ]);

        run(parser, body).await;
        let seen = handler.seen_types.lock().expect("lock").clone();
        assert_eq!(seen, vec!["message_start", "content_block_delta"]);
    }

    #[tokio::test]
    async fn done_sentinel_emits_stop_and_closes() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![
            b"data: {\"text\":\"a\"}\n",
            b"data: [DONE]\n",
            b"data: {\"text\":\"never\"}\n",
        ]);

        let events = run(parser, body).await;
        assert_eq!(
            events,
            vec![Event::text("a"), Event::done(FinishReason::Stop)]
        );
        assert_eq!(
            handler.frames.load(Ordering::SeqCst),
            1,
            "nothing after the sentinel reaches the handler"
        );
    }

    #[tokio::test]
    async fn malformed_json_is_skipped_silently() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![
            b"data: {not json}\n",
            b"data: {\"text\":\"fine\"}\n",
        ]);

        let events = run(parser, body).await;
        assert_eq!(events, vec![Event::text("fine")]);
    }

    #[tokio::test]
    async fn comments_ids_and_retries_are_ignored() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![
            b": keep-alive\nid: 7\nretry: 250\n\ndata: {\"text\":\"ok\"}\n",
        ]);

        let events = run(parser, body).await;
        assert_eq!(events, vec![Event::text("ok")]);
    }

    #[tokio::test]
    async fn handler_stop_ends_the_stream() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![
            b"data: {\"text\":\"last\",\"stop\":true}\n",
            b"data: {\"text\":\"never\"}\n",
        ]);

        let events = run(parser, body).await;
        assert_eq!(events, vec![Event::text("last")]);
        assert_eq!(handler.frames.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_errors_surface_as_one_error_event() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler);
        let chunks: Vec<Result<Vec<u8>, LlmError>> = vec![
            Ok(b"data: {\"text\":\"a\"}\n".to_vec()),
            Err(LlmError::stream("connection reset", None)),
        ];
        let body: HttpBodyStream = Box::pin(stream::iter(chunks));

        let (tx, mut stream) = EventStream::channel();
        let task = tokio::spawn(async move { parser.parse(body, tx).await });
        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event);
        }
        task.await.expect("parser task");

        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Event::Error { .. }));
    }

    #[tokio::test]
    async fn crlf_lines_and_split_chunks_reassemble() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![b"data: {\"te", b"xt\":\"joined\"}\r\n"]);

        let events = run(parser, body).await;
        assert_eq!(events, vec![Event::text("joined")]);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_processed_at_eof() {
        let handler = RecordingHandler::default();
        let parser = SseParser::new(handler.clone());
        let body = body_from(vec![b"data: {\"text\":\"tail\"}"]);

        let events = run(parser, body).await;
        assert_eq!(events, vec![Event::text("tail")]);
    }
}
