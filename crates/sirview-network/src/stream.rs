//! Live subscription to the simulation stream.
//!
//! The connection is driven by its own task. Every observation is handed to
//! the caller's `emit` callback as a [`StreamEvent`]; the callback returns
//! `false` once nobody is listening, which ends the task. The returned
//! [`Subscription`] owns that task and aborts it on [`Subscription::close`]
//! or drop.

use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use tokio::task::AbortHandle;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use sirview_protocol::{decode_stream_message, truncate_body, ProtocolError, StreamMessage};

use crate::sse::SseDecoder;
use crate::ClientError;

/// Longest single SSE line accepted. Longer lines drop that message only.
const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Observations reported by a live subscription, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The connection was accepted; emitted once, before any message.
    Opened,
    /// One decoded tick.
    Message(StreamMessage),
    /// One payload could not be decoded. The stream continues.
    Rejected(ClientError),
    /// The connection failed. Nothing follows.
    Failed(ClientError),
    /// The server closed the body cleanly. Nothing follows.
    Ended,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Failed(_) | StreamEvent::Ended)
    }
}

/// Handle to a running stream reader. Closing is idempotent and happens on
/// drop.
#[derive(Debug)]
pub struct Subscription {
    task: Option<AbortHandle>,
}

impl Subscription {
    pub(crate) fn new(task: AbortHandle) -> Self {
        Self { task: Some(task) }
    }

    /// Stop the reader. Safe to call repeatedly, and after the stream has
    /// already failed or ended.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Stream subscription closed");
        }
    }

    /// True once closed, or once the reader has run to completion.
    pub fn is_closed(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

pub(crate) struct StreamRequest {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub population_size: u32,
}

/// Body of the reader task.
pub(crate) async fn read_stream<F>(http: reqwest::Client, request: StreamRequest, mut emit: F)
where
    F: FnMut(StreamEvent) -> bool + Send + 'static,
{
    let response = match http
        .get(&request.url)
        .query(&request.query)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, url = %request.url, "Stream connection failed");
            emit(StreamEvent::Failed(ClientError::StreamConnection(e.to_string())));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unavailable>".to_string());
        tracing::warn!(status = status.as_u16(), "Stream endpoint refused connection");
        emit(StreamEvent::Failed(ClientError::StreamConnection(format!(
            "server responded with status {}: {}",
            status.as_u16(),
            truncate_body(&body)
        ))));
        return;
    }

    tracing::info!(url = %request.url, "Stream opened");
    if !emit(StreamEvent::Opened) {
        return;
    }

    let body = Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other)),
    );
    let mut lines = FramedRead::new(
        StreamReader::new(body),
        LinesCodec::new_with_max_length(MAX_LINE_BYTES),
    );
    let mut decoder = SseDecoder::new();

    while let Some(line) = lines.next().await {
        let event = match line {
            Ok(line) => match decoder.push_line(&line) {
                Some(sse) => decode_event(&sse.data, request.population_size),
                None => continue,
            },
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                tracing::warn!(limit = MAX_LINE_BYTES, "Dropping oversized stream line");
                StreamEvent::Rejected(ClientError::MessageParse(ProtocolError::Decode(format!(
                    "line exceeds {MAX_LINE_BYTES} bytes"
                ))))
            }
            Err(LinesCodecError::Io(e)) => {
                tracing::warn!(error = %e, "Stream connection lost");
                emit(StreamEvent::Failed(ClientError::StreamConnection(e.to_string())));
                return;
            }
        };
        if !emit(event) {
            return;
        }
    }

    if let Some(sse) = decoder.finish() {
        if !emit(decode_event(&sse.data, request.population_size)) {
            return;
        }
    }

    tracing::info!("Stream ended by server");
    emit(StreamEvent::Ended);
}

fn decode_event(data: &str, population_size: u32) -> StreamEvent {
    match decode_stream_message(data, population_size) {
        Ok(message) => StreamEvent::Message(message),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode stream message");
            StreamEvent::Rejected(ClientError::MessageParse(e))
        }
    }
}
