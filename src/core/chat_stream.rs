use std::error::Error as StdError;
use std::fmt;

use futures_util::{Stream, StreamExt};
use memchr::memchr;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::api::ChatRequest;
use crate::utils::routing::Route;

/// Receives updates while a reply is decoded.
pub trait StreamHandler {
    /// Called after every delta with the full text accumulated so far.
    fn on_partial(&mut self, text: &str);
    /// Called exactly once with the final text.
    fn on_complete(&mut self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// Reading the body failed before the reply finished. `partial` holds the
    /// text decoded up to that point.
    Interrupted { reason: String, partial: String },
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Interrupted { reason, partial } => write!(
                f,
                "stream interrupted after {} characters: {}",
                partial.chars().count(),
                reason
            ),
        }
    }
}

impl StdError for StreamError {}

/// One decoded event record.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Record {
    delta: Option<String>,
    done: bool,
}

fn extract_data_payload(line: &str) -> &str {
    line.strip_prefix("data:").map(str::trim_start).unwrap_or(line)
}

fn is_sse_metadata(line: &str) -> bool {
    line.starts_with(':')
        || line.starts_with("event:")
        || line.starts_with("id:")
        || line.starts_with("retry:")
}

fn extract_delta(value: &Value) -> Option<&str> {
    value
        .get("delta")
        .and_then(Value::as_str)
        .or_else(|| value.pointer("/delta/text").and_then(Value::as_str))
        .or_else(|| {
            value
                .pointer("/choices/0/delta/content")
                .and_then(Value::as_str)
        })
        .or_else(|| {
            value
                .pointer("/candidates/0/content/parts/0/text")
                .and_then(Value::as_str)
        })
}

fn is_terminal(value: &Value) -> bool {
    value.get("done").and_then(Value::as_bool) == Some(true)
        || value.get("type").and_then(Value::as_str) == Some("message_stop")
        || value
            .pointer("/choices/0/finish_reason")
            .is_some_and(|reason| !reason.is_null())
        || value
            .pointer("/candidates/0/finishReason")
            .is_some_and(|reason| !reason.is_null())
}

/// Parse a single line. Returns `None` for blank, malformed, or
/// unrecognized records.
fn parse_record(line: &str) -> Option<Record> {
    let line = line.trim();
    if line.is_empty() || is_sse_metadata(line) {
        return None;
    }

    let payload = extract_data_payload(line);
    if payload == "[DONE]" {
        return Some(Record {
            delta: None,
            done: true,
        });
    }

    let value: Value = serde_json::from_str(payload).ok()?;
    let record = Record {
        delta: extract_delta(&value)
            .filter(|delta| !delta.is_empty())
            .map(str::to_owned),
        done: is_terminal(&value),
    };

    (record.delta.is_some() || record.done).then_some(record)
}

/// Incremental decoder for newline-delimited event records.
///
/// Raw chunks are buffered until a full line is available, so records split
/// across chunk boundaries are reassembled before parsing.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    text: String,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Feed a raw chunk. Returns true once a terminal record has been seen;
    /// later chunks are ignored.
    pub fn push<H>(&mut self, chunk: &[u8], handler: &mut H) -> bool
    where
        H: StreamHandler + ?Sized,
    {
        if self.finished {
            return true;
        }

        self.buffer.extend_from_slice(chunk);

        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if self.process_line(&line[..newline_pos], handler) {
                self.buffer.clear();
                return true;
            }
        }

        false
    }

    /// The body ended. Any unterminated trailing record is parsed and the
    /// completion callback fires if it has not already.
    pub fn finish<H>(&mut self, handler: &mut H)
    where
        H: StreamHandler + ?Sized,
    {
        if self.finished {
            return;
        }

        let rest = std::mem::take(&mut self.buffer);
        if !rest.is_empty() && self.process_line(&rest, handler) {
            return;
        }

        self.finished = true;
        handler.on_complete(&self.text);
    }

    fn process_line<H>(&mut self, bytes: &[u8], handler: &mut H) -> bool
    where
        H: StreamHandler + ?Sized,
    {
        let line = match std::str::from_utf8(bytes) {
            Ok(line) => line,
            Err(err) => {
                trace!("skipping record with invalid UTF-8: {err}");
                return false;
            }
        };

        let Some(record) = parse_record(line) else {
            if !line.trim().is_empty() {
                trace!(record = line, "skipping unrecognized record");
            }
            return false;
        };

        if let Some(delta) = record.delta {
            self.text.push_str(&delta);
            handler.on_partial(&self.text);
        }

        if record.done {
            self.finished = true;
            handler.on_complete(&self.text);
        }

        record.done
    }
}

/// Drive `stream` to completion, reporting cumulative text to `handler`.
///
/// On success the final text is returned after `on_complete` has fired. A
/// failed read returns [`StreamError::Interrupted`] without calling
/// `on_complete`.
pub async fn consume_stream<S, B, E, H>(stream: S, handler: &mut H) -> Result<String, StreamError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: fmt::Display,
    H: StreamHandler + ?Sized,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = StreamDecoder::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                if decoder.push(bytes.as_ref(), handler) {
                    return Ok(decoder.into_text());
                }
            }
            Err(err) => {
                return Err(StreamError::Interrupted {
                    reason: err.to_string(),
                    partial: decoder.into_text(),
                });
            }
        }
    }

    decoder.finish(handler);
    Ok(decoder.into_text())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// The endpoint answered with a success status.
    Accepted,
    /// Cumulative reply text so far.
    Partial(String),
    /// Final reply text.
    Complete(String),
    /// Network error or non-success status.
    RequestFailed(String),
    /// The body broke off mid-reply.
    Interrupted { reason: String, partial: String },
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub route: Route,
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

struct ChannelHandler<'a> {
    tx: &'a mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
}

impl StreamHandler for ChannelHandler<'_> {
    fn on_partial(&mut self, text: &str) {
        let _ = self
            .tx
            .send((StreamMessage::Partial(text.to_string()), self.stream_id));
    }

    fn on_complete(&mut self, text: &str) {
        let _ = self
            .tx
            .send((StreamMessage::Complete(text.to_string()), self.stream_id));
    }
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Issue the request on a background task. Every message is tagged with
    /// `stream_id`; nothing more is sent once the token is cancelled.
    pub fn spawn_stream(&self, params: StreamParams) -> tokio::task::JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                route,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = run_stream(client, route, request, stream_id, &tx) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "stream cancelled");
                }
            }
        })
    }
}

async fn run_stream(
    client: reqwest::Client,
    route: Route,
    request: ChatRequest,
    stream_id: u64,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
) {
    debug!(
        stream_id,
        url = %route.url,
        messages = request.messages.len(),
        "posting chat request"
    );

    let http_request = route
        .apply_headers(client.post(&route.url))
        .header(CONTENT_TYPE, "application/json")
        .json(&request);

    let response = match http_request.send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(stream_id, "chat request failed: {err}");
            let _ = tx.send((StreamMessage::RequestFailed(err.to_string()), stream_id));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(stream_id, %status, "chat endpoint returned an error status");
        let _ = tx.send((
            StreamMessage::RequestFailed(format!("API request failed: {status}")),
            stream_id,
        ));
        return;
    }

    let _ = tx.send((StreamMessage::Accepted, stream_id));

    let mut handler = ChannelHandler { tx, stream_id };
    match consume_stream(response.bytes_stream(), &mut handler).await {
        Ok(text) => debug!(stream_id, chars = text.chars().count(), "stream complete"),
        Err(StreamError::Interrupted { reason, partial }) => {
            let _ = tx.send((StreamMessage::Interrupted { reason, partial }, stream_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[derive(Default)]
    struct Recorder {
        partials: Vec<String>,
        completions: Vec<String>,
    }

    impl StreamHandler for Recorder {
        fn on_partial(&mut self, text: &str) {
            self.partials.push(text.to_string());
        }

        fn on_complete(&mut self, text: &str) {
            self.completions.push(text.to_string());
        }
    }

    fn chunks(parts: &[&'static str]) -> impl Stream<Item = Result<&'static str, String>> {
        stream::iter(parts.iter().map(|part| Ok(*part)).collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn partial_updates_are_cumulative() {
        let mut recorder = Recorder::default();
        let body = chunks(&[
            "{\"delta\":\"He\"}\n",
            "{\"delta\":\"llo\"}\n",
            "data: [DONE]\n",
        ]);

        let text = consume_stream(body, &mut recorder).await.unwrap();

        assert_eq!(text, "Hello");
        assert_eq!(recorder.partials, vec!["He", "Hello"]);
        assert_eq!(recorder.completions, vec!["Hello"]);
    }

    #[tokio::test]
    async fn records_split_across_chunks_are_reassembled() {
        let mut recorder = Recorder::default();
        let body = chunks(&["{\"delta\":\"H", "ello\"}\n", "{\"done\":true}\n"]);

        consume_stream(body, &mut recorder).await.unwrap();

        assert_eq!(recorder.partials, vec!["Hello"]);
        assert_eq!(recorder.completions, vec!["Hello"]);
    }

    #[tokio::test]
    async fn multibyte_characters_split_across_chunks_survive() {
        let mut recorder = Recorder::default();
        let record = "{\"delta\":\"caf\u{e9}\"}\n".as_bytes();
        let split = record.len() - 4;
        let body = stream::iter(vec![
            Ok::<_, String>(record[..split].to_vec()),
            Ok(record[split..].to_vec()),
            Ok(b"[DONE]\n".to_vec()),
        ]);

        let text = consume_stream(body, &mut recorder).await.unwrap();
        assert_eq!(text, "caf\u{e9}");
    }

    #[tokio::test]
    async fn malformed_and_unknown_records_are_skipped() {
        let mut recorder = Recorder::default();
        let body = chunks(&[
            ": keep-alive\n",
            "event: message\n",
            "{not json\n",
            "{\"usage\":{\"tokens\":3}}\n",
            "\n",
            "data: {\"delta\":\"ok\"}\n",
            "data: [DONE]\n",
        ]);

        let text = consume_stream(body, &mut recorder).await.unwrap();

        assert_eq!(text, "ok");
        assert_eq!(recorder.partials, vec!["ok"]);
        assert_eq!(recorder.completions.len(), 1);
    }

    #[tokio::test]
    async fn provider_delta_shapes_are_recognized() {
        let mut recorder = Recorder::default();
        let body = chunks(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"A\"},\"finish_reason\":null}]}\r\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"B\"}}\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"C\"}]}}]}\n",
            "data: {\"type\":\"message_stop\"}\n",
        ]);

        let text = consume_stream(body, &mut recorder).await.unwrap();

        assert_eq!(text, "ABC");
        assert_eq!(recorder.partials, vec!["A", "AB", "ABC"]);
    }

    #[tokio::test]
    async fn terminal_record_stops_reading() {
        let mut recorder = Recorder::default();
        let body = chunks(&[
            "{\"choices\":[{\"delta\":{\"content\":\"end\"},\"finish_reason\":\"stop\"}]}\n{\"delta\":\"ignored\"}\n",
            "{\"delta\":\"also ignored\"}\n",
        ]);

        let text = consume_stream(body, &mut recorder).await.unwrap();

        assert_eq!(text, "end");
        assert_eq!(recorder.completions, vec!["end"]);
    }

    #[tokio::test]
    async fn end_of_body_without_terminal_record_completes() {
        let mut recorder = Recorder::default();
        let body = chunks(&["{\"delta\":\"Hi\"}\n", "{\"delta\":\" there\"}"]);

        let text = consume_stream(body, &mut recorder).await.unwrap();

        assert_eq!(text, "Hi there");
        assert_eq!(recorder.partials, vec!["Hi", "Hi there"]);
        assert_eq!(recorder.completions, vec!["Hi there"]);
    }

    #[tokio::test]
    async fn read_failure_reports_interruption_without_completion() {
        let mut recorder = Recorder::default();
        let body = stream::iter(vec![
            Ok("{\"delta\":\"par\"}\n"),
            Err("connection reset".to_string()),
            Ok("{\"delta\":\"never\"}\n"),
        ]);

        let err = consume_stream(body, &mut recorder).await.unwrap_err();

        assert_eq!(
            err,
            StreamError::Interrupted {
                reason: "connection reset".to_string(),
                partial: "par".to_string(),
            }
        );
        assert_eq!(recorder.partials, vec!["par"]);
        assert!(recorder.completions.is_empty());
    }

    #[test]
    fn decoder_ignores_input_after_finishing() {
        let mut recorder = Recorder::default();
        let mut decoder = StreamDecoder::new();

        assert!(!decoder.push(b"{\"delta\":\"x\"}\n", &mut recorder));
        assert!(decoder.push(b"[DONE]\n{\"delta\":\"y\"}\n", &mut recorder));
        assert!(decoder.push(b"{\"delta\":\"z\"}\n", &mut recorder));
        decoder.finish(&mut recorder);

        assert_eq!(decoder.into_text(), "x");
        assert_eq!(recorder.completions, vec!["x"]);
    }

    #[test]
    fn parse_record_handles_spacing_variants() {
        for line in ["data: [DONE]", "data:[DONE]", "[DONE]"] {
            assert_eq!(
                parse_record(line),
                Some(Record {
                    delta: None,
                    done: true
                })
            );
        }
        assert_eq!(
            parse_record("data:{\"delta\":\"x\"}"),
            Some(Record {
                delta: Some("x".to_string()),
                done: false
            })
        );
        assert_eq!(parse_record("{\"delta\":\"\"}"), None);
    }
}
