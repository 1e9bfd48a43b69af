//! SSE streaming parser for Dify workflow runs.
//!
//! Converts a raw `reqwest` byte stream into text chunks: `answer` fields of
//! message events and the string outputs of `workflow_finished`. Lines are
//! split on raw bytes so a multi-byte character cut by a chunk boundary
//! survives.

use bytes::Bytes;
use futures::stream::Stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

use super::error::DifyError;

/// Stream adapter that converts raw SSE bytes into text chunks.
pub struct DifyStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, DifyError>>,
    finished: bool,
}

impl DifyStream {
    pub(crate) fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Parse every complete line in the buffer into `pending`
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.parse_line(&line);
        }
    }

    fn parse_line(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(e) => {
                self.pending.push_back(Err(DifyError::Parse(format!(
                    "Invalid UTF-8 in stream: {}",
                    e
                ))));
                return;
            }
        };

        // Skip blank separators and non-data lines (event:, id:, ping)
        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        self.pending.extend(parse_event(data.trim()));
    }
}

/// Text chunks carried by one SSE data payload
pub(crate) fn parse_event(data: &str) -> Vec<Result<String, DifyError>> {
    let event: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            debug!("Skipping unparsable stream line: {}", e);
            return Vec::new();
        }
    };

    match event.get("event").and_then(Value::as_str) {
        Some("workflow_finished") => event
            .pointer("/data/outputs")
            .and_then(Value::as_object)
            .map(|outputs| {
                outputs
                    .values()
                    .filter_map(Value::as_str)
                    .map(|s| Ok(s.to_string()))
                    .collect()
            })
            .unwrap_or_default(),
        Some("error") => {
            let message = event
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            vec![Err(DifyError::Api(message.to_string()))]
        }
        _ => event
            .get("answer")
            .and_then(Value::as_str)
            .map(|answer| vec![Ok(answer.to_string())])
            .unwrap_or_default(),
    }
}

impl Stream for DifyStream {
    type Item = Result<String, DifyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(chunk) = this.pending.pop_front() {
                return Poll::Ready(Some(chunk));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            // Need more data from the byte stream
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    this.drain_lines();
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(DifyError::Network(e.to_string()))));
                }
                Poll::Ready(None) => {
                    // Stream ended - parse any unterminated last line
                    this.finished = true;
                    let rest = std::mem::take(&mut this.buffer);
                    if !rest.is_empty() {
                        this.parse_line(&rest);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn sse_bytes(lines: &[&str]) -> Vec<Result<Bytes, reqwest::Error>> {
        lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{}\n", line))))
            .collect()
    }

    async fn collect(stream: DifyStream) -> Vec<String> {
        stream.map(|c| c.unwrap()).collect().await
    }

    #[tokio::test]
    async fn test_message_answers() {
        let data = sse_bytes(&[
            r#"data: {"event": "message", "answer": "◎ドウ"}"#,
            "",
            r#"data: {"event": "message", "answer": "デュース"}"#,
            "",
            "event: ping",
        ]);

        let chunks = collect(DifyStream::new(futures::stream::iter(data))).await;
        assert_eq!(chunks, ["◎ドウ", "デュース"]);
    }

    #[tokio::test]
    async fn test_workflow_finished_outputs() {
        let data = sse_bytes(&[
            r#"data: {"event": "workflow_started", "data": {"id": "run-1"}}"#,
            r#"data: {"event": "node_finished", "data": {"outputs": {"text": "中間"}}}"#,
            r#"data: {"event": "workflow_finished", "data": {"outputs": {"text": "本命は1番", "score": 3}}}"#,
        ]);

        let chunks = collect(DifyStream::new(futures::stream::iter(data))).await;
        assert_eq!(chunks, ["本命は1番"]);
    }

    #[tokio::test]
    async fn test_split_multibyte_character() {
        let line = "data: {\"event\": \"message\", \"answer\": \"本命\"}\n".as_bytes();
        let cut = line.iter().position(|b| *b >= 0x80).unwrap() + 1;
        let data: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::copy_from_slice(&line[..cut])),
            Ok(Bytes::copy_from_slice(&line[cut..])),
        ];

        let chunks = collect(DifyStream::new(futures::stream::iter(data))).await;
        assert_eq!(chunks, ["本命"]);
    }

    #[tokio::test]
    async fn test_unterminated_last_line_and_garbage() {
        let data: Vec<Result<Bytes, reqwest::Error>> = vec![
            Ok(Bytes::from("data: not json\n")),
            Ok(Bytes::from(r#"data: {"answer": "end"}"#)),
        ];

        let chunks = collect(DifyStream::new(futures::stream::iter(data))).await;
        assert_eq!(chunks, ["end"]);
    }

    #[tokio::test]
    async fn test_error_event() {
        let data = sse_bytes(&[r#"data: {"event": "error", "message": "quota exceeded"}"#]);
        let mut stream = DifyStream::new(futures::stream::iter(data));

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, DifyError::Api(ref m) if m == "quota exceeded"));
        assert!(stream.next().await.is_none());
    }
}
