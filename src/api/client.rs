//! HTTP transport to the remote API.
//!
//! Thin and mechanical: request marshaling, bearer auth, a bounded
//! retry-with-backoff wrapper, and SSE decoding for streamed replies.
//! Remote failures are re-surfaced verbatim as API errors.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{
    ChatRequest, CompletionResponse, ModelInfo, ModelsResponse, StreamResponse, UploadedFile,
};
use crate::error::{Error, Result};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub enum StreamEvent {
    Chunk(String),
    Error(String),
    End,
}

/// A reply is either complete content or a sequence of incremental chunks.
pub enum Reply {
    Complete(String),
    Stream(mpsc::UnboundedReceiver<StreamEvent>),
}

#[async_trait]
pub trait ChatTransport {
    async fn send_message(&self, request: ChatRequest) -> Result<Reply>;
    async fn upload_file(&self, path: &Path) -> Result<UploadedFile>;
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Sends a request, retrying connect failures and 5xx responses with a
    /// doubling delay. 4xx responses are returned to the caller immediately.
    async fn send_with_retry<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 1;
        loop {
            let outcome = build()
                .header("Authorization", format!("Bearer {}", self.api_key))
                .send()
                .await;
            match outcome {
                Ok(response) if response.status().is_server_error() && attempt < MAX_ATTEMPTS => {
                    warn!(status = %response.status(), attempt, "server error, retrying");
                }
                Ok(response) => return Ok(response),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(error = %e, attempt, "request failed, retrying");
                }
                Err(e) => return Err(Error::api(format!("request failed: {e}"))),
            }
            tokio::time::sleep(backoff).await;
            backoff *= 2;
            attempt += 1;
        }
    }

    async fn error_from_response(response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Error::api(format!("API request failed with status {status}: {body}"))
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send_message(&self, request: ChatRequest) -> Result<Reply> {
        let url = endpoint_url(&self.base_url, "chat/completions");
        debug!(model = %request.model, stream = request.stream, "sending chat request");
        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("Content-Type", "application/json")
                    .json(&request)
            })
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        if !request.stream {
            let completion = response
                .json::<CompletionResponse>()
                .await
                .map_err(|e| Error::api(format!("could not parse API response: {e}")))?;
            let content = completion
                .choices
                .first()
                .and_then(|choice| choice.message.content.clone())
                .unwrap_or_default();
            return Ok(Reply::Complete(content));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(StreamEvent::Error(format!("stream failed: {e}")));
                        let _ = tx.send(StreamEvent::End);
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(newline) = memchr(b'\n', buffer.as_bytes()) {
                    let line = buffer[..newline].trim().to_string();
                    buffer.drain(..=newline);
                    if process_sse_line(&line, &tx) {
                        return;
                    }
                }
            }
            let _ = tx.send(StreamEvent::End);
        });
        Ok(Reply::Stream(rx))
    }

    async fn upload_file(&self, path: &Path) -> Result<UploadedFile> {
        let bytes = std::fs::read(path).map_err(|e| {
            Error::configuration_with(format!("could not read file {}", path.display()), e)
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let url = endpoint_url(&self.base_url, "files");
        let client = self.client.clone();
        let response = self
            .send_with_retry(move || {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(filename.clone());
                let form = reqwest::multipart::Form::new()
                    .text("purpose", "user_data")
                    .part("file", part);
                client.post(&url).multipart(form)
            })
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        response
            .json::<UploadedFile>()
            .await
            .map_err(|e| Error::api(format!("could not parse upload response: {e}")))
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = endpoint_url(&self.base_url, "models");
        let response = self
            .send_with_retry(|| {
                self.client
                    .get(&url)
                    .header("Content-Type", "application/json")
            })
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        let models = response
            .json::<ModelsResponse>()
            .await
            .map_err(|e| Error::api(format!("could not parse models response: {e}")))?;
        Ok(models.data)
    }
}

/// Handles one SSE line. Returns true when the stream is finished.
fn process_sse_line(line: &str, tx: &mpsc::UnboundedSender<StreamEvent>) -> bool {
    let Some(payload) = line.strip_prefix("data:").map(str::trim_start) else {
        return false;
    };
    if payload == "[DONE]" {
        let _ = tx.send(StreamEvent::End);
        return true;
    }
    match serde_json::from_str::<StreamResponse>(payload) {
        Ok(response) => {
            if let Some(choice) = response.choices.first() {
                if let Some(content) = &choice.delta.content {
                    let _ = tx.send(StreamEvent::Chunk(content.clone()));
                }
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }
            let _ = tx.send(StreamEvent::Error(format_api_error(payload)));
            let _ = tx.send(StreamEvent::End);
            true
        }
    }
}

/// Extracts a one-line summary from a remote error payload when it is JSON,
/// keeping the raw body alongside it.
fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()));
        if let Some(summary) = summary {
            return format!("API error: {summary}");
        }
    }
    format!("API error: {trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut rx: mpsc::UnboundedReceiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn endpoint_url_joins_without_double_slashes() {
        assert_eq!(
            endpoint_url("https://api.example.com/v1/", "/models"),
            "https://api.example.com/v1/models"
        );
        assert_eq!(
            endpoint_url("https://api.example.com/v1", "chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn sse_chunks_are_forwarded() {
        let (tx, rx) = mpsc::unbounded_channel();
        let finished =
            process_sse_line(r#"data: {"choices":[{"delta":{"content":"hi"}}]}"#, &tx);
        assert!(!finished);
        let events = drain(rx);
        assert!(matches!(&events[0], StreamEvent::Chunk(content) if content == "hi"));
    }

    #[test]
    fn sse_done_marker_ends_the_stream() {
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(process_sse_line("data: [DONE]", &tx));
        let events = drain(rx);
        assert!(matches!(events.last(), Some(StreamEvent::End)));
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(!process_sse_line(": keepalive", &tx));
        assert!(!process_sse_line("", &tx));
        assert!(drain(rx).is_empty());
    }

    #[test]
    fn malformed_payload_surfaces_an_error_and_ends() {
        let (tx, rx) = mpsc::unbounded_channel();
        let finished = process_sse_line(
            r#"data: {"error":{"message":"model not found"}}"#,
            &tx,
        );
        assert!(finished);
        let events = drain(rx);
        assert!(
            matches!(&events[0], StreamEvent::Error(text) if text.contains("model not found"))
        );
        assert!(matches!(events.last(), Some(StreamEvent::End)));
    }

    #[test]
    fn api_error_formatting_prefers_the_nested_message() {
        let formatted = format_api_error(r#"{"error":{"message":"rate limited"}}"#);
        assert_eq!(formatted, "API error: rate limited");
        assert_eq!(format_api_error("plain text"), "API error: plain text");
    }
}
