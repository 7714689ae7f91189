// ABOUTME: OpenAI Responses API backend streaming completions over server-sent events.
// ABOUTME: Events are decoded lazily from the response body as bytes arrive.

use crate::config::BackendConfig;
use crate::error::LlmError;
use crate::event::{ErrorCode, LlmEvent, Usage};
use crate::handle::LlmHandle;
use crate::traits::{CompletionRequest, LlmBackend};
use anyhow::Result;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::sse::SseDecoder;

/// Backend for the OpenAI Responses API (`POST {base_url}/responses`, `stream: true`)
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key().map(str::to_string),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a factory function for the registry
    pub fn factory() -> impl Fn(&BackendConfig) -> Result<LlmHandle> + Send + Sync + 'static {
        |config| {
            if config.api_key().is_none() {
                tracing::warn!("No OpenAI API key configured; LLM calls will fail until one is set");
            }
            Ok(LlmHandle::new(OpenAiBackend::new(config)?))
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    stream: bool,
}

impl LlmBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn stream<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<BoxStream<'static, LlmEvent>, LlmError>> {
        Box::pin(async move {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or(LlmError::MissingApiKey { backend: "openai" })?;

            let body = ResponsesRequest {
                model: &request.model,
                input: &request.input,
                stream: true,
            };

            let response = self
                .client
                .post(self.endpoint())
                .bearer_auth(api_key)
                .header("Accept", "text/event-stream")
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let message = provider_error_message(&text);
                tracing::warn!(status = status.as_u16(), %message, "OpenAI rejected request");
                return Err(LlmError::Provider {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec()));
            Ok(events_from_body(body))
        })
    }
}

/// Pull the `error.message` out of a provider error body, falling back to the raw text
fn provider_error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        error: WireError,
    }

    match serde_json::from_str::<Envelope>(body) {
        Ok(envelope) => envelope
            .error
            .message
            .unwrap_or_else(|| body.trim().to_string()),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

struct BodyState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<LlmEvent>,
    done: bool,
}

impl<S> BodyState<S> {
    /// Queue the events a batch of frames produces; stops at the first terminal event
    fn enqueue(&mut self, frames: impl IntoIterator<Item = super::sse::SseFrame>) {
        for frame in frames {
            if self.done {
                return;
            }
            if frame.data.trim() == "[DONE]" {
                self.done = true;
                return;
            }
            if let Some(event) = parse_event(&frame.data) {
                if event.is_terminal() {
                    self.done = true;
                }
                self.pending.push_back(event);
            }
        }
    }
}

/// Turn a raw SSE byte stream into a lazy stream of events.
///
/// A transport failure mid-body becomes a single `LlmEvent::Error` with
/// `ErrorCode::Transport`; a body that closes without a completion marker
/// simply ends the stream.
pub fn events_from_body<S, E>(body: S) -> BoxStream<'static, LlmEvent>
where
    S: Stream<Item = Result<Vec<u8>, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = BodyState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let frames = state.decoder.push(&bytes);
                    state.enqueue(frames);
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "LLM response body failed mid-stream");
                    state.done = true;
                    state.pending.push_back(LlmEvent::Error {
                        code: ErrorCode::Transport,
                        message: e.to_string(),
                    });
                }
                None => {
                    let tail = state.decoder.finish();
                    state.enqueue(tail);
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    response: Option<WireResponse>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn code_from_wire(code: Option<&str>) -> ErrorCode {
    match code {
        Some("rate_limit_exceeded") => ErrorCode::RateLimited,
        Some("invalid_api_key") => ErrorCode::AuthFailed,
        Some(_) => ErrorCode::ProviderError,
        None => ErrorCode::Unknown,
    }
}

/// Map one SSE `data:` payload to an event. Unparseable payloads are dropped.
pub fn parse_event(data: &str) -> Option<LlmEvent> {
    let wire: WireEvent = match serde_json::from_str(data) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping unparseable SSE payload");
            return None;
        }
    };

    let event = match wire.kind.as_str() {
        "response.output_text.delta" => LlmEvent::TextDelta(wire.delta.unwrap_or_default()),
        "response.completed" | "response.incomplete" => LlmEvent::Completed {
            usage: wire.response.and_then(|r| r.usage),
        },
        "response.failed" => {
            let error = wire.response.and_then(|r| r.error);
            let code = code_from_wire(error.as_ref().and_then(|e| e.code.as_deref()));
            LlmEvent::Error {
                code,
                message: error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "response failed".to_string()),
            }
        }
        "error" => LlmEvent::Error {
            code: code_from_wire(wire.code.as_deref()),
            message: wire.message.unwrap_or_else(|| "stream error".to_string()),
        },
        _ => LlmEvent::Other { kind: wire.kind },
    };
    Some(event)
}
