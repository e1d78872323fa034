//! Client for OpenAI-compatible chat completion endpoints.
//!
//! A request goes to `{base_url}/chat/completions` and comes back either as
//! one JSON body or, when streaming, as server-sent events whose
//! `choices[0].delta.content` fragments are yielded in order.
//!
//! The client never touches session state. Callers record the exchange
//! themselves once the reply is complete.

use crate::ai_config::UserAiConfig;
use crate::chat::ChatMessage;
use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Completion failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompletionError {
    #[error("No API key configured")]
    MissingCredential,

    /// The provider answered with an error, or could not be reached
    /// (`status` is `None` then).
    #[error("{message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Unreadable response: {0}")]
    Decode(String),
}

/// Body of a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub stream: bool,
}

/// Where a request goes and how it authenticates.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: String,
}

impl Endpoint {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Incremental text fragments of a streamed reply. Finite, single use.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// A completion result in either delivery mode.
pub enum CompletionReply {
    Text(String),
    Stream(DeltaStream),
}

impl CompletionReply {
    /// Drain the reply into one string.
    pub async fn into_text(self) -> Result<String, CompletionError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Stream(mut deltas) => {
                let mut text = String::new();
                while let Some(delta) = deltas.next().await {
                    text.push_str(&delta?);
                }
                Ok(text)
            }
        }
    }
}

/// Wire transport for completion requests.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    /// Send a request and return the whole reply text.
    async fn complete(
        &self,
        endpoint: &Endpoint,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError>;

    /// Send a streaming request and return the delta stream.
    async fn stream(
        &self,
        endpoint: &Endpoint,
        request: &CompletionRequest,
    ) -> Result<DeltaStream, CompletionError>;
}

/// Sends conversations on behalf of users.
pub struct CompletionClient {
    transport: Arc<dyn CompletionTransport>,
}

impl CompletionClient {
    pub fn new(transport: Arc<dyn CompletionTransport>) -> Self {
        Self { transport }
    }

    /// Send `messages` using the user's settings.
    ///
    /// Fails with [`CompletionError::MissingCredential`] before any network
    /// activity when the user has no API key.
    pub async fn send(
        &self,
        user_id: &str,
        messages: Vec<ChatMessage>,
        config: &UserAiConfig,
    ) -> Result<CompletionReply, CompletionError> {
        let api_key = match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(CompletionError::MissingCredential),
        };

        let endpoint = Endpoint {
            base_url: config.base_url.clone(),
            api_key,
        };
        let request = CompletionRequest {
            model: config.model.clone(),
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            stream: config.stream,
        };

        tracing::info!(
            user_id = %user_id,
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "Sending completion request"
        );

        if request.stream {
            self.transport
                .stream(&endpoint, &request)
                .await
                .map(CompletionReply::Stream)
        } else {
            self.transport
                .complete(&endpoint, &request)
                .await
                .map(CompletionReply::Text)
        }
    }
}

// ============================================================================
// HTTP transport
// ============================================================================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// `reqwest`-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    async fn post(
        &self,
        endpoint: &Endpoint,
        request: &CompletionRequest,
    ) -> Result<reqwest::Response, CompletionError> {
        let response = self
            .client
            .post(endpoint.completions_url())
            .header("Authorization", format!("Bearer {}", endpoint.api_key))
            .json(request)
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(&body).unwrap_or_else(|| status.to_string());
            tracing::warn!(status = status.as_u16(), error = %message, "Completion endpoint returned an error");
            return Err(CompletionError::Upstream {
                status: Some(status.as_u16()),
                message,
            });
        }

        Ok(response)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn complete(
        &self,
        endpoint: &Endpoint,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        let response = self.post(endpoint, request).await?;
        let body = response
            .text()
            .await
            .map_err(request_failed)?;
        parse_completion(&body)
    }

    async fn stream(
        &self,
        endpoint: &Endpoint,
        request: &CompletionRequest,
    ) -> Result<DeltaStream, CompletionError> {
        let response = self.post(endpoint, request).await?;
        Ok(delta_stream(response.bytes_stream()))
    }
}

fn request_failed(e: impl std::fmt::Display) -> CompletionError {
    CompletionError::Upstream {
        status: None,
        message: format!("Request failed: {e}"),
    }
}

/// Error text from a provider error body: `error.message`, else the raw body.
fn upstream_message(body: &str) -> Option<String> {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from));

    from_json.or_else(|| {
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_completion(body: &str) -> Result<String, CompletionError> {
    let parsed: CompletionResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Decode(e.to_string()))?;

    match parsed.choices.into_iter().next() {
        Some(choice) => Ok(choice.message.content.unwrap_or_default()),
        None => match parsed.error {
            Some(err) => Err(CompletionError::Upstream {
                status: None,
                message: err.message.unwrap_or_else(|| "unknown provider error".into()),
            }),
            None => Err(CompletionError::Decode("response contained no choices".into())),
        },
    }
}

// ============================================================================
// Server-sent events
// ============================================================================

/// One decoded event of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Delta(String),
    Done,
}

/// Incremental SSE decoder.
///
/// Bytes are buffered until a full line is available, so events split
/// across network chunks (or multi-byte characters split across chunks)
/// decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; returns the events completed by them.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<SseEvent, CompletionError>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(event) = decode_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Decode whatever is left once the body has ended.
    pub fn finish(&mut self) -> Vec<Result<SseEvent, CompletionError>> {
        let line = std::mem::take(&mut self.buffer);
        decode_line(&line).into_iter().collect()
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<SseEvent, CompletionError>> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);

    // Blank separators, comments (": keep-alive") and non-data fields
    let data = line.strip_prefix("data:")?.trim_start();

    if data == "[DONE]" {
        return Some(Ok(SseEvent::Done));
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(CompletionError::Decode(e.to_string()))),
    };

    if let Some(err) = chunk.error {
        return Some(Err(CompletionError::Upstream {
            status: None,
            message: err.message.unwrap_or_else(|| "unknown provider error".into()),
        }));
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();
    Some(Ok(SseEvent::Delta(content)))
}

struct DeltaState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, CompletionError>>,
    done: bool,
}

impl<S> DeltaState<S> {
    fn absorb(&mut self, events: Vec<Result<SseEvent, CompletionError>>) {
        for event in events {
            if self.done {
                break;
            }
            match event {
                Ok(SseEvent::Delta(text)) => self.pending.push_back(Ok(text)),
                Ok(SseEvent::Done) => self.done = true,
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.done = true;
                }
            }
        }
    }
}

/// Turn an SSE response body into a stream of content deltas.
///
/// The stream ends at `data: [DONE]`, at the end of the body, or after the
/// first error. Dropping it drops the body and releases the connection.
pub fn delta_stream<S, B, E>(body: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DeltaState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.absorb(events);
                }
                Some(Err(e)) => {
                    state
                        .pending
                        .push_back(Err(request_failed(e)));
                    state.done = true;
                }
                None => {
                    let events = state.decoder.finish();
                    state.absorb(events);
                    state.done = true;
                }
            }
        }
    }))
}
