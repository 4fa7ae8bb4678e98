use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use futures::stream::{Stream, StreamExt, unfold};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::warn;

use super::gateway::{
    CompletionError, CompletionFuture, CompletionGateway, CompletionRequest, CompletionStream,
    CompletionStreamFuture, SamplingParams,
};
use super::sse::{SseLineDecoder, StreamFrame};
use crate::config::ConfigError;

const MAX_LOGGED_BODY_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub chat_completions_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub sampling: SamplingParams,
}

#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<&str, CompletionError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingCredential)
    }

    fn request_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let sampling = &self.config.sampling;
        let mut body = json!({
            "model": self.config.model,
            "messages": request.messages,
            "temperature": sampling.temperature,
            "max_tokens": sampling.max_tokens,
            "top_p": sampling.top_p,
            "frequency_penalty": sampling.frequency_penalty,
            "presence_penalty": sampling.presence_penalty,
        });
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let api_key = self.api_key()?;
        let body = self.request_body(request, false);

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|_| CompletionError::InvalidPayload("response_body_read_failed"))?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                body = %truncate_chars(&raw, MAX_LOGGED_BODY_CHARS),
                "completion upstream returned a non-success status"
            );
            return Err(CompletionError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&raw)
            .map_err(|_| CompletionError::InvalidPayload("response_json_parse_failed"))?;

        let content = parsed
            .choices
            .first()
            .ok_or(CompletionError::InvalidPayload("missing_choice"))?
            .message
            .content
            .as_deref()
            .ok_or(CompletionError::InvalidPayload("missing_content"))?;

        Ok(content.trim().to_string())
    }

    async fn open_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionStream, CompletionError> {
        let api_key = self.api_key()?;
        let body = self.request_body(request, true);

        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %truncate_chars(&raw, MAX_LOGGED_BODY_CHARS),
                "streaming completion upstream returned a non-success status"
            );
            return Err(CompletionError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        Ok(relay_stream(response.bytes_stream()))
    }
}

impl CompletionGateway for OpenAiGateway {
    fn generate<'a>(&'a self, request: CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(async move { self.send_once(&request).await })
    }

    fn stream<'a>(&'a self, request: CompletionRequest) -> CompletionStreamFuture<'a> {
        Box::pin(async move { self.open_stream(&request).await })
    }
}

struct RelayState {
    bytes: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    decoder: SseLineDecoder,
    pending: VecDeque<StreamFrame>,
    terminated: bool,
}

/// Adapts the upstream byte stream into decoded data payloads, preserving
/// arrival order. Ends cleanly on the done sentinel or connection close;
/// yields one terminal `Err` on a mid-stream transport failure.
fn relay_stream(
    bytes: impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
) -> CompletionStream {
    let state = RelayState {
        bytes: Box::pin(bytes),
        decoder: SseLineDecoder::new(),
        pending: VecDeque::new(),
        terminated: false,
    };

    Box::pin(unfold(state, |mut state| async move {
        loop {
            if state.terminated {
                return None;
            }

            match state.pending.pop_front() {
                Some(StreamFrame::Done) => {
                    state.terminated = true;
                    return None;
                }
                Some(StreamFrame::Data(payload)) => return Some((Ok(payload), state)),
                None => {}
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.push(&chunk);
                    state.pending.extend(frames);
                }
                Some(Err(err)) => {
                    state.terminated = true;
                    return Some((Err(classify_transport_error(err)), state));
                }
                None => {
                    state.terminated = true;
                    return None;
                }
            }
        }
    }))
}

fn classify_transport_error(err: reqwest::Error) -> CompletionError {
    if err.is_timeout() {
        CompletionError::Timeout
    } else {
        CompletionError::Transport(err.to_string())
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}
