use std::future::Future;
use std::pin::Pin;

use futures::Stream;
use thiserror::Error;

use crate::prompt::PromptMessage;

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;

/// Decoded upstream data payloads, in arrival order. The stream ends after
/// the upstream terminal sentinel or connection close; an `Err` item is
/// terminal for the stream.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

pub type CompletionStreamFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CompletionStream, CompletionError>> + Send + 'a>>;

/// Sampling parameters forwarded verbatim to the completion endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_tokens: u32,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1_024,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<PromptMessage>,
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion credential is not configured")]
    MissingCredential,
    #[error("completion request timed out")]
    Timeout,
    #[error("completion transport failed: {0}")]
    Transport(String),
    #[error("completion upstream returned status {status}")]
    UpstreamStatus { status: u16 },
    #[error("completion upstream returned an invalid payload: {0}")]
    InvalidPayload(&'static str),
}

pub trait CompletionGateway: Send + Sync {
    /// One buffered completion attempt. Never retried; the result is final
    /// for the request.
    fn generate<'a>(&'a self, request: CompletionRequest) -> CompletionFuture<'a>;

    /// Opens one streaming completion. The returned stream owns its
    /// connection and outlives the borrow of `self`.
    fn stream<'a>(&'a self, request: CompletionRequest) -> CompletionStreamFuture<'a>;
}
