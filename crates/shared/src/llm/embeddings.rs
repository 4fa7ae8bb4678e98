use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Clone)]
pub struct EmbeddingsConfig {
    pub embeddings_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
}

#[derive(Clone)]
pub struct EmbeddingsClient {
    client: reqwest::Client,
    config: EmbeddingsConfig,
}

#[derive(Debug, Error)]
pub enum EmbeddingsError {
    #[error("embeddings credential is not configured")]
    MissingCredential,
    #[error("embeddings transport failed: {0}")]
    Transport(String),
    #[error("embeddings upstream returned status {0}")]
    UpstreamStatus(u16),
    #[error("embeddings upstream returned an invalid payload: {0}")]
    InvalidPayload(&'static str),
}

impl EmbeddingsClient {
    pub fn new(config: EmbeddingsConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, EmbeddingsError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(EmbeddingsError::MissingCredential)?;

        let response = self
            .client
            .post(&self.config.embeddings_url)
            .bearer_auth(api_key)
            .json(&json!({
                "input": input,
                "model": self.config.model,
            }))
            .send()
            .await
            .map_err(|err| EmbeddingsError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbeddingsError::UpstreamStatus(status.as_u16()));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|_| EmbeddingsError::InvalidPayload("response_json_parse_failed"))?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .ok_or(EmbeddingsError::InvalidPayload("missing_embedding"))?
            .embedding;

        if vector.is_empty() {
            return Err(EmbeddingsError::InvalidPayload("empty_embedding"));
        }

        Ok(vector)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsDatum {
    embedding: Vec<f32>,
}
