use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::config::ConfigError;

#[derive(Debug, Clone, Default)]
pub struct ModerationVerdict {
    pub flagged: bool,
}

#[derive(Debug, Clone)]
pub struct ModerationConfig {
    pub moderations_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_ms: u64,
    pub enabled: bool,
}

/// Best-effort content-safety gate. Every failure mode (disabled, missing
/// credential, transport error, non-success status, malformed body)
/// resolves to a not-flagged verdict so the classifier is never a hard
/// dependency of the chat pipeline.
#[derive(Clone)]
pub struct ModerationClient {
    client: reqwest::Client,
    config: ModerationConfig,
}

#[derive(Debug, Error)]
enum ModerationError {
    #[error("moderation credential is not configured")]
    MissingCredential,
    #[error("moderation transport failed: {0}")]
    Transport(String),
    #[error("moderation upstream returned status {0}")]
    UpstreamStatus(u16),
    #[error("moderation upstream returned an invalid payload: {0}")]
    InvalidPayload(&'static str),
}

impl ModerationClient {
    pub fn new(config: ModerationConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub async fn check(&self, input: &str) -> ModerationVerdict {
        if !self.config.enabled {
            return ModerationVerdict::default();
        }

        match self.classify(input).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!("moderation check failed open: {err}");
                ModerationVerdict::default()
            }
        }
    }

    async fn classify(&self, input: &str) -> Result<ModerationVerdict, ModerationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ModerationError::MissingCredential)?;

        let response = self
            .client
            .post(&self.config.moderations_url)
            .bearer_auth(api_key)
            .json(&json!({
                "input": input,
                "model": self.config.model,
            }))
            .send()
            .await
            .map_err(|err| ModerationError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ModerationError::UpstreamStatus(status.as_u16()));
        }

        let parsed: ModerationResponse = response
            .json()
            .await
            .map_err(|_| ModerationError::InvalidPayload("response_json_parse_failed"))?;

        let flagged = parsed
            .results
            .first()
            .ok_or(ModerationError::InvalidPayload("missing_result"))?
            .flagged;

        Ok(ModerationVerdict { flagged })
    }
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
}
