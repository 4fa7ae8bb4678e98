use std::env;
use std::path::PathBuf;

use thiserror::Error;

use crate::config_env::{
    optional_trimmed_env, parse_bool_env, parse_f64_env, parse_u32_env, parse_u64_env,
    parse_usize_env,
};
use crate::llm::SamplingParams;

const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";
const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 120_000;
const DEFAULT_EMBEDDINGS_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_MODERATION_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_HISTORY_MAX_TURNS: usize = 20;
const DEFAULT_MAX_MESSAGE_CHARS: usize = 4_000;
const DEFAULT_RETRIEVAL_TOP_K: usize = 3;
const DEFAULT_CORPUS_PATH: &str = "data/embeddings.json";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's \
questions clearly and concisely. If you do not know the answer, say so instead of guessing.";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub api_key: Option<String>,
    pub chat_completions_url: String,
    pub embeddings_url: String,
    pub moderations_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub moderation_model: String,
    pub sampling: SamplingParams,
    pub system_prompt: String,
    pub history_max_turns: usize,
    pub max_message_chars: usize,
    pub moderation_enabled: bool,
    pub corpus_path: PathBuf,
    pub retrieval_top_k: usize,
    pub completion_timeout_ms: u64,
    pub embeddings_timeout_ms: u64,
    pub moderation_timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid float in env var {0}")]
    ParseFloat(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build upstream http client: {0}")]
    HttpClient(String),
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = optional_trimmed_env("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string());
        let base_url = base_url.trim_end_matches('/').to_string();

        let chat_completions_url = optional_trimmed_env("CHAT_COMPLETIONS_URL")
            .unwrap_or_else(|| format!("{base_url}/chat/completions"));
        let embeddings_url = optional_trimmed_env("EMBEDDINGS_URL")
            .unwrap_or_else(|| format!("{base_url}/embeddings"));
        let moderations_url = optional_trimmed_env("MODERATIONS_URL")
            .unwrap_or_else(|| format!("{base_url}/moderations"));

        for (key, url) in [
            ("CHAT_COMPLETIONS_URL", &chat_completions_url),
            ("EMBEDDINGS_URL", &embeddings_url),
            ("MODERATIONS_URL", &moderations_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }

        Ok(Self {
            bind_addr: env::var("API_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            api_key: optional_trimmed_env("OPENAI_API_KEY"),
            chat_completions_url,
            embeddings_url,
            moderations_url,
            chat_model: optional_trimmed_env("CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: optional_trimmed_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            moderation_model: optional_trimmed_env("MODERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_MODERATION_MODEL.to_string()),
            sampling: SamplingParams {
                temperature: parse_f64_env("CHAT_TEMPERATURE", 0.7)?,
                max_tokens: parse_u32_env("CHAT_MAX_TOKENS", 1_024)?,
                top_p: parse_f64_env("CHAT_TOP_P", 1.0)?,
                frequency_penalty: parse_f64_env("CHAT_FREQUENCY_PENALTY", 0.0)?,
                presence_penalty: parse_f64_env("CHAT_PRESENCE_PENALTY", 0.0)?,
            },
            system_prompt: optional_trimmed_env("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            history_max_turns: parse_usize_env("CHAT_HISTORY_MAX_TURNS", DEFAULT_HISTORY_MAX_TURNS)?,
            max_message_chars: parse_usize_env("CHAT_MAX_MESSAGE_CHARS", DEFAULT_MAX_MESSAGE_CHARS)?,
            moderation_enabled: parse_bool_env("MODERATION_ENABLED", true)?,
            corpus_path: env::var("CORPUS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CORPUS_PATH)),
            retrieval_top_k: parse_usize_env("RETRIEVAL_TOP_K", DEFAULT_RETRIEVAL_TOP_K)?,
            completion_timeout_ms: parse_u64_env(
                "COMPLETION_TIMEOUT_MS",
                DEFAULT_COMPLETION_TIMEOUT_MS,
            )?,
            embeddings_timeout_ms: parse_u64_env(
                "EMBEDDINGS_TIMEOUT_MS",
                DEFAULT_EMBEDDINGS_TIMEOUT_MS,
            )?,
            moderation_timeout_ms: parse_u64_env(
                "MODERATION_TIMEOUT_MS",
                DEFAULT_MODERATION_TIMEOUT_MS,
            )?,
        })
    }
}
