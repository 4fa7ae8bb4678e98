pub mod embeddings;
pub mod gateway;
pub mod moderation;
pub mod openai;
mod sse;

pub use embeddings::{EmbeddingsClient, EmbeddingsConfig, EmbeddingsError};
pub use gateway::{
    CompletionError, CompletionGateway, CompletionRequest, CompletionStream, SamplingParams,
};
pub use moderation::{ModerationClient, ModerationConfig, ModerationVerdict};
pub use openai::{OpenAiGateway, OpenAiGatewayConfig};
