use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::llm::{CompletionGateway, ModerationClient};
use shared::retrieval::Retriever;
use tower_http::cors::CorsLayer;

mod chat;
mod errors;
mod health;
mod observability;
mod stream;

#[derive(Clone)]
pub struct ChatSettings {
    pub system_prompt: String,
    pub history_max_turns: usize,
    pub max_message_chars: usize,
}

#[derive(Clone)]
pub struct AppState {
    pub settings: ChatSettings,
    pub completions: Arc<dyn CompletionGateway>,
    pub moderation: ModerationClient,
    pub retriever: Retriever,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(stream::chat_stream))
        .route("/health", get(health::health))
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
