use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http::{AppState, ChatSettings, build_router};
use shared::config::ApiConfig;
use shared::llm::{
    EmbeddingsClient, EmbeddingsConfig, ModerationClient, ModerationConfig, OpenAiGateway,
    OpenAiGatewayConfig,
};
use shared::retrieval::{EmbeddingStore, Retriever};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,shared=debug,axum=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    if config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; chat requests will fail until it is configured");
    }

    let store = match EmbeddingStore::load(&config.corpus_path) {
        Ok(store) => {
            info!(
                "loaded embedding corpus with {} documents from {}",
                store.len(),
                config.corpus_path.display()
            );
            store
        }
        Err(err) => {
            warn!("embedding corpus unavailable, retrieval disabled: {err}");
            EmbeddingStore::empty()
        }
    };

    let gateway = match OpenAiGateway::new(OpenAiGatewayConfig {
        chat_completions_url: config.chat_completions_url.clone(),
        api_key: config.api_key.clone(),
        model: config.chat_model.clone(),
        timeout_ms: config.completion_timeout_ms,
        sampling: config.sampling,
    }) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!("failed to build completion gateway: {err}");
            std::process::exit(1);
        }
    };

    let moderation = match ModerationClient::new(ModerationConfig {
        moderations_url: config.moderations_url.clone(),
        api_key: config.api_key.clone(),
        model: config.moderation_model.clone(),
        timeout_ms: config.moderation_timeout_ms,
        enabled: config.moderation_enabled,
    }) {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build moderation client: {err}");
            std::process::exit(1);
        }
    };

    let embeddings = match EmbeddingsClient::new(EmbeddingsConfig {
        embeddings_url: config.embeddings_url.clone(),
        api_key: config.api_key.clone(),
        model: config.embedding_model.clone(),
        timeout_ms: config.embeddings_timeout_ms,
    }) {
        Ok(client) => client,
        Err(err) => {
            error!("failed to build embeddings client: {err}");
            std::process::exit(1);
        }
    };

    let retriever = Retriever::new(Arc::new(store), embeddings, config.retrieval_top_k);

    let app = build_router(AppState {
        settings: ChatSettings {
            system_prompt: config.system_prompt.clone(),
            history_max_turns: config.history_max_turns,
            max_message_chars: config.max_message_chars,
        },
        completions: Arc::new(gateway),
        moderation,
        retriever,
    });

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}
