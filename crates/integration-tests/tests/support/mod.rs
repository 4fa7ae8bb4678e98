#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use api_server::http::{AppState, ChatSettings, build_router};
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::stream;
use serde_json::{Value, json};
use shared::llm::{
    EmbeddingsClient, EmbeddingsConfig, ModerationClient, ModerationConfig, OpenAiGateway,
    OpenAiGatewayConfig, SamplingParams,
};
use shared::retrieval::{EmbeddingRecord, EmbeddingStore, Retriever};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

pub const TEST_SYSTEM_PROMPT: &str = "You are a test assistant.";

#[derive(Debug, Clone)]
pub enum CompletionReply {
    Json { status: StatusCode, body: Value },
    Stream { parts: Vec<StreamPart> },
}

#[derive(Debug, Clone)]
pub enum StreamPart {
    Chunk(String),
    Abort,
}

#[derive(Debug, Clone)]
pub enum ModerationReply {
    Flagged(bool),
    Status(StatusCode),
}

#[derive(Debug, Clone)]
pub enum EmbeddingReply {
    Vector(Vec<f32>),
    Status(StatusCode),
}

/// Scripted upstream behavior plus a record of every request body the
/// relay actually sent, per endpoint.
#[derive(Debug, Clone, Default)]
pub struct UpstreamState {
    completion_replies: Arc<Mutex<VecDeque<CompletionReply>>>,
    moderation_replies: Arc<Mutex<VecDeque<ModerationReply>>>,
    embedding_replies: Arc<Mutex<VecDeque<EmbeddingReply>>>,
    pub completion_requests: Arc<Mutex<Vec<Value>>>,
    pub moderation_requests: Arc<Mutex<Vec<Value>>>,
    pub embedding_requests: Arc<Mutex<Vec<Value>>>,
}

impl UpstreamState {
    pub async fn queue_completion(&self, reply: CompletionReply) {
        self.completion_replies.lock().await.push_back(reply);
    }

    pub async fn queue_completion_text(&self, content: &str) {
        self.queue_completion(CompletionReply::Json {
            status: StatusCode::OK,
            body: json!({
                "choices": [ { "message": { "role": "assistant", "content": content } } ]
            }),
        })
        .await;
    }

    pub async fn queue_moderation(&self, reply: ModerationReply) {
        self.moderation_replies.lock().await.push_back(reply);
    }

    pub async fn queue_embedding(&self, reply: EmbeddingReply) {
        self.embedding_replies.lock().await.push_back(reply);
    }

    pub async fn completion_request_count(&self) -> usize {
        self.completion_requests.lock().await.len()
    }

    pub async fn moderation_request_count(&self) -> usize {
        self.moderation_requests.lock().await.len()
    }

    pub async fn embedding_request_count(&self) -> usize {
        self.embedding_requests.lock().await.len()
    }
}

pub struct TestAppOptions {
    pub api_key: Option<String>,
    pub moderation_enabled: bool,
    pub corpus: Vec<EmbeddingRecord>,
    pub top_k: usize,
    pub history_max_turns: usize,
    pub max_message_chars: usize,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            api_key: Some("test-key".to_string()),
            moderation_enabled: true,
            corpus: Vec::new(),
            top_k: 3,
            history_max_turns: 20,
            max_message_chars: 4_000,
        }
    }
}

pub struct TestApp {
    pub base_url: String,
    pub upstream: UpstreamState,
    pub client: reqwest::Client,
    app_shutdown: Option<oneshot::Sender<()>>,
    upstream_shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.app_shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.upstream_shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl TestApp {
    pub async fn post_chat(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("chat request should send")
    }

    pub async fn post_chat_stream(&self, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}/chat/stream", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("chat stream request should send")
    }

    pub async fn get_health(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .expect("health request should send")
    }
}

pub async fn spawn_app(options: TestAppOptions) -> TestApp {
    let upstream = UpstreamState::default();
    let (upstream_url, upstream_shutdown) = spawn_upstream(upstream.clone()).await;

    let gateway = OpenAiGateway::new(OpenAiGatewayConfig {
        chat_completions_url: format!("{upstream_url}/chat/completions"),
        api_key: options.api_key.clone(),
        model: "relay-test-model".to_string(),
        timeout_ms: 5_000,
        sampling: SamplingParams::default(),
    })
    .expect("test gateway should build");

    let moderation = ModerationClient::new(ModerationConfig {
        moderations_url: format!("{upstream_url}/moderations"),
        api_key: options.api_key.clone(),
        model: "relay-test-moderation".to_string(),
        timeout_ms: 5_000,
        enabled: options.moderation_enabled,
    })
    .expect("test moderation client should build");

    let embeddings = EmbeddingsClient::new(EmbeddingsConfig {
        embeddings_url: format!("{upstream_url}/embeddings"),
        api_key: options.api_key,
        model: "relay-test-embedding".to_string(),
        timeout_ms: 5_000,
    })
    .expect("test embeddings client should build");

    let retriever = Retriever::new(
        Arc::new(EmbeddingStore::from_records(options.corpus)),
        embeddings,
        options.top_k,
    );

    let app = build_router(AppState {
        settings: ChatSettings {
            system_prompt: TEST_SYSTEM_PROMPT.to_string(),
            history_max_turns: options.history_max_turns,
            max_message_chars: options.max_message_chars,
        },
        completions: Arc::new(gateway),
        moderation,
        retriever,
    });

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("app listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("app listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        server.await.expect("app server should run");
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("test http client should build");

    TestApp {
        base_url: format!("http://{local_addr}"),
        upstream,
        client,
        app_shutdown: Some(shutdown_tx),
        upstream_shutdown: Some(upstream_shutdown),
    }
}

async fn spawn_upstream(state: UpstreamState) -> (String, oneshot::Sender<()>) {
    let app = Router::new()
        .route("/chat/completions", post(chat_completions_handler))
        .route("/moderations", post(moderations_handler))
        .route("/embeddings", post(embeddings_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("upstream listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("upstream listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        server.await.expect("upstream mock should run");
    });

    (format!("http://{local_addr}"), shutdown_tx)
}

async fn chat_completions_handler(
    State(state): State<UpstreamState>,
    Json(body): Json<Value>,
) -> Response {
    state.completion_requests.lock().await.push(body);

    let reply = state
        .completion_replies
        .lock()
        .await
        .pop_front()
        .unwrap_or(CompletionReply::Json {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": { "message": "no mock completion reply queued" } }),
        });

    match reply {
        CompletionReply::Json { status, body } => (status, Json(body)).into_response(),
        CompletionReply::Stream { parts } => {
            let chunks = parts.into_iter().map(|part| match part {
                StreamPart::Chunk(chunk) => Ok(Bytes::from(chunk)),
                StreamPart::Abort => Err(io::Error::other("mock stream failure")),
            });
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/event-stream")
                .body(Body::from_stream(stream::iter(chunks)))
                .expect("mock stream response should build")
        }
    }
}

async fn moderations_handler(
    State(state): State<UpstreamState>,
    Json(body): Json<Value>,
) -> Response {
    state.moderation_requests.lock().await.push(body);

    let reply = state
        .moderation_replies
        .lock()
        .await
        .pop_front()
        .unwrap_or(ModerationReply::Flagged(false));

    match reply {
        ModerationReply::Flagged(flagged) => (
            StatusCode::OK,
            Json(json!({ "results": [ { "flagged": flagged } ] })),
        )
            .into_response(),
        ModerationReply::Status(status) => (
            status,
            Json(json!({ "error": { "message": "mock moderation failure" } })),
        )
            .into_response(),
    }
}

async fn embeddings_handler(
    State(state): State<UpstreamState>,
    Json(body): Json<Value>,
) -> Response {
    state.embedding_requests.lock().await.push(body);

    let reply = state
        .embedding_replies
        .lock()
        .await
        .pop_front()
        .unwrap_or(EmbeddingReply::Vector(vec![1.0, 0.0, 0.0]));

    match reply {
        EmbeddingReply::Vector(vector) => (
            StatusCode::OK,
            Json(json!({ "data": [ { "embedding": vector } ] })),
        )
            .into_response(),
        EmbeddingReply::Status(status) => (
            status,
            Json(json!({ "error": { "message": "mock embeddings failure" } })),
        )
            .into_response(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Minimal event-stream parser for assertions: groups `event:`/`data:`
/// lines into events on blank-line boundaries, skipping `:` comments.
pub fn parse_sse(raw: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut current_event: Option<String> = None;
    let mut current_data: Vec<String> = Vec::new();

    for line in raw.lines() {
        if line.is_empty() {
            if current_event.is_some() || !current_data.is_empty() {
                events.push(SseEvent {
                    event: current_event.take(),
                    data: current_data.join("\n"),
                });
                current_data.clear();
            }
            continue;
        }
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            current_event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            current_data.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
    }

    if current_event.is_some() || !current_data.is_empty() {
        events.push(SseEvent {
            event: current_event,
            data: current_data.join("\n"),
        });
    }

    events
}

pub fn record(id: &str, text: &str, vector: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        id: id.to_string(),
        text: text.to_string(),
        vector,
    }
}
