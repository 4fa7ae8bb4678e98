use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::llm::CompletionRequest;
use shared::models::{ChatRequest, ChatResponse};
use shared::prompt::{self, PromptMessage};

use super::AppState;
use super::errors::{bad_request_response, completion_error_response};
use super::observability::RequestContext;

pub(super) async fn chat(
    State(state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let messages = match prepare_prompt(&state, &req).await {
        Ok(messages) => messages,
        Err(response) => return response,
    };

    match state
        .completions
        .generate(CompletionRequest { messages })
        .await
    {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse { reply })).into_response(),
        Err(err) => completion_error_response(&request_context.request_id, err),
    }
}

/// Pipeline prefix shared by both delivery modes: validate, moderate,
/// retrieve, assemble. An `Err` is a complete terminal response and means
/// no completion call may be made.
pub(super) async fn prepare_prompt(
    state: &AppState,
    req: &ChatRequest,
) -> Result<Vec<PromptMessage>, Response> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(bad_request_response("Message must not be empty"));
    }
    if message.chars().count() > state.settings.max_message_chars {
        return Err(bad_request_response("Message is too long"));
    }

    let verdict = state.moderation.check(message).await;
    if verdict.flagged {
        return Err(bad_request_response(
            "Message was rejected by the content policy",
        ));
    }

    let docs = state.retriever.retrieve(message).await;

    Ok(prompt::assemble(
        &state.settings.system_prompt,
        &docs,
        &req.history,
        message,
        state.settings.history_max_turns,
    ))
}
