use std::convert::Infallible;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::{HeaderName, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{StreamExt, unfold};
use serde_json::json;
use shared::llm::{CompletionError, CompletionGateway, CompletionRequest, CompletionStream};
use shared::models::ChatRequest;
use tracing::error;

use super::AppState;
use super::chat::prepare_prompt;
use super::errors::completion_error_message;
use super::observability::RequestContext;

const DONE_SENTINEL: &str = "[DONE]";

enum RelayPhase {
    Opening {
        gateway: Arc<dyn CompletionGateway>,
        request: CompletionRequest,
        request_id: String,
    },
    Relaying {
        upstream: CompletionStream,
        request_id: String,
    },
    Terminated,
}

pub(super) async fn chat_stream(
    State(state): State<AppState>,
    Extension(request_context): Extension<RequestContext>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let messages = match prepare_prompt(&state, &req).await {
        Ok(messages) => messages,
        Err(response) => return response,
    };

    // The response commits to an event stream before the upstream
    // connection is awaited; every failure past this point is delivered
    // as a stream event, never as a changed status. Dropping the body on
    // caller disconnect cancels the relay and abandons the upstream read.
    let relay = unfold(
        RelayPhase::Opening {
            gateway: state.completions.clone(),
            request: CompletionRequest { messages },
            request_id: request_context.request_id.clone(),
        },
        |phase| async move {
            let mut phase = phase;
            loop {
                match phase {
                    RelayPhase::Opening {
                        gateway,
                        request,
                        request_id,
                    } => match gateway.stream(request).await {
                        Ok(upstream) => {
                            phase = RelayPhase::Relaying {
                                upstream,
                                request_id,
                            };
                        }
                        Err(err) => {
                            error!(
                                request_id = %request_id,
                                "streaming completion failed to open: {err}"
                            );
                            return Some((error_event(&err), RelayPhase::Terminated));
                        }
                    },
                    RelayPhase::Relaying {
                        mut upstream,
                        request_id,
                    } => {
                        return match upstream.next().await {
                            Some(Ok(payload)) => Some((
                                Event::default().data(payload),
                                RelayPhase::Relaying {
                                    upstream,
                                    request_id,
                                },
                            )),
                            Some(Err(err)) => {
                                error!(
                                    request_id = %request_id,
                                    "streaming completion failed mid-stream: {err}"
                                );
                                Some((error_event(&err), RelayPhase::Terminated))
                            }
                            None => Some((
                                Event::default().data(DONE_SENTINEL),
                                RelayPhase::Terminated,
                            )),
                        };
                    }
                    RelayPhase::Terminated => return None,
                }
            }
        },
    )
    .map(Ok::<Event, Infallible>);

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(relay).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

fn error_event(err: &CompletionError) -> Event {
    Event::default()
        .event("error")
        .data(json!({ "error": completion_error_message(err) }).to_string())
}
