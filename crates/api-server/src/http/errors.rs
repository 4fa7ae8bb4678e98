use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::llm::CompletionError;
use shared::models::ErrorResponse;
use tracing::error;

// Technical upstream detail stays in the logs; callers only ever see
// these fixed messages.
pub(super) const UPSTREAM_UNAVAILABLE_MESSAGE: &str =
    "The assistant is temporarily unavailable. Please try again.";
pub(super) const NOT_CONFIGURED_MESSAGE: &str = "The assistant is not configured.";

pub(super) fn bad_request_response(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn bad_gateway_response(message: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn internal_error_response(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn completion_error_message(err: &CompletionError) -> &'static str {
    match err {
        CompletionError::MissingCredential => NOT_CONFIGURED_MESSAGE,
        _ => UPSTREAM_UNAVAILABLE_MESSAGE,
    }
}

pub(super) fn completion_error_response(request_id: &str, err: CompletionError) -> Response {
    error!(request_id = %request_id, "completion request failed: {err}");

    match err {
        CompletionError::MissingCredential => internal_error_response(NOT_CONFIGURED_MESSAGE),
        CompletionError::UpstreamStatus { .. } | CompletionError::InvalidPayload(_) => {
            bad_gateway_response(UPSTREAM_UNAVAILABLE_MESSAGE)
        }
        CompletionError::Timeout | CompletionError::Transport(_) => {
            internal_error_response(UPSTREAM_UNAVAILABLE_MESSAGE)
        }
    }
}
