use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use shared::models::HealthResponse;

use super::AppState;

pub(super) async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            retrieval_enabled: state.retriever.enabled(),
            corpus_size: state.retriever.corpus_size(),
        }),
    )
}
