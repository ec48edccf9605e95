//! HTTP handlers and DTOs wrapping the core contracts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use vaultmind_core::{AskRequest, Error};

use crate::state::AppState;

/// Wire shape of error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Map the core error taxonomy onto HTTP status codes.
fn error_response(err: Error) -> Response {
    let status = if err.is_validation() || matches!(err, Error::NotFound(_)) {
        StatusCode::BAD_REQUEST
    } else if matches!(err, Error::Busy(_)) {
        StatusCode::CONFLICT
    } else if err.is_upstream() {
        StatusCode::BAD_GATEWAY
    } else {
        error!(subsystem = "api", error = %err, "Request failed");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// `POST /api/v1/ask`
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Response {
    match state.engine.ask(&state.shutdown, request).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /api/v1/index` — run a full indexing pass and report counters.
pub async fn index_all(State(state): State<AppState>) -> Response {
    match state.indexer.index_all(&state.shutdown).await {
        Ok(counters) => Json(counters).into_response(),
        Err(err) => error_response(err),
    }
}

/// Request body for `POST /api/v1/index/note`.
#[derive(Debug, Deserialize)]
pub struct IndexNoteRequest {
    pub vault: String,
    pub path: String,
}

/// `POST /api/v1/index/note`
pub async fn index_note(
    State(state): State<AppState>,
    Json(request): Json<IndexNoteRequest>,
) -> Response {
    match state
        .indexer
        .index_note(&state.shutdown, &request.vault, &request.path)
        .await
    {
        Ok(counters) => Json(counters).into_response(),
        Err(err) => error_response(err),
    }
}

/// `POST /api/v1/index/clear`
pub async fn clear_all(State(state): State<AppState>) -> Response {
    match state.indexer.clear_all().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// `GET /api/v1/index/status`
pub async fn status(State(state): State<AppState>) -> Response {
    Json(state.indexer.status()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        error_response(err).status()
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(Error::Validation("empty".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(Error::VaultNotFound("x".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_busy_maps_to_409() {
        assert_eq!(status_of(Error::Busy("run".into())), StatusCode::CONFLICT);
    }

    #[test]
    fn test_upstream_maps_to_502() {
        assert_eq!(
            status_of(Error::Embedding("down".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(Error::VectorStore("down".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_maps_to_500() {
        assert_eq!(
            status_of(Error::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
