use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;
use wikitree_core::wire::SidebarResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Failures still answer with the empty tree so the client simply shows no
/// sidebar.
impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!("Sidebar request failed: {self:#}");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(SidebarResponse::empty())).into_response()
    }
}
