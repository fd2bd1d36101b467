//! HTTP-facing errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gr_core::ReplayError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("No active replay")]
    NoReplay,

    #[error("A replay is already active. Delete it first.")]
    ReplayActive,

    #[error("Session unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to load session: {0:#}")]
    Load(anyhow::Error),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NoReplay => StatusCode::NOT_FOUND,
            ServerError::ReplayActive => StatusCode::CONFLICT,
            ServerError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::BadRequest(_) | ServerError::Load(_) | ServerError::Replay(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}
