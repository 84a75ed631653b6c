use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use warbler_db::DbError;

use crate::templates;

/// Errors a handler can end with. Internal details are logged, never rendered.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("session error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    #[error("background task failed")]
    Join,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => (StatusCode::NOT_FOUND, Html(templates::not_found())).into_response(),
            Self::Forbidden => (StatusCode::FORBIDDEN, Html(templates::forbidden())).into_response(),
            other => {
                error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(templates::server_error())).into_response()
            }
        }
    }
}
