//! Application-wide error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SantaError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Email delivery error: {0}")]
    Email(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Missing or invalid manager token")]
    Unauthorized,
}

pub type Result<T> = std::result::Result<T, SantaError>;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl SantaError {
    pub fn status(&self) -> StatusCode {
        match self {
            SantaError::NotFound(_) => StatusCode::NOT_FOUND,
            SantaError::Validation(_) => StatusCode::BAD_REQUEST,
            SantaError::Conflict(_) => StatusCode::CONFLICT,
            SantaError::Unauthorized => StatusCode::UNAUTHORIZED,
            SantaError::Email(_) | SantaError::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SantaError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// True when `err` is a SQLite UNIQUE constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}
