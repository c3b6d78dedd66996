// src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum PollError {
    #[error("All fields are required!")]
    Validation { field: &'static str },

    #[error("Poll not found!")]
    PollNotFound,

    #[error("This poll is closed!")]
    PollClosed,

    #[error("Invalid vote!")]
    InvalidOption,

    #[error("You have already voted on this poll!")]
    DuplicateVote,

    #[error("Only the poll creator can close this poll!")]
    NotAuthorized,

    #[error("Poll id {0} is already taken")]
    DuplicateId(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Handlers recover every user-facing variant into a redirect, so only
/// storage failures normally reach the client this way.
impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        match self {
            PollError::Database(e) => {
                error!("Request failed on storage: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
            other => (StatusCode::BAD_REQUEST, other.to_string()).into_response(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid configuration for {key}: {reason}")]
    Config { key: &'static str, reason: String },

    #[error("Database setup failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
