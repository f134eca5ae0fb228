use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

/// Enumerable error kinds exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UserNotFound,
    FilmNotFound,
    ListNotFound,
    InvalidRating,
    InvalidInput,
    UnauthorizedAccess,
    Unauthenticated,
    StoreUnavailable,
    ExternalApi,
    Internal,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Film not found: {0}")]
    FilmNotFound(String),

    /// Also returned when the list exists but belongs to someone else
    #[error("List not found: {0}")]
    ListNotFound(String),

    #[error("Rating must be between {min} and {max}, got {got}")]
    InvalidRating { got: i32, min: u8, max: u8 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not allowed to view this list")]
    UnauthorizedAccess,

    #[error("Missing caller identity")]
    Unauthenticated,

    #[error("Database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::UserNotFound(_) => ErrorKind::UserNotFound,
            AppError::FilmNotFound(_) => ErrorKind::FilmNotFound,
            AppError::ListNotFound(_) => ErrorKind::ListNotFound,
            AppError::InvalidRating { .. } => ErrorKind::InvalidRating,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::UnauthorizedAccess => ErrorKind::UnauthorizedAccess,
            AppError::Unauthenticated => ErrorKind::Unauthenticated,
            AppError::Store(e) if is_outage(e) => ErrorKind::StoreUnavailable,
            AppError::Cache(_) => ErrorKind::StoreUnavailable,
            AppError::HttpClient(_) | AppError::ExternalApi(_) => ErrorKind::ExternalApi,
            AppError::Store(_) | AppError::Migration(_) | AppError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Only store outages are worth retrying; everything else is permanent for the input.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StoreUnavailable
    }
}

/// Connection-level failures; query, decode and constraint errors are bugs, not outages
fn is_outage(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, message) = match kind {
            ErrorKind::UserNotFound | ErrorKind::FilmNotFound | ErrorKind::ListNotFound => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ErrorKind::InvalidRating | ErrorKind::InvalidInput => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ErrorKind::UnauthorizedAccess => (StatusCode::FORBIDDEN, self.to_string()),
            ErrorKind::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            ErrorKind::StoreUnavailable => {
                tracing::error!(error = %self, "Store failure");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage is temporarily unavailable".to_string(),
                )
            }
            ErrorKind::ExternalApi => {
                tracing::error!(error = %self, "Upstream failure");
                (StatusCode::BAD_GATEWAY, "Upstream service failed".to_string())
            }
            ErrorKind::Internal => {
                tracing::error!(error = %self, "Internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": kind,
            "message": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
