//! Error types for the REALMS server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Coarse error classification used to pick the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    PolicyViolation,
    Unauthorized,
    Internal,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("validate: {0}")]
    InvalidInput(String),

    #[error("database: user not found")]
    UserNotFound,

    #[error("database: book not found")]
    BookNotFound,

    #[error("database: record not found")]
    RecordNotFound,

    #[error("library: book not borrowed")]
    NotBorrowed,

    #[error("database: username already exists")]
    DuplicateUsername,

    #[error("library: book already borrowed")]
    AlreadyBorrowed,

    #[error("library: too many overdue books, borrowing suspended")]
    SuspendedUser,

    #[error("library: extended too many times")]
    ExceedMaxExtendTimes,

    #[error("auth: unauthorized")]
    Unauthorized,

    #[error("auth: incorrect password")]
    CredentialMismatch,

    #[error("auth: already logged in")]
    AlreadyActive,

    #[error("auth: invalid session token")]
    NoActiveSession,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    Session(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::UserNotFound
            | AppError::BookNotFound
            | AppError::RecordNotFound
            | AppError::NotBorrowed => ErrorKind::NotFound,
            AppError::DuplicateUsername | AppError::AlreadyBorrowed | AppError::AlreadyActive => {
                ErrorKind::Conflict
            }
            AppError::SuspendedUser | AppError::ExceedMaxExtendTimes => ErrorKind::PolicyViolation,
            AppError::Unauthorized | AppError::CredentialMismatch | AppError::NoActiveSession => {
                ErrorKind::Unauthorized
            }
            AppError::Database(_) | AppError::Session(_) | AppError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PolicyViolation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "database: internal error".to_string()
            }
            AppError::Session(msg) => {
                tracing::error!("Session store error: {}", msg);
                "auth: failed to save session".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());
        AppError::InvalidInput(message)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// True when the error is a unique constraint violation reported by the store
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}
