//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion to the coded error-list
//! wire format: `{"errors": [{"code": int, "msg": string}, ...]}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Wire-level error codes shared with API clients.
pub const CODE_INVALID_JSON_SCHEMA: u16 = 0;
pub const CODE_INVALID_EMAIL: u16 = 1;
pub const CODE_DUPLICATE_EMAIL: u16 = 2;
pub const CODE_INVALID_PASSWORD: u16 = 3;
pub const CODE_INVALID_NAME: u16 = 4;
pub const CODE_CANCELLED: u16 = 900;
pub const CODE_DEADLINE_EXCEEDED: u16 = 901;
pub const CODE_UNKNOWN: u16 = 999;

/// Application error types.
///
/// One closed enum per process; every layer boundary translates into it
/// explicitly instead of matching on error identity chains.
#[derive(Error, Debug)]
pub enum AppError {
    // Infrastructure: transaction lifecycle
    #[error("failed to acquire database connection")]
    ConnectionAcquisition(#[source] DbErr),

    #[error("failed to begin transaction")]
    TransactionBegin(#[source] DbErr),

    #[error("failed to commit transaction")]
    Commit(#[source] DbErr),

    #[error("failed to roll back transaction")]
    Rollback(#[source] DbErr),

    // Domain
    #[error("duplicate email")]
    DuplicateEmail(#[source] DbErr),

    #[error("user not found")]
    UserNotFound,

    #[error("wrong credentials")]
    WrongCredentials,

    #[error("authentication required")]
    Unauthorized,

    // Request validation (already coded per field)
    #[error("invalid request")]
    Validation(Vec<ErrorDescription>),

    /// A failure whose local rollback also failed. Both halves are kept
    /// so neither gets silently dropped on the way out.
    #[error("{0}; rollback also failed: {1}")]
    Joined(Box<AppError>, Box<AppError>),

    // External services
    #[error("database error")]
    Database(#[from] DbErr),

    #[error("cache error")]
    Cache(#[from] redis::RedisError),

    // Internal
    #[error("{0}")]
    Internal(String),
}

/// Single entry of the error-list response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescription {
    pub code: u16,
    pub msg: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDescription>,
}

impl AppError {
    /// Join a failure with the error of its follow-up rollback attempt.
    pub fn joined(failure: AppError, rollback: AppError) -> Self {
        AppError::Joined(Box::new(failure), Box::new(rollback))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// HTTP status before the unknown-entry override is applied.
    fn status(&self) -> StatusCode {
        match self {
            AppError::UserNotFound | AppError::WrongCredentials | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::DuplicateEmail(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ConnectionAcquisition(_) => StatusCode::REQUEST_TIMEOUT,
            AppError::Joined(failure, _) => failure.status(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-visible entries. Credential failures carry none: they map
    /// to a bare status so the response leaks nothing about the account.
    fn descriptions(&self) -> Vec<ErrorDescription> {
        match self {
            AppError::UserNotFound | AppError::WrongCredentials | AppError::Unauthorized => {
                Vec::new()
            }
            AppError::DuplicateEmail(_) => vec![ErrorDescription {
                code: CODE_DUPLICATE_EMAIL,
                msg: "duplicate email".to_string(),
            }],
            AppError::ConnectionAcquisition(_) => vec![ErrorDescription {
                code: CODE_DEADLINE_EXCEEDED,
                msg: "deadline exceeded".to_string(),
            }],
            AppError::Validation(errors) => errors.clone(),
            AppError::Joined(failure, rollback) => {
                let mut entries = failure.descriptions();
                entries.extend(rollback.descriptions());
                entries
            }
            other => vec![ErrorDescription {
                code: CODE_UNKNOWN,
                msg: format!("unknown error: {}", chain_message(other)),
            }],
        }
    }
}

/// Render an error with its full source chain, `outer: inner: ...`.
fn chain_message(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut status = self.status();
        let errors = self.descriptions();

        // Any unknown-class entry overrides whatever status was chosen.
        if errors.iter().any(|e| e.code == CODE_UNKNOWN) {
            status = StatusCode::INTERNAL_SERVER_ERROR;
        }

        if status.is_server_error() {
            tracing::error!(error = %chain_message(&self), "request failed");
        }

        if errors.is_empty() {
            return status.into_response();
        }

        (status, Json(ErrorResponse { errors })).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;
