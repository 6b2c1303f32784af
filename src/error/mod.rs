use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::audit::AuditError;
use crate::queue::QueueError;
use crate::shard::ShardError;
use crate::tag::TagError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Every violated input field, reported together
    #[error("Validation error: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }
}

impl From<ShardError> for AppError {
    fn from(err: ShardError) -> Self {
        match err {
            ShardError::Config(msg) => AppError::Internal(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<TagError> for AppError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::Validation(errors) => AppError::Validation(errors),
            TagError::Shard(e) => e.into(),
        }
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Shard(e) => e.into(),
            QueueError::Encode(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<AuditError> for AppError {
    fn from(err: AuditError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Validation failures list every problem; server-side failures carry one
/// message.
#[derive(Serialize)]
#[serde(untagged)]
enum ErrorDetail {
    List(Vec<String>),
    Message(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    errors: ErrorDetail,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn redact(message: &str, generic: &str) -> String {
    if is_production() {
        generic.to_string()
    } else {
        message.to_string()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, detail, log_message) = match &self {
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                ErrorDetail::List(errors.clone()),
                errors.join(", "),
            ),
            AppError::Config(e) => {
                let log_msg = e.to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    ErrorDetail::Message(redact(&log_msg, "Configuration error")),
                    log_msg,
                )
            }
            AppError::Storage(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                ErrorDetail::Message(redact(msg, "Storage temporarily unavailable")),
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                ErrorDetail::Message(redact(msg, "Internal server error")),
                msg.clone(),
            ),
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        (status, Json(ErrorResponse { errors: detail })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
