use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;
use thiserror::Error;

use crate::shared::types::ErrorResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Suggestion service error: {}", describe_upstream(.status, .body))]
    ExternalServiceError { status: Option<u16>, body: String },

    #[error("Suggestion service timed out after {0:?}")]
    SuggestionTimeout(Duration),

    #[error("Suggestion service is not configured (set SUGGESTION_API_KEY)")]
    SuggestionNotConfigured,
}

fn describe_upstream(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("upstream returned {}: {}", code, body),
        None => format!("request failed: {}", body),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Storage(ref e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error occurred".to_string(),
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Conflict(ref msg) => {
                tracing::error!("Invariant violation: {}", msg);
                (StatusCode::CONFLICT, msg.clone())
            }
            AppError::PayloadTooLarge(ref msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::ExternalServiceError { .. }
            | AppError::SuggestionTimeout(_)
            | AppError::SuggestionNotConfigured => {
                tracing::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(ErrorResponse { error: message });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::PayloadTooLarge("x".into()),
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                AppError::SuggestionNotConfigured,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::SuggestionTimeout(Duration::from_secs(20)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_upstream_status_and_body_in_message() {
        let error = AppError::ExternalServiceError {
            status: Some(429),
            body: "rate limited".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("429"));
        assert!(message.contains("rate limited"));

        let unreachable = AppError::ExternalServiceError {
            status: None,
            body: "connection refused".to_string(),
        };
        assert!(unreachable.to_string().contains("request failed"));
    }

    #[test]
    fn test_not_configured_is_distinct_from_upstream_failure() {
        let not_configured = AppError::SuggestionNotConfigured.to_string();
        let upstream = AppError::ExternalServiceError {
            status: Some(500),
            body: String::new(),
        }
        .to_string();
        assert_ne!(not_configured, upstream);
        assert!(not_configured.contains("not configured"));
    }
}
