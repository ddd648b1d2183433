use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // 5xx detail goes into `errors`; the client-facing message stays generic.
        let (status, message, detail) = match self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::InvalidState(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Internal(msg) | AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error".to_string(),
                Some(msg),
            ),
            AppError::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "Upstream service error".to_string(),
                Some(msg),
            ),
        };

        match &detail {
            Some(detail) => tracing::error!("Error: {}: {} ({})", status, message, detail),
            None => tracing::error!("Error: {}: {}", status, message),
        }

        let errors: Vec<String> = detail.into_iter().collect();
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": message,
            "errors": errors,
            "success": false
        }));

        (status, body).into_response()
    }
}
