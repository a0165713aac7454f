use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::comparison::CompareError;
use crate::extraction::ExtractError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upload exceeds the configured size limit")]
    PayloadTooLarge,

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("No API credential supplied for this session")]
    MissingCredential,

    #[error("Comparison unavailable: {0}")]
    ComparisonUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractError> for AppError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::UnsupportedFormat(_) => AppError::UnsupportedFormat(err.to_string()),
            ExtractError::CorruptDocument { .. } => AppError::CorruptDocument(err.to_string()),
            ExtractError::Decode(_) => AppError::Decode(err.to_string()),
            ExtractError::OcrUnavailable(_) => AppError::OcrUnavailable(err.to_string()),
        }
    }
}

impl From<CompareError> for AppError {
    fn from(err: CompareError) -> Self {
        AppError::ComparisonUnavailable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                self.to_string(),
            ),
            AppError::UnsupportedFormat(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "UNSUPPORTED_FORMAT",
                msg.clone(),
            ),
            AppError::CorruptDocument(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CORRUPT_DOCUMENT",
                msg.clone(),
            ),
            AppError::Decode(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "DECODE_ERROR", msg.clone())
            }
            AppError::OcrUnavailable(msg) => {
                tracing::error!("OCR error: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "OCR_UNAVAILABLE",
                    "Text recognition is not available for images right now".to_string(),
                )
            }
            AppError::MissingCredential => (
                StatusCode::PRECONDITION_REQUIRED,
                "MISSING_CREDENTIAL",
                "Enter an API key to enable document comparison".to_string(),
            ),
            AppError::ComparisonUnavailable(msg) => {
                tracing::error!("Comparison error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "COMPARISON_UNAVAILABLE",
                    "The comparison could not be completed. It is not retried automatically: \
                     enter the API key again or re-upload a document to try again."
                        .to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
