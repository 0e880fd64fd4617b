use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error(
        "Language data not installed: {} (available: {})",
        missing.join(", "),
        available.join(", ")
    )]
    UnsupportedLanguage {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("OCR engine failed: {0}")]
    EngineInvocationFailed(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Upload exceeds the {max} byte limit")]
    UploadTooLarge { max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            OcrError::InvalidInput(_) => "INVALID_INPUT",
            OcrError::EngineUnavailable(_) => "ENGINE_UNAVAILABLE",
            OcrError::UnsupportedLanguage { .. } => "UNSUPPORTED_LANGUAGE",
            OcrError::EngineInvocationFailed(_) => "ENGINE_FAILED",
            OcrError::ImageTooLarge { .. } | OcrError::UploadTooLarge { .. } => "IMAGE_TOO_LARGE",
            OcrError::MissingFile => "MISSING_FILE",
            OcrError::InvalidRequest(_) => "INVALID_REQUEST",
            OcrError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            OcrError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            OcrError::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            OcrError::UnsupportedLanguage { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            OcrError::EngineInvocationFailed(_) => StatusCode::BAD_GATEWAY,
            OcrError::ImageTooLarge { .. } | OcrError::UploadTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            OcrError::MissingFile => StatusCode::BAD_REQUEST,
            OcrError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            OcrError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_language_message_lists_codes() {
        let err = OcrError::UnsupportedLanguage {
            missing: vec!["xyz".to_string()],
            available: vec!["eng".to_string(), "osd".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("xyz"));
        assert!(msg.contains("eng, osd"));
        assert_eq!(err.code(), "UNSUPPORTED_LANGUAGE");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            OcrError::InvalidInput("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            OcrError::EngineUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            OcrError::ImageTooLarge { size: 2, max: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        let upload = OcrError::UploadTooLarge { max: 1_000 };
        assert_eq!(upload.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(upload.code(), "IMAGE_TOO_LARGE");
    }
}
