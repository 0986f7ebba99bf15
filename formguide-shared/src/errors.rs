use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Auth errors
/// - E2xxx: Profile errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    BadRequest,
    PayloadTooLarge,

    // Auth (E1xxx)
    InvalidCredentials,
    EmailAlreadyExists,
    EmailNotVerified,
    VerificationTokenInvalid,
    OtpInvalid,
    EmailDeliveryFailed,

    // Profile (E2xxx)
    DocumentMissing,
    DocumentKeyMissing,
    DocumentUploadFailed,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::BadRequest => "E0008",
            Self::PayloadTooLarge => "E0009",

            // Auth
            Self::InvalidCredentials => "E1001",
            Self::EmailAlreadyExists => "E1002",
            Self::EmailNotVerified => "E1003",
            Self::VerificationTokenInvalid => "E1004",
            Self::OtpInvalid => "E1005",
            Self::EmailDeliveryFailed => "E1006",

            // Profile
            Self::DocumentMissing => "E2001",
            Self::DocumentKeyMissing => "E2002",
            Self::DocumentUploadFailed => "E2003",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::EmailDeliveryFailed
            | Self::DocumentUploadFailed => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::VerificationTokenInvalid
            | Self::OtpInvalid | Self::DocumentMissing | Self::DocumentKeyMissing => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailNotVerified => StatusCode::FORBIDDEN,
            Self::EmailAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known { code: ErrorCode, message: String },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
        }
    }

    /// Every gate rejection renders the same body regardless of cause.
    pub fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized, "not authorized")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code this error renders with.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(diesel::result::Error::NotFound) => ErrorCode::NotFound,
            AppError::Database(_) => ErrorCode::InternalError,
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message } => {
                let status = code.status_code();
                // 5xx messages are logged and replaced, never echoed to the caller
                let resp = if status.is_server_error() {
                    tracing::error!(code = code.code(), error = %message, "request failed");
                    ApiErrorResponse::new(code.code(), "internal server error")
                } else {
                    ApiErrorResponse::new(code.code(), message)
                };
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
