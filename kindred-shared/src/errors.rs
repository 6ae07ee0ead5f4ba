use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Identity errors
/// - E2xxx: Member, photo and like errors
/// - E4xxx: Messaging errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    Unauthorized,
    PayloadTooLarge,
    WriteFailed,
    ReadFailed,

    // Identity (E1xxx)
    TokenExpired,
    TokenInvalid,

    // Members (E2xxx)
    UserNotFound,
    UsernameTaken,
    PhotoUploadFailed,
    PhotoNotFound,
    PhotoAlreadyMain,
    CannotDeleteMainPhoto,
    CannotLikeSelf,
    LikeAlreadyExists,

    // Messaging (E4xxx)
    NotMessageParticipant,
    MessageNotFound,
    CannotMessageSelf,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::Unauthorized => "E0004",
            Self::PayloadTooLarge => "E0009",
            Self::WriteFailed => "E0010",
            Self::ReadFailed => "E0011",

            // Identity
            Self::TokenExpired => "E1004",
            Self::TokenInvalid => "E1005",

            // Members
            Self::UserNotFound => "E2001",
            Self::UsernameTaken => "E2002",
            Self::PhotoUploadFailed => "E2004",
            Self::PhotoNotFound => "E2005",
            Self::PhotoAlreadyMain => "E2006",
            Self::CannotDeleteMainPhoto => "E2007",
            Self::CannotLikeSelf => "E2008",
            Self::LikeAlreadyExists => "E2009",

            // Messaging
            Self::NotMessageParticipant => "E4002",
            Self::MessageNotFound => "E4003",
            Self::CannotMessageSelf => "E4005",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::WriteFailed | Self::ReadFailed => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ValidationError | Self::PhotoUploadFailed
            | Self::PhotoAlreadyMain | Self::CannotDeleteMainPhoto
            | Self::CannotLikeSelf | Self::CannotMessageSelf => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UserNotFound | Self::PhotoNotFound | Self::MessageNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid
            | Self::NotMessageParticipant => StatusCode::UNAUTHORIZED,
            Self::UsernameTaken | Self::LikeAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Storage commit failure. The cause is logged, never returned to the caller.
    pub fn write_failed(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "storage write failed");
        Self::new(ErrorCode::WriteFailed, "failed to save changes")
    }

    /// Storage query failure. The cause is logged, never returned to the caller.
    pub fn read_failed(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "storage read failed");
        Self::new(ErrorCode::ReadFailed, "failed to load data")
    }

    /// The error code carried by a known error, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            AppError::Internal(_) => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(errors.field_errors()).unwrap_or_default();
        Self::with_details(ErrorCode::ValidationError, "request validation failed", details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(ErrorCode::InternalError.code(), "internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
