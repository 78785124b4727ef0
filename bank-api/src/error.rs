/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; `ApiError` renders as a JSON body
/// with a machine-readable `error` code and a `message`.
///
/// | Source                         | Status | `error`                     |
/// |--------------------------------|--------|-----------------------------|
/// | `ErrorCode::*NotFound`         | 404    | the code, e.g. `USER_NOT_FOUND` |
/// | other `ErrorCode`              | 400    | the code                    |
/// | request validation             | 422    | `validation_error`          |
/// | `StoreError::Conflict`         | 409    | `conflict`                  |
/// | other store failures           | 500    | `internal_error`            |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bank_shared::error::{BankError, ErrorCode, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::ValidationErrors;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// A business rule rejected the request
    #[error("Rejected: {0}")]
    Rejected(ErrorCode),

    /// Unprocessable entity (422)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Conflict (409), e.g. two requests raced for the same account number
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g. "USER_NOT_FOUND", "validation_error")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Field errors for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Rejected(code) => {
                let status = if code.is_not_found() {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::BAD_REQUEST
                };
                (
                    status,
                    code.as_str().to_string(),
                    code.description().to_string(),
                    None,
                )
            }
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error".to_string(),
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Conflict(msg) => {
                tracing::warn!(constraint = %msg, "Write conflict");
                (
                    StatusCode::CONFLICT,
                    "conflict".to_string(),
                    "The request conflicted with a concurrent change, try again".to_string(),
                    None,
                )
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error".to_string(),
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code,
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<BankError> for ApiError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::Rejected(code) => ApiError::Rejected(code),
            BankError::Store(StoreError::Conflict(constraint)) => ApiError::Conflict(constraint),
            BankError::Store(other) => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(details)
    }
}
