//! Structured API error responses with error codes
//!
//! Every failing endpoint answers with
//! `{ "error": { code, numeric_code, message, ... } }` and an `x-error-code`
//! header carrying the same code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::infra::ServiceError;

// ============================================================================
// Error Codes
// ============================================================================

/// Error codes for API responses
///
/// These codes are stable and can be used by clients for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication errors (1xxx)
    /// Caller must be signed in
    AuthRequired,

    // Validation errors (3xxx)
    /// Request body is malformed
    InvalidRequestBody,
    /// Required field is missing
    MissingRequiredField,
    /// Field value is invalid
    InvalidFieldValue,

    // Resource errors (4xxx)
    /// Asset not found
    AssetNotFound,

    // Verification errors (6xxx)
    /// No verification stage confirmed the view count
    VerificationFailed,
    /// A submitted proof failed witness verification
    ProofRejected,

    // Infrastructure errors (8xxx)
    /// Database operation failed
    DatabaseError,
    /// Required configuration missing
    NotConfigured,
    /// Upstream dependency failed
    UpstreamError,
    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn numeric_code(&self) -> u32 {
        match self {
            ErrorCode::AuthRequired => 1001,

            ErrorCode::InvalidRequestBody => 3001,
            ErrorCode::MissingRequiredField => 3002,
            ErrorCode::InvalidFieldValue => 3003,

            ErrorCode::AssetNotFound => 4002,

            ErrorCode::VerificationFailed => 6001,
            ErrorCode::ProofRejected => 6002,

            ErrorCode::DatabaseError => 8001,
            ErrorCode::NotConfigured => 8002,
            ErrorCode::UpstreamError => 8003,
            ErrorCode::InternalError => 8999,
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::AuthRequired => StatusCode::UNAUTHORIZED,

            ErrorCode::InvalidRequestBody
            | ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::ProofRejected => StatusCode::BAD_REQUEST,

            ErrorCode::AssetNotFound => StatusCode::NOT_FOUND,

            ErrorCode::VerificationFailed => StatusCode::UNPROCESSABLE_ENTITY,

            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ErrorCode::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::UpstreamError => StatusCode::BAD_GATEWAY,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code_str = match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::InvalidFieldValue => "INVALID_FIELD_VALUE",
            ErrorCode::AssetNotFound => "ASSET_NOT_FOUND",
            ErrorCode::VerificationFailed => "VERIFICATION_FAILED",
            ErrorCode::ProofRejected => "PROOF_REJECTED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::NotConfigured => "NOT_CONFIGURED",
            ErrorCode::UpstreamError => "UPSTREAM_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", code_str)
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Structured error response for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error details
    pub error: ErrorDetails,
}

/// Detailed error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Numeric error code for easy categorization
    pub numeric_code: u32,

    /// Human-readable error message
    pub message: String,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// Related resource ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetails {
                code,
                numeric_code: code.numeric_code(),
                message: message.into(),
                details: None,
                resource_id: None,
            },
        }
    }

    /// Set additional details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Set related resource ID
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.error.resource_id = Some(id.into());
        self
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.error.code.http_status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code_str = self.error.code.to_string();
        let mut response = (status, Json(self)).into_response();

        if let Ok(code_value) = axum::http::HeaderValue::from_str(&code_str) {
            response.headers_mut().insert(
                axum::http::header::HeaderName::from_static("x-error-code"),
                code_value,
            );
        }

        response
    }
}

// ============================================================================
// Conversion from ServiceError
// ============================================================================

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::AssetNotFound(id) => {
                ApiError::new(ErrorCode::AssetNotFound, "Asset not found")
                    .with_resource_id(id.to_string())
            }
            ServiceError::Configuration(msg) => ApiError::new(ErrorCode::NotConfigured, msg),
            ServiceError::Persistence(e) => {
                ApiError::new(ErrorCode::DatabaseError, format!("Database error: {}", e))
            }
            ServiceError::ExternalService(msg) => ApiError::new(ErrorCode::UpstreamError, msg),
            ServiceError::VerificationFailed { asset_id, expected } => ApiError::new(
                ErrorCode::VerificationFailed,
                format!("Could not verify view count for asset {}", asset_id),
            )
            .with_resource_id(asset_id.to_string())
            .with_details(serde_json::json!({ "expected": expected })),
            ServiceError::InvalidInput(msg) => ApiError::new(ErrorCode::InvalidFieldValue, msg),
            ServiceError::Internal(msg) => ApiError::new(ErrorCode::InternalError, msg),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a missing field error
pub fn missing_field(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::MissingRequiredField, message.into())
        .with_details(serde_json::json!({ "field": field }))
}

/// Create a validation error with field details
pub fn validation_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(ErrorCode::InvalidFieldValue, message.into())
        .with_details(serde_json::json!({ "field": field }))
}

// ============================================================================
// Tests
// ============================================================================
