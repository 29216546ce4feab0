use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::database::StoreError;
use crate::services::blockchain_service::ChainError;
use crate::services::ipfs_service::IpfsError;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error codes for categorizing errors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Authentication errors (1xxx)
    #[serde(rename = "AUTH_1001")]
    InvalidCredentials,
    #[serde(rename = "AUTH_1002")]
    TokenExpired,
    #[serde(rename = "AUTH_1003")]
    TokenInvalid,
    #[serde(rename = "AUTH_1004")]
    TokenMissing,

    // Authorization errors (2xxx)
    #[serde(rename = "AUTHZ_2002")]
    ResourceAccessDenied,
    #[serde(rename = "AUTHZ_2003")]
    RoleNotAuthorized,

    // Validation errors (3xxx)
    #[serde(rename = "VAL_3001")]
    InvalidInput,
    #[serde(rename = "VAL_3003")]
    InvalidFormat,
    #[serde(rename = "VAL_3004")]
    InvalidWalletAddress,
    #[serde(rename = "VAL_3005")]
    InvalidAmount,

    // Resource errors (4xxx)
    #[serde(rename = "RES_4001")]
    NotFound,
    #[serde(rename = "RES_4002")]
    AlreadyExists,

    // Business logic errors (5xxx)
    #[serde(rename = "BIZ_5001")]
    InsufficientCredits,
    #[serde(rename = "BIZ_5002")]
    InvalidStatusTransition,
    #[serde(rename = "BIZ_5003")]
    ListingNotActive,
    #[serde(rename = "BIZ_5004")]
    SelfPurchase,

    // Blockchain errors (6xxx)
    #[serde(rename = "BC_6002")]
    BlockchainTransactionFailed,

    // Storage errors (7xxx)
    #[serde(rename = "DB_7001")]
    StorageFailed,
    #[serde(rename = "DB_7002")]
    QueryFailed,

    // External service errors (8xxx)
    #[serde(rename = "EXT_8001")]
    ExternalServiceUnavailable,
    #[serde(rename = "EXT_8002")]
    ExternalServiceError,

    // Internal errors (9xxx)
    #[serde(rename = "INT_9999")]
    InternalServerError,
    #[serde(rename = "INT_9998")]
    ConfigurationError,
}

impl ErrorCode {
    /// Get numeric code
    pub fn code(&self) -> u16 {
        match self {
            ErrorCode::InvalidCredentials => 1001,
            ErrorCode::TokenExpired => 1002,
            ErrorCode::TokenInvalid => 1003,
            ErrorCode::TokenMissing => 1004,

            ErrorCode::ResourceAccessDenied => 2002,
            ErrorCode::RoleNotAuthorized => 2003,

            ErrorCode::InvalidInput => 3001,
            ErrorCode::InvalidFormat => 3003,
            ErrorCode::InvalidWalletAddress => 3004,
            ErrorCode::InvalidAmount => 3005,

            ErrorCode::NotFound => 4001,
            ErrorCode::AlreadyExists => 4002,

            ErrorCode::InsufficientCredits => 5001,
            ErrorCode::InvalidStatusTransition => 5002,
            ErrorCode::ListingNotActive => 5003,
            ErrorCode::SelfPurchase => 5004,

            ErrorCode::BlockchainTransactionFailed => 6002,

            ErrorCode::StorageFailed => 7001,
            ErrorCode::QueryFailed => 7002,

            ErrorCode::ExternalServiceUnavailable => 8001,
            ErrorCode::ExternalServiceError => 8002,

            ErrorCode::InternalServerError => 9999,
            ErrorCode::ConfigurationError => 9998,
        }
    }

    /// Get user-friendly message
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Your session has expired. Please log in again",
            ErrorCode::TokenInvalid => "Invalid authentication token",
            ErrorCode::TokenMissing => "Authentication required. Please log in",

            ErrorCode::ResourceAccessDenied => "Access to this resource is denied",
            ErrorCode::RoleNotAuthorized => "Your role is not authorized for this action",

            ErrorCode::InvalidInput => "Invalid input provided",
            ErrorCode::InvalidFormat => "Invalid format provided",
            ErrorCode::InvalidWalletAddress => "Invalid wallet address format",
            ErrorCode::InvalidAmount => "Invalid amount provided",

            ErrorCode::NotFound => "The requested resource was not found",
            ErrorCode::AlreadyExists => "This resource already exists",

            ErrorCode::InsufficientCredits => "Not enough credits available for this operation",
            ErrorCode::InvalidStatusTransition => "The record is not in a state that allows this",
            ErrorCode::ListingNotActive => "This listing is no longer active",
            ErrorCode::SelfPurchase => "Producers cannot purchase their own listings",

            ErrorCode::BlockchainTransactionFailed => "Blockchain transaction failed",

            ErrorCode::StorageFailed => "Failed to persist data",
            ErrorCode::QueryFailed => "Database query failed",

            ErrorCode::ExternalServiceUnavailable => "External service is currently unavailable",
            ErrorCode::ExternalServiceError => "External service error occurred",

            ErrorCode::InternalServerError => "An internal server error occurred",
            ErrorCode::ConfigurationError => "Server configuration error",
        }
    }
}

/// Structured error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
    pub request_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub code_number: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Blockchain error: {0}")]
    Blockchain(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("{1}")]
    WithCode(ErrorCode, String),

    #[error("{1}")]
    WithCodeAndDetails(ErrorCode, String, String),

    #[error("Validation failed: {field}")]
    ValidationWithField {
        code: ErrorCode,
        field: String,
        message: String,
    },
}

impl ApiError {
    /// Create error with specific error code
    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError::WithCode(code, message.into())
    }

    /// Create error with code and additional details
    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        ApiError::WithCodeAndDetails(code, message.into(), details.into())
    }

    /// Create validation error for specific field
    pub fn validation_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::ValidationWithField {
            code: ErrorCode::InvalidInput,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_credentials() -> Self {
        ApiError::with_code(ErrorCode::InvalidCredentials, "Invalid credentials")
    }

    pub fn not_found(resource: &str) -> Self {
        ApiError::with_code(ErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn already_exists(resource: &str) -> Self {
        ApiError::with_code(
            ErrorCode::AlreadyExists,
            format!("{} already exists", resource),
        )
    }

    pub fn invalid_wallet() -> Self {
        ApiError::with_code(ErrorCode::InvalidWalletAddress, "Invalid wallet address")
    }

    pub fn role_not_authorized(message: impl Into<String>) -> Self {
        ApiError::with_code(ErrorCode::RoleNotAuthorized, message)
    }

    pub fn invalid_transition(message: impl Into<String>) -> Self {
        ApiError::with_code(ErrorCode::InvalidStatusTransition, message)
    }

    pub fn insufficient_credits(available: impl std::fmt::Display) -> Self {
        ApiError::with_details(
            ErrorCode::InsufficientCredits,
            "Insufficient credits",
            format!("Available: {}", available),
        )
    }

    /// Get error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ApiError::Unauthorized(_) => ErrorCode::TokenMissing,
            ApiError::Validation(_) => ErrorCode::InvalidInput,
            ApiError::Store(StoreError::Duplicate(_)) => ErrorCode::AlreadyExists,
            ApiError::Store(StoreError::NotFound(_)) => ErrorCode::NotFound,
            ApiError::Store(StoreError::Database(_)) => ErrorCode::QueryFailed,
            ApiError::Store(_) => ErrorCode::StorageFailed,
            ApiError::Blockchain(_) => ErrorCode::BlockchainTransactionFailed,
            ApiError::ExternalService(_) => ErrorCode::ExternalServiceError,
            ApiError::Configuration(_) => ErrorCode::ConfigurationError,
            ApiError::Internal(_) => ErrorCode::InternalServerError,
            ApiError::WithCode(code, _) => *code,
            ApiError::WithCodeAndDetails(code, _, _) => *code,
            ApiError::ValidationWithField { code, .. } => *code,
        }
    }

    fn error_details(&self) -> Option<String> {
        match self {
            ApiError::WithCodeAndDetails(_, _, details) => Some(details.clone()),
            _ => None,
        }
    }

    fn error_field(&self) -> Option<String> {
        match self {
            ApiError::ValidationWithField { field, .. } => Some(field.clone()),
            _ => None,
        }
    }

    /// Get status code
    pub fn status_code(&self) -> StatusCode {
        match self.error_code() {
            ErrorCode::InvalidCredentials
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid
            | ErrorCode::TokenMissing => StatusCode::UNAUTHORIZED,

            ErrorCode::ResourceAccessDenied
            | ErrorCode::RoleNotAuthorized => StatusCode::FORBIDDEN,

            ErrorCode::InvalidInput
            | ErrorCode::InvalidFormat
            | ErrorCode::InvalidWalletAddress
            | ErrorCode::InvalidAmount
            | ErrorCode::InsufficientCredits
            | ErrorCode::SelfPurchase => StatusCode::BAD_REQUEST,

            ErrorCode::NotFound => StatusCode::NOT_FOUND,

            ErrorCode::AlreadyExists
            | ErrorCode::InvalidStatusTransition
            | ErrorCode::ListingNotActive => StatusCode::CONFLICT,

            ErrorCode::BlockchainTransactionFailed
            | ErrorCode::ExternalServiceUnavailable
            | ErrorCode::ExternalServiceError => StatusCode::BAD_GATEWAY,

            ErrorCode::StorageFailed
            | ErrorCode::QueryFailed
            | ErrorCode::InternalServerError
            | ErrorCode::ConfigurationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log error with appropriate level
    fn log_error(&self, request_id: &str) {
        match self.status_code() {
            status if status.is_server_error() => {
                error!(
                    request_id = %request_id,
                    error = %self,
                    "Server error occurred"
                );
            }
            status if status.is_client_error() => {
                warn!(
                    request_id = %request_id,
                    error = %self,
                    "Client error occurred"
                );
            }
            _ => {}
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let status = self.status_code();
        let code = self.error_code();

        self.log_error(&request_id);

        let message = match &self {
            ApiError::WithCode(_, msg) | ApiError::WithCodeAndDetails(_, msg, _) => msg.clone(),
            ApiError::ValidationWithField { message, .. } => message.clone(),
            ApiError::Validation(msg) | ApiError::Unauthorized(msg) => msg.clone(),
            _ => code.message().to_string(),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code,
                code_number: code.code(),
                message,
                details: self.error_details(),
                field: self.error_field(),
            },
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Report the first failing field; the full set goes into details.
        let field = errors
            .field_errors()
            .keys()
            .next()
            .map(|f| f.to_string())
            .unwrap_or_default();
        if field.is_empty() {
            return ApiError::Validation(errors.to_string());
        }
        ApiError::ValidationWithField {
            code: ErrorCode::InvalidInput,
            field,
            message: errors.to_string(),
        }
    }
}

impl From<IpfsError> for ApiError {
    fn from(err: IpfsError) -> Self {
        match err {
            IpfsError::Disabled => ApiError::with_code(
                ErrorCode::ExternalServiceUnavailable,
                "IPFS pinning is not configured",
            ),
            other => ApiError::ExternalService(other.to_string()),
        }
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Configuration(msg) => ApiError::Configuration(msg),
            other => ApiError::Blockchain(other.to_string()),
        }
    }
}

/// Handle Axum JSON rejections and convert to structured API errors
pub fn handle_rejection(err: JsonRejection) -> ApiError {
    match err {
        JsonRejection::JsonDataError(e) => ApiError::with_details(
            ErrorCode::InvalidInput,
            "Invalid input provided",
            e.body_text(),
        ),
        JsonRejection::JsonSyntaxError(_) => {
            ApiError::with_code(ErrorCode::InvalidFormat, "Invalid JSON format")
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::with_code(ErrorCode::InvalidFormat, "JSON content type required")
        }
        JsonRejection::BytesRejection(_) => {
            ApiError::with_code(ErrorCode::InvalidInput, "Invalid request body format")
        }
        _ => ApiError::with_details(
            ErrorCode::InvalidInput,
            "Invalid input provided",
            err.body_text(),
        ),
    }
}
