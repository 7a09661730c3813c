// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! API error type and the JSON error envelope.
//!
//! Handlers return `Result<_, ApiError>`. The response body produced here is
//! completed with request metadata (path, method, correlation id) by the
//! exception filter in [`crate::middleware::exception`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Machine-readable error codes carried in `errorCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    Unauthorized,
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    InsufficientPermissions,

    // Validation
    ValidationError,
    InvalidInput,
    MissingRequiredField,

    // Stellar
    StellarError,
    InvalidStellarAddress,
    BlockchainConnectionError,
    InvalidTransaction,
    TransactionFailed,

    // Certificates
    CertificateNotFound,
    CertificateInvalid,
    CertificateExpired,
    CertificateRevoked,
    CertificateAlreadyExists,
    InvalidCertificateData,

    // Resources
    NotFound,
    DuplicateResource,
    ResourceInUse,

    // Server
    InternalServerError,
    ServiceUnavailable,
    DatabaseError,

    // General
    Conflict,
    Forbidden,
    BadRequest,
    RequestTimeout,
    /// Framework-level error without a more specific code (405, 413, ...).
    HttpError,
}

impl ErrorCode {
    /// Message used when the caller does not supply one.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Unauthorized access",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::TokenExpired => "Token has expired",
            ErrorCode::TokenInvalid => "Invalid token",
            ErrorCode::InsufficientPermissions => "Insufficient permissions to perform this action",
            ErrorCode::ValidationError => "Validation error",
            ErrorCode::InvalidInput => "Invalid input provided",
            ErrorCode::MissingRequiredField => "Missing required field",
            ErrorCode::StellarError => "Stellar blockchain error",
            ErrorCode::InvalidStellarAddress => "Invalid Stellar address",
            ErrorCode::BlockchainConnectionError => "Failed to connect to blockchain",
            ErrorCode::InvalidTransaction => "Invalid transaction",
            ErrorCode::TransactionFailed => "Transaction failed",
            ErrorCode::CertificateNotFound => "Certificate not found",
            ErrorCode::CertificateInvalid => "Certificate is invalid",
            ErrorCode::CertificateExpired => "Certificate has expired",
            ErrorCode::CertificateRevoked => "Certificate has been revoked",
            ErrorCode::CertificateAlreadyExists => "Certificate already exists",
            ErrorCode::InvalidCertificateData => "Invalid certificate data",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::DuplicateResource => "Resource already exists",
            ErrorCode::ResourceInUse => "Resource is in use",
            ErrorCode::InternalServerError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service unavailable",
            ErrorCode::DatabaseError => "Database error occurred",
            ErrorCode::Conflict => "Conflict occurred",
            ErrorCode::Forbidden => "Forbidden",
            ErrorCode::BadRequest => "Bad request",
            ErrorCode::RequestTimeout => "Request timeout",
            ErrorCode::HttpError => "HTTP error",
        }
    }

    /// HTTP status the code is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized
            | ErrorCode::InvalidCredentials
            | ErrorCode::TokenExpired
            | ErrorCode::TokenInvalid => StatusCode::UNAUTHORIZED,
            ErrorCode::InsufficientPermissions | ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::ValidationError
            | ErrorCode::InvalidInput
            | ErrorCode::MissingRequiredField
            | ErrorCode::BadRequest
            | ErrorCode::InvalidStellarAddress
            | ErrorCode::InvalidTransaction => StatusCode::BAD_REQUEST,

            ErrorCode::StellarError
            | ErrorCode::BlockchainConnectionError
            | ErrorCode::TransactionFailed => StatusCode::BAD_GATEWAY,

            ErrorCode::CertificateNotFound | ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::CertificateInvalid
            | ErrorCode::CertificateExpired
            | ErrorCode::CertificateRevoked
            | ErrorCode::InvalidCertificateData => StatusCode::BAD_REQUEST,
            ErrorCode::CertificateAlreadyExists
            | ErrorCode::DuplicateResource
            | ErrorCode::ResourceInUse
            | ErrorCode::Conflict => StatusCode::CONFLICT,

            ErrorCode::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalServerError | ErrorCode::DatabaseError | ErrorCode::HttpError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Wire representation, e.g. `CERTIFICATE_NOT_FOUND`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::TokenInvalid => "TOKEN_INVALID",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            ErrorCode::StellarError => "STELLAR_ERROR",
            ErrorCode::InvalidStellarAddress => "INVALID_STELLAR_ADDRESS",
            ErrorCode::BlockchainConnectionError => "BLOCKCHAIN_CONNECTION_ERROR",
            ErrorCode::InvalidTransaction => "INVALID_TRANSACTION",
            ErrorCode::TransactionFailed => "TRANSACTION_FAILED",
            ErrorCode::CertificateNotFound => "CERTIFICATE_NOT_FOUND",
            ErrorCode::CertificateInvalid => "CERTIFICATE_INVALID",
            ErrorCode::CertificateExpired => "CERTIFICATE_EXPIRED",
            ErrorCode::CertificateRevoked => "CERTIFICATE_REVOKED",
            ErrorCode::CertificateAlreadyExists => "CERTIFICATE_ALREADY_EXISTS",
            ErrorCode::InvalidCertificateData => "INVALID_CERTIFICATE_DATA",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::DuplicateResource => "DUPLICATE_RESOURCE",
            ErrorCode::ResourceInUse => "RESOURCE_IN_USE",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::RequestTimeout => "REQUEST_TIMEOUT",
            ErrorCode::HttpError => "HTTP_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: StatusCode,
    pub message: String,
    pub details: Option<Value>,
}

/// Uniform error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error_code: ErrorCode,
    pub message: String,
    /// Per-field validation messages, when applicable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    pub timestamp: String,
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_error(error: &ApiError) -> Self {
        Self {
            error_code: error.code,
            message: error.message.clone(),
            details: error.details.clone(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: String::new(),
            method: String::new(),
            correlation_id: None,
        }
    }
}

impl ApiError {
    /// Error with the code's default status and message.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            status: code.status(),
            message: code.default_message().to_string(),
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::new(code)
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::BadRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Forbidden, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::Unauthorized, message)
    }

    pub fn validation(message: impl Into<String>, details: Value) -> Self {
        Self::with_message(ErrorCode::ValidationError, message).with_details(details)
    }

    /// 500 with a generic message. The cause is logged, never returned.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        tracing::error!(error = %cause, "internal error");
        Self::new(ErrorCode::InternalServerError)
    }

    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::validation(
            "Validation failed",
            crate::validation::field_details(&errors),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorEnvelope::from_error(&self));
        let mut response = (self.status, body).into_response();
        // The exception filter rebuilds the envelope from this.
        response.extensions_mut().insert(self);
        response
    }
}
