// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::response::{IntoResponse, Response};

use super::roles::Role;
use crate::error::{ApiError, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header.
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Token has expired")]
    TokenExpired,

    /// Bad signature, malformed token or unexpected claims.
    #[error("Invalid token")]
    TokenInvalid,

    /// Token is valid but the account was deleted or deactivated.
    #[error("User account is inactive or no longer exists")]
    InactiveAccount,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User role '{0}' is not authorized to access this resource")]
    InsufficientPermissions(Role),

    #[error("Failed to issue token: {0}")]
    TokenCreation(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::MissingToken | AuthError::InactiveAccount => ErrorCode::Unauthorized,
            AuthError::TokenExpired => ErrorCode::TokenExpired,
            AuthError::TokenInvalid => ErrorCode::TokenInvalid,
            AuthError::InvalidCredentials => ErrorCode::InvalidCredentials,
            AuthError::InsufficientPermissions(_) => ErrorCode::InsufficientPermissions,
            AuthError::TokenCreation(_) | AuthError::Hashing(_) => {
                ErrorCode::InternalServerError
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenCreation(_) | AuthError::Hashing(_) => ApiError::internal(err),
            other => ApiError::with_message(other.code(), other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
