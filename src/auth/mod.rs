// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Local accounts with argon2 password hashes and HS256 access tokens.
//!
//! ## Auth Flow
//!
//! 1. Client registers or logs in via `/api/auth/*` and receives a token
//! 2. Client sends `Authorization: Bearer <token>`
//! 3. Server:
//!    - Verifies the signature and expiry (60 s clock skew tolerance)
//!    - Loads the account; deleted or deactivated accounts are rejected
//!    - Applies role checks through the extractors in [`extractor`]

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwt;
pub mod password;
pub mod roles;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::{
    AdminOnly, AdminOrAuditor, Auth, CertificateReader, IssuerRole, OptionalAuth, RequireRole,
    RoleSet,
};
pub use jwt::JwtManager;
pub use roles::Role;
