// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::AuthError;
use super::roles::Role;

/// Claims carried by access tokens issued at login/registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated user information extracted from a verified token.
///
/// This is the primary type used throughout the application to represent
/// the caller of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::TokenInvalid)?;
        Ok(Self {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }

    /// Check if the user has the required role (hierarchy aware).
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin, or the user identified by `user_id`.
    pub fn is_self_or_admin(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: Role) -> Claims {
        Claims {
            sub: sub.to_string(),
            email: "a@example.com".to_string(),
            role,
            iat: 0,
            exp: 0,
        }
    }

    #[test]
    fn from_claims_requires_uuid_subject() {
        let id = Uuid::new_v4();
        let user = AuthenticatedUser::from_claims(claims(&id.to_string(), Role::Issuer)).unwrap();
        assert_eq!(user.user_id, id);
        assert!(user.has_role(Role::User));
        assert!(!user.is_admin());

        assert!(matches!(
            AuthenticatedUser::from_claims(claims("user_123", Role::User)),
            Err(AuthError::TokenInvalid)
        ));
    }

    #[test]
    fn self_or_admin() {
        let id = Uuid::new_v4();
        let user = AuthenticatedUser::from_claims(claims(&id.to_string(), Role::User)).unwrap();
        assert!(user.is_self_or_admin(id));
        assert!(!user.is_self_or_admin(Uuid::new_v4()));

        let admin =
            AuthenticatedUser::from_claims(claims(&Uuid::new_v4().to_string(), Role::Admin)).unwrap();
        assert!(admin.is_self_or_admin(id));
    }
}
