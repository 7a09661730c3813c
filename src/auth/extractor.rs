// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```
//!
//! Role checks use [`RequireRole`] with a marker type naming the accepted
//! roles, e.g. `RequireRole<IssuerRole>`.

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser, Role};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::UserRepository;

/// Extractor for authenticated users.
///
/// Validates the bearer token and confirms the account still exists and is
/// active. The role is taken from the stored account so demotions apply
/// immediately.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<UserResponse>, ApiError> {
///     // user.user_id contains the authenticated user's ID
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already resolved earlier in this request
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let claims = state.jwt.verify(token)?;
        let mut user = AuthenticatedUser::from_claims(claims)?;

        let stored = UserRepository::new(&state.db).find_by_id(user.user_id)?;
        match stored {
            Some(account) if account.is_active => {
                user.role = account.role;
                user.email = account.email;
            }
            _ => return Err(AuthError::InactiveAccount.into()),
        }

        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}

/// Token from `Authorization: Bearer <token>`. Other schemes count as absent.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme == "Bearer" && !token.is_empty()).then_some(token)
}

/// A set of roles accepted by [`RequireRole`]. Any one of them suffices.
pub trait RoleSet: Send + Sync + 'static {
    const ROLES: &'static [Role];
}

/// Issuers (and admins through the hierarchy).
pub struct IssuerRole;

impl RoleSet for IssuerRole {
    const ROLES: &'static [Role] = &[Role::Issuer];
}

pub struct AdminOrAuditor;

impl RoleSet for AdminOrAuditor {
    const ROLES: &'static [Role] = &[Role::Admin, Role::Auditor];
}

/// Read access to all certificates.
pub struct CertificateReader;

impl RoleSet for CertificateReader {
    const ROLES: &'static [Role] = &[Role::Issuer, Role::Auditor];
}

/// Extractor that requires one of the roles in `R`.
pub struct RequireRole<R: RoleSet>(pub AuthenticatedUser, pub PhantomData<R>);

impl<R: RoleSet> FromRequestParts<AppState> for RequireRole<R> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        if !user.role.satisfies_any(R::ROLES) {
            return Err(AuthError::InsufficientPermissions(user.role).into());
        }
        Ok(RequireRole(user, PhantomData))
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions(user.role).into());
        }
        Ok(AdminOnly(user))
    }
}

/// Optional authentication extractor.
///
/// Returns `None` if no valid authentication is present, instead of rejecting.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::models::User;
    use crate::state::test_state;
    use axum::http::Request;
    use chrono::Utc;
    use uuid::Uuid;

    fn seed_user(state: &AppState, role: Role, active: bool) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password_hash: String::new(),
            phone: None,
            role,
            is_active: active,
            created_at: now,
            updated_at: now,
        };
        UserRepository::new(&state.db).create(&user).unwrap();
        user
    }

    fn parts_with_token(token: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_bearer_token() {
        let state = test_state();
        let mut parts = parts_with_token(None);
        let err = Auth::from_request_parts(&mut parts, &state).await.err().unwrap();
        assert_eq!(err.code, ErrorCode::Unauthorized);
        assert_eq!(err.message, "Missing authentication token");

        let mut parts = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let err = Auth::from_request_parts(&mut parts, &state).await.err().unwrap();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_valid_token() {
        let state = test_state();
        let user = seed_user(&state, Role::Issuer, true);
        let token = state.jwt.issue(&user).unwrap();

        let mut parts = parts_with_token(Some(&token));
        let Auth(authenticated) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(authenticated.user_id, user.id);
        assert_eq!(authenticated.role, Role::Issuer);
        assert!(parts.extensions.get::<AuthenticatedUser>().is_some());
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let state = test_state();
        let mut parts = parts_with_token(Some("garbage.token.value"));
        let err = Auth::from_request_parts(&mut parts, &state).await.err().unwrap();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }

    #[tokio::test]
    async fn deactivated_or_deleted_accounts_are_rejected() {
        let state = test_state();
        let inactive = seed_user(&state, Role::User, false);
        let token = state.jwt.issue(&inactive).unwrap();
        let mut parts = parts_with_token(Some(&token));
        let err = Auth::from_request_parts(&mut parts, &state).await.err().unwrap();
        assert_eq!(err.code, ErrorCode::Unauthorized);

        let deleted = seed_user(&state, Role::User, true);
        let token = state.jwt.issue(&deleted).unwrap();
        UserRepository::new(&state.db).remove(deleted.id).unwrap();
        let mut parts = parts_with_token(Some(&token));
        assert!(Auth::from_request_parts(&mut parts, &state).await.is_err());
    }

    #[tokio::test]
    async fn stored_role_overrides_token_role() {
        let state = test_state();
        let mut user = seed_user(&state, Role::Admin, true);
        let token = state.jwt.issue(&user).unwrap();

        user.role = Role::User;
        UserRepository::new(&state.db).update(&user).unwrap();

        let mut parts = parts_with_token(Some(&token));
        let result = AdminOnly::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.err().unwrap().code, ErrorCode::InsufficientPermissions);
    }

    #[tokio::test]
    async fn require_role_uses_hierarchy() {
        let state = test_state();
        let admin = seed_user(&state, Role::Admin, true);
        let token = state.jwt.issue(&admin).unwrap();
        let mut parts = parts_with_token(Some(&token));
        assert!(RequireRole::<IssuerRole>::from_request_parts(&mut parts, &state)
            .await
            .is_ok());

        let plain = seed_user(&state, Role::User, true);
        let token = state.jwt.issue(&plain).unwrap();
        let mut parts = parts_with_token(Some(&token));
        let err = RequireRole::<AdminOrAuditor>::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(
            err.message,
            "User role 'user' is not authorized to access this resource"
        );
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let state = test_state();
        let mut parts = parts_with_token(None);
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "cached@example.com".to_string(),
            role: Role::Auditor,
        };
        parts.extensions.insert(user.clone());

        let Auth(found) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(found, user);
    }

    #[tokio::test]
    async fn optional_auth_returns_none_without_user() {
        let state = test_state();
        let mut parts = parts_with_token(None);
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
