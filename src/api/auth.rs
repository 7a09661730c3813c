// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::extract::ValidJson;
use crate::{
    auth::{password, Auth, AuthError, Role},
    error::ApiError,
    models::{AuthResponse, LoginRequest, RegisterRequest, User, UserResponse},
    state::AppState,
    storage::UserRepository,
    validation::normalize_email,
};

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse, ApiError> {
    Ok(AuthResponse {
        access_token: state.jwt.issue(user)?,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expires_in_secs(),
        user: UserResponse::from(user),
    })
}

/// Create a `user` account and sign it in.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, body = AuthResponse),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Email already registered", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let repo = UserRepository::new(&state.db);
    let email = normalize_email(&request.email);
    if repo.find_by_email(&email)?.is_some() {
        return Err(ApiError::conflict("User with this email already exists"));
    }

    let password_hash = password::hash_password(request.password).await?;
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email,
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        password_hash,
        phone: request.phone,
        role: Role::User,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    repo.create(&user)?;
    info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, &user)?)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = AuthResponse),
        (status = 401, description = "Invalid credentials or inactive account", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let result = authenticate(&state, request).await;
    state.metrics.record_authentication_attempt(result.is_ok());
    let user = result?;
    Ok(Json(auth_response(&state, &user)?))
}

async fn authenticate(state: &AppState, request: LoginRequest) -> Result<User, ApiError> {
    let email = normalize_email(&request.email);
    let user = UserRepository::new(&state.db)
        .find_by_email(&email)?
        .ok_or(AuthError::InvalidCredentials)?;

    if !password::verify_password(request.password, user.password_hash.clone()).await? {
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_active {
        return Err(AuthError::InactiveAccount.into());
    }
    Ok(user)
}

/// The account behind the bearer token.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 401, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn me(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let stored = UserRepository::new(&state.db).get(user.user_id)?;
    Ok(Json(UserResponse::from(&stored)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{authenticated, seed_user};
    use crate::error::ErrorCode;
    use crate::state::test_state;

    const PASSWORD: &str = "Str0ng!Pass";

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn register_creates_user_and_returns_token() {
        let state = test_state();

        let (status, Json(response)) = register(
            State(state.clone()),
            ValidJson(register_request("  Ada@Example.COM ")),
        )
        .await
        .expect("registration succeeds");

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(response.token_type, "Bearer");
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.user.email, "ada@example.com");
        assert_eq!(response.user.role, Role::User);

        let claims = state.jwt.verify(&response.access_token).unwrap();
        assert_eq!(claims.sub, response.user.id.to_string());

        let stored = UserRepository::new(&state.db)
            .find_by_email("ada@example.com")
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, PASSWORD);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let state = test_state();
        seed_user(&state, "ada@example.com", Role::User);

        let err = register(State(state), ValidJson(register_request("ADA@example.com")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn login_checks_password_and_counts_attempts() {
        let state = test_state();
        register(State(state.clone()), ValidJson(register_request("ada@example.com")))
            .await
            .unwrap();

        let Json(response) = login(
            State(state.clone()),
            ValidJson(LoginRequest {
                email: "ada@example.com".to_string(),
                password: PASSWORD.to_string(),
            }),
        )
        .await
        .expect("login succeeds");
        assert_eq!(response.user.email, "ada@example.com");

        let err = login(
            State(state.clone()),
            ValidJson(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "Wrong!Pass1".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);

        let attempts = &state.metrics.authentication_attempts_total;
        assert_eq!(attempts.with_label_values(&["success"]).get(), 1);
        assert_eq!(attempts.with_label_values(&["failure"]).get(), 1);
    }

    #[tokio::test]
    async fn login_unknown_email_is_invalid_credentials() {
        let state = test_state();
        let err = login(
            State(state),
            ValidJson(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: PASSWORD.to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidCredentials);
        assert_eq!(err.message, "Invalid email or password");
    }

    #[tokio::test]
    async fn login_inactive_account_is_unauthorized() {
        let state = test_state();
        let repo = UserRepository::new(&state.db);
        let mut user = seed_user(&state, "ada@example.com", Role::User);
        user.password_hash = password::hash_password_blocking(PASSWORD).unwrap();
        user.is_active = false;
        repo.update(&user).unwrap();

        let err = login(
            State(state),
            ValidJson(LoginRequest {
                email: "ada@example.com".to_string(),
                password: PASSWORD.to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn me_returns_current_user() {
        let state = test_state();
        let user = seed_user(&state, "ada@example.com", Role::Issuer);

        let Json(response) = me(Auth(authenticated(&user)), State(state)).await.unwrap();
        assert_eq!(response.id, user.id);
        assert_eq!(response.role, Role::Issuer);
    }
}
