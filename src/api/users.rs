// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use tracing::info;

use super::extract::{AppQuery, ValidJson};
use crate::{
    auth::{password, AdminOrAuditor, Auth, AuthenticatedUser, RequireRole, Role},
    error::ApiError,
    models::{
        paginate, parse_id, PageQuery, UpdateUserRequest, User, UserListResponse,
        UserResponse,
    },
    state::AppState,
    storage::{Database, UserRepository},
    validation::normalize_email,
};

fn ensure_self_or_admin(user: &AuthenticatedUser, target: uuid::Uuid) -> Result<(), ApiError> {
    if user.is_self_or_admin(target) {
        Ok(())
    } else {
        Err(ApiError::forbidden("You can only access your own account"))
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(PageQuery),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserListResponse),
        (status = 403, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn list_users(
    _role: RequireRole<AdminOrAuditor>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    let (page, limit) = query.resolve();
    let users = UserRepository::new(&state.db).list()?;
    let total = users.len();
    let users = paginate(users, page, limit)
        .iter()
        .map(UserResponse::from)
        .collect();

    Ok(Json(UserListResponse {
        users,
        total,
        page,
        limit,
    }))
}

/// Self, admins and auditors may read an account.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id (uuid)")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 403, body = crate::error::ErrorEnvelope),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_user(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !(user.user_id == id || user.role.has_privilege(Role::Auditor)) {
        return Err(ApiError::forbidden("You can only access your own account"));
    }
    let stored = UserRepository::new(&state.db).get(id)?;
    Ok(Json(UserResponse::from(&stored)))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id (uuid)")),
    request_body = UpdateUserRequest,
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 400, body = crate::error::ErrorEnvelope),
        (status = 403, body = crate::error::ErrorEnvelope),
        (status = 404, body = crate::error::ErrorEnvelope),
        (status = 409, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_user(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&id)?;
    ensure_self_or_admin(&user, id)?;
    if (request.role.is_some() || request.is_active.is_some()) && !user.is_admin() {
        return Err(ApiError::forbidden("Only administrators can change role or status"));
    }

    let repo = UserRepository::new(&state.db);
    let mut stored = repo.get(id)?;

    if let Some(email) = &request.email {
        let email = normalize_email(email);
        if email != stored.email && repo.find_by_email(&email)?.is_some() {
            return Err(ApiError::conflict("User with this email already exists"));
        }
        stored.email = email;
    }
    if let Some(first_name) = request.first_name {
        stored.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = request.last_name {
        stored.last_name = last_name.trim().to_string();
    }
    if let Some(phone) = request.phone {
        stored.phone = Some(phone);
    }
    if let Some(new_password) = request.password {
        stored.password_hash = password::hash_password(new_password).await?;
    }
    if let Some(role) = request.role {
        stored.role = role;
    }
    if let Some(is_active) = request.is_active {
        stored.is_active = is_active;
    }
    stored.updated_at = Utc::now();

    repo.update(&stored)?;
    info!(user_id = %stored.id, updated_by = %user.user_id, "user updated");
    Ok(Json(UserResponse::from(&stored)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User id (uuid)")),
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 204),
        (status = 403, body = crate::error::ErrorEnvelope),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_user(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    ensure_self_or_admin(&user, id)?;
    UserRepository::new(&state.db).remove(id)?;
    info!(user_id = %id, deleted_by = %user.user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Create the bootstrap admin account unless the email is already taken.
/// Returns whether an account was created.
pub async fn seed_admin(db: &Database, email: &str, password: String) -> Result<bool, ApiError> {
    let repo = UserRepository::new(db);
    let email = normalize_email(email);
    if repo.find_by_email(&email)?.is_some() {
        return Ok(false);
    }

    let password_hash = password::hash_password(password).await?;
    let now = Utc::now();
    let admin = User {
        id: uuid::Uuid::new_v4(),
        email,
        first_name: "System".to_string(),
        last_name: "Administrator".to_string(),
        password_hash,
        phone: None,
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    repo.create(&admin)?;
    info!(user_id = %admin.id, email = %admin.email, "admin account seeded");
    Ok(true)
}
