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
use uuid::Uuid;

use super::extract::{AppQuery, ValidJson};
use crate::{
    auth::{AdminOnly, Auth},
    error::{ApiError, ErrorCode},
    models::{
        paginate, parse_id, CreateIssuerRequest, Issuer, IssuerAccountResponse,
        IssuerListResponse, PageQuery, UpdateIssuerRequest,
    },
    state::AppState,
    stellar::keys,
    storage::IssuerRepository,
    validation::normalize_email,
};

fn ensure_public_key(public_key: &str) -> Result<(), ApiError> {
    if keys::is_valid_public_key(public_key) {
        Ok(())
    } else {
        Err(ApiError::with_message(
            ErrorCode::InvalidStellarAddress,
            format!("Invalid Stellar public key: {public_key}"),
        ))
    }
}

#[utoipa::path(
    get,
    path = "/api/issuers",
    params(PageQuery),
    tag = "Issuers",
    security(("bearer" = [])),
    responses((status = 200, body = IssuerListResponse))
)]
pub async fn list_issuers(
    _auth: Auth,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<IssuerListResponse>, ApiError> {
    let (page, limit) = query.resolve();
    let issuers = IssuerRepository::new(&state.db).list()?;
    let total = issuers.len();
    Ok(Json(IssuerListResponse {
        issuers: paginate(issuers, page, limit),
        total,
        page,
        limit,
    }))
}

#[utoipa::path(
    get,
    path = "/api/issuers/{id}",
    params(("id" = String, Path, description = "Issuer id (uuid)")),
    tag = "Issuers",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Issuer),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_issuer(
    _auth: Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Issuer>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(IssuerRepository::new(&state.db).get(id)?))
}

#[utoipa::path(
    post,
    path = "/api/issuers",
    request_body = CreateIssuerRequest,
    tag = "Issuers",
    security(("bearer" = [])),
    responses(
        (status = 201, body = Issuer),
        (status = 400, body = crate::error::ErrorEnvelope),
        (status = 409, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn create_issuer(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateIssuerRequest>,
) -> Result<(StatusCode, Json<Issuer>), ApiError> {
    let public_key = request.public_key.trim().to_string();
    ensure_public_key(&public_key)?;

    let now = Utc::now();
    let issuer = Issuer {
        id: Uuid::new_v4(),
        name: request.name.trim().to_string(),
        public_key,
        description: request.description,
        website: request.website,
        contact_email: request.contact_email.as_deref().map(normalize_email),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    IssuerRepository::new(&state.db).create(&issuer)?;
    info!(issuer_id = %issuer.id, created_by = %admin.user_id, "issuer created");

    Ok((StatusCode::CREATED, Json(issuer)))
}

#[utoipa::path(
    put,
    path = "/api/issuers/{id}",
    params(("id" = String, Path, description = "Issuer id (uuid)")),
    request_body = UpdateIssuerRequest,
    tag = "Issuers",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Issuer),
        (status = 400, body = crate::error::ErrorEnvelope),
        (status = 404, body = crate::error::ErrorEnvelope),
        (status = 409, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_issuer(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateIssuerRequest>,
) -> Result<Json<Issuer>, ApiError> {
    let id = parse_id(&id)?;
    let repo = IssuerRepository::new(&state.db);
    let mut issuer = repo.get(id)?;

    if let Some(public_key) = request.public_key {
        let public_key = public_key.trim().to_string();
        ensure_public_key(&public_key)?;
        issuer.public_key = public_key;
    }
    if let Some(name) = request.name {
        issuer.name = name.trim().to_string();
    }
    if let Some(description) = request.description {
        issuer.description = Some(description);
    }
    if let Some(website) = request.website {
        issuer.website = Some(website);
    }
    if let Some(contact_email) = request.contact_email {
        issuer.contact_email = Some(normalize_email(&contact_email));
    }
    if let Some(is_active) = request.is_active {
        issuer.is_active = is_active;
    }
    issuer.updated_at = Utc::now();

    repo.update(&issuer)?;
    Ok(Json(issuer))
}

/// Refused with `RESOURCE_IN_USE` while certificates reference the issuer.
#[utoipa::path(
    delete,
    path = "/api/issuers/{id}",
    params(("id" = String, Path, description = "Issuer id (uuid)")),
    tag = "Issuers",
    security(("bearer" = [])),
    responses(
        (status = 204),
        (status = 404, body = crate::error::ErrorEnvelope),
        (status = 409, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_issuer(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    IssuerRepository::new(&state.db).remove(id)?;
    info!(issuer_id = %id, deleted_by = %admin.user_id, "issuer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Check that the issuer's Stellar account exists on the configured network.
#[utoipa::path(
    post,
    path = "/api/issuers/{id}/verify-account",
    params(("id" = String, Path, description = "Issuer id (uuid)")),
    tag = "Issuers",
    security(("bearer" = [])),
    responses(
        (status = 200, body = IssuerAccountResponse),
        (status = 404, body = crate::error::ErrorEnvelope),
        (status = 502, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn verify_issuer_account(
    _admin: AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IssuerAccountResponse>, ApiError> {
    let id = parse_id(&id)?;
    let issuer = IssuerRepository::new(&state.db).get(id)?;
    let exists = state.horizon.verify_account(&issuer.public_key).await?;

    Ok(Json(IssuerAccountResponse {
        issuer_id: issuer.id,
        public_key: issuer.public_key,
        exists,
        network: state.horizon.network().as_str().to_string(),
    }))
}
