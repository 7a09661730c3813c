// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate issuance, revocation, on-chain anchoring and public
//! verification.
//!
//! Issuing and revoking queue an email to the recipient. A failure to queue
//! is logged and does not fail the request.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::extract::{AppJson, AppQuery, ValidJson};
use crate::{
    auth::{AdminOnly, Auth, AuthenticatedUser, CertificateReader, IssuerRole, OptionalAuth, RequireRole, RoleSet},
    email::{SendCertificateIssuedDto, SendRevocationNoticeDto},
    error::{ApiError, ErrorCode},
    models::{
        generate_certificate_id, paginate, parse_id, AnchorTransactionRequest, Certificate,
        CertificateListResponse, CertificateQuery, CertificateVerification,
        CreateCertificateRequest, RevokeCertificateRequest, UpdateCertificateRequest,
    },
    state::AppState,
    stellar::keys,
    storage::{CertificateFilter, CertificateRepository, IssuerRepository, StorageError},
    validation::normalize_email,
};

fn can_read_all(user: &AuthenticatedUser) -> bool {
    user.role.satisfies_any(CertificateReader::ROLES)
}

fn load(state: &AppState, id: Uuid) -> Result<Certificate, ApiError> {
    CertificateRepository::new(&state.db)
        .find_by_id(id)?
        .ok_or_else(|| ApiError::new(ErrorCode::CertificateNotFound))
}

fn ensure_expiry_after_issue(
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), ApiError> {
    match expires_at {
        Some(expires_at) if expires_at <= issued_at => Err(ApiError::with_message(
            ErrorCode::InvalidCertificateData,
            "expiresAt must be after issuedAt",
        )),
        _ => Ok(()),
    }
}

fn ensure_not_revoked(cert: &Certificate) -> Result<(), ApiError> {
    if cert.is_revoked {
        Err(ApiError::with_message(
            ErrorCode::CertificateRevoked,
            "Certificate has been revoked",
        ))
    } else {
        Ok(())
    }
}

#[utoipa::path(
    get,
    path = "/api/certificates",
    params(CertificateQuery),
    tag = "Certificates",
    security(("bearer" = [])),
    responses((status = 200, body = CertificateListResponse))
)]
pub async fn list_certificates(
    Auth(user): Auth,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CertificateQuery>,
) -> Result<Json<CertificateListResponse>, ApiError> {
    let (page, limit) = crate::models::resolve_page(query.page, query.limit);

    // Plain users only ever see certificates addressed to them.
    let recipient_email = if can_read_all(&user) {
        query.recipient_email.as_deref().map(normalize_email)
    } else {
        Some(user.email.clone())
    };
    let filter = CertificateFilter {
        recipient_email,
        issuer_id: query.issuer_id,
        issuer_name: query.issuer_name,
        revoked: query.revoked,
    };

    let certificates = CertificateRepository::new(&state.db).list(&filter)?;
    let total = certificates.len();
    Ok(Json(CertificateListResponse {
        certificates: paginate(certificates, page, limit),
        total,
        page,
        limit,
    }))
}

#[utoipa::path(
    get,
    path = "/api/certificates/{id}",
    params(("id" = String, Path, description = "Certificate record id (uuid)")),
    tag = "Certificates",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Certificate),
        (status = 403, body = crate::error::ErrorEnvelope),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn get_certificate(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    let cert = load(&state, parse_id(&id)?)?;
    if !can_read_all(&user) && !cert.recipient_email.eq_ignore_ascii_case(&user.email) {
        return Err(ApiError::forbidden("You can only access your own certificates"));
    }
    Ok(Json(cert))
}

#[utoipa::path(
    post,
    path = "/api/certificates",
    request_body = CreateCertificateRequest,
    tag = "Certificates",
    security(("bearer" = [])),
    responses(
        (status = 201, body = Certificate),
        (status = 400, body = crate::error::ErrorEnvelope),
        (status = 409, description = "certificateId already used", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn create_certificate(
    RequireRole(user, _): RequireRole<IssuerRole>,
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateCertificateRequest>,
) -> Result<(StatusCode, Json<Certificate>), ApiError> {
    // Resolved here for the display name; `create` re-checks it atomically.
    let issuer = match request.issuer_id {
        Some(issuer_id) => {
            let issuer = IssuerRepository::new(&state.db)
                .find_by_id(issuer_id)?
                .ok_or_else(|| ApiError::not_found("Issuer not found"))?;
            if !issuer.is_active {
                return Err(ApiError::with_message(
                    ErrorCode::InvalidCertificateData,
                    "Issuer is not active",
                ));
            }
            Some(issuer)
        }
        None => None,
    };
    let issuer_name = match (request.issuer_name, &issuer) {
        (Some(name), _) => name.trim().to_string(),
        (None, Some(issuer)) => issuer.name.clone(),
        (None, None) => {
            return Err(ApiError::with_message(
                ErrorCode::InvalidCertificateData,
                "issuerName or issuerId is required",
            ))
        }
    };

    let now = Utc::now();
    let issued_at = request.issued_at.unwrap_or(now);
    ensure_expiry_after_issue(issued_at, request.expires_at)?;

    let repo = CertificateRepository::new(&state.db);
    let certificate_id = request
        .certificate_id
        .unwrap_or_else(generate_certificate_id);
    if repo.find_by_certificate_id(&certificate_id)?.is_some() {
        return Err(ApiError::new(ErrorCode::CertificateAlreadyExists));
    }

    let mut cert = Certificate {
        id: Uuid::new_v4(),
        certificate_id,
        title: request.title.trim().to_string(),
        description: request.description,
        content: request.content,
        issuer_id: issuer.as_ref().map(|i| i.id),
        issuer_name,
        recipient_email: normalize_email(&request.recipient_email),
        recipient_name: request.recipient_name,
        recipient_public_key: request.recipient_public_key,
        issued_at,
        expires_at: request.expires_at,
        is_revoked: false,
        revocation_reason: None,
        revoked_at: None,
        blockchain_tx_hash: None,
        fingerprint: String::new(),
        created_at: now,
        updated_at: now,
    };
    cert.refresh_fingerprint();

    repo.create(&cert).map_err(|e| match e {
        StorageError::AlreadyExists(_) => ApiError::new(ErrorCode::CertificateAlreadyExists),
        other => other.into(),
    })?;
    state.metrics.record_certificate_issued(&cert.issuer_label());
    info!(
        certificate_id = %cert.certificate_id,
        issued_by = %user.user_id,
        "certificate issued"
    );

    let email = SendCertificateIssuedDto {
        to: cert.recipient_email.clone(),
        certificate_id: cert.certificate_id.clone(),
        recipient_name: cert
            .recipient_name
            .clone()
            .unwrap_or_else(|| cert.recipient_email.clone()),
        certificate_name: cert.title.clone(),
        issuer_name: cert.issuer_name.clone(),
    };
    if let Err(e) = state.email_queue.add_certificate_issued(email) {
        warn!(certificate_id = %cert.certificate_id, error = %e, "failed to queue certificate issued email");
    }

    Ok((StatusCode::CREATED, Json(cert)))
}

#[utoipa::path(
    put,
    path = "/api/certificates/{id}",
    params(("id" = String, Path, description = "Certificate record id (uuid)")),
    request_body = UpdateCertificateRequest,
    tag = "Certificates",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Certificate),
        (status = 400, body = crate::error::ErrorEnvelope),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn update_certificate(
    _issuer: RequireRole<IssuerRole>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<UpdateCertificateRequest>,
) -> Result<Json<Certificate>, ApiError> {
    let mut cert = load(&state, parse_id(&id)?)?;
    ensure_not_revoked(&cert)?;

    if let Some(title) = request.title {
        cert.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        cert.description = Some(description);
    }
    if let Some(content) = request.content {
        cert.content = Some(content);
    }
    if let Some(recipient_name) = request.recipient_name {
        cert.recipient_name = Some(recipient_name);
    }
    if let Some(key) = request.recipient_public_key {
        cert.recipient_public_key = Some(key);
    }
    if let Some(expires_at) = request.expires_at {
        ensure_expiry_after_issue(cert.issued_at, Some(expires_at))?;
        cert.expires_at = Some(expires_at);
    }
    cert.refresh_fingerprint();
    cert.updated_at = Utc::now();

    CertificateRepository::new(&state.db).update(&cert)?;
    Ok(Json(cert))
}

#[utoipa::path(
    post,
    path = "/api/certificates/{id}/revoke",
    params(("id" = String, Path, description = "Certificate record id (uuid)")),
    request_body = RevokeCertificateRequest,
    tag = "Certificates",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Certificate),
        (status = 400, description = "Already revoked", body = crate::error::ErrorEnvelope),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn revoke_certificate(
    RequireRole(user, _): RequireRole<IssuerRole>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<RevokeCertificateRequest>,
) -> Result<Json<Certificate>, ApiError> {
    let mut cert = load(&state, parse_id(&id)?)?;
    if cert.is_revoked {
        return Err(ApiError::with_message(
            ErrorCode::CertificateRevoked,
            "Certificate is already revoked",
        ));
    }

    let now = Utc::now();
    cert.is_revoked = true;
    cert.revocation_reason = Some(request.reason.trim().to_string());
    cert.revoked_at = Some(now);
    cert.updated_at = now;
    CertificateRepository::new(&state.db).update(&cert)?;
    info!(
        certificate_id = %cert.certificate_id,
        revoked_by = %user.user_id,
        "certificate revoked"
    );

    let notice = SendRevocationNoticeDto {
        to: cert.recipient_email.clone(),
        recipient_name: cert
            .recipient_name
            .clone()
            .unwrap_or_else(|| cert.recipient_email.clone()),
        certificate_id: cert.certificate_id.clone(),
        certificate_name: cert.title.clone(),
        reason: request.reason.trim().to_string(),
        revocation_date: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    if let Err(e) = state.email_queue.add_revocation_notice(notice) {
        warn!(certificate_id = %cert.certificate_id, error = %e, "failed to queue revocation notice");
    }

    Ok(Json(cert))
}

/// Record the Stellar transaction that anchors the certificate. The hash must
/// exist on the configured network.
#[utoipa::path(
    put,
    path = "/api/certificates/{id}/transaction",
    params(("id" = String, Path, description = "Certificate record id (uuid)")),
    request_body = AnchorTransactionRequest,
    tag = "Certificates",
    security(("bearer" = [])),
    responses(
        (status = 200, body = Certificate),
        (status = 400, description = "Malformed or unknown transaction", body = crate::error::ErrorEnvelope),
        (status = 502, description = "Horizon unreachable", body = crate::error::ErrorEnvelope)
    )
)]
pub async fn anchor_transaction(
    _issuer: RequireRole<IssuerRole>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(request): AppJson<AnchorTransactionRequest>,
) -> Result<Json<Certificate>, ApiError> {
    let mut cert = load(&state, parse_id(&id)?)?;
    ensure_not_revoked(&cert)?;

    let tx_hash = request.tx_hash.trim().to_string();
    if !keys::is_valid_tx_hash(&tx_hash) {
        return Err(ApiError::with_message(
            ErrorCode::InvalidTransaction,
            "Transaction hash must be 64 lowercase hex characters",
        ));
    }
    if !state.horizon.verify_transaction(&tx_hash).await? {
        return Err(ApiError::with_message(
            ErrorCode::InvalidTransaction,
            "Transaction not found on the Stellar network",
        ));
    }

    cert.blockchain_tx_hash = Some(tx_hash);
    cert.updated_at = Utc::now();
    CertificateRepository::new(&state.db).update(&cert)?;
    info!(certificate_id = %cert.certificate_id, "certificate anchored on chain");
    Ok(Json(cert))
}

#[utoipa::path(
    delete,
    path = "/api/certificates/{id}",
    params(("id" = String, Path, description = "Certificate record id (uuid)")),
    tag = "Certificates",
    security(("bearer" = [])),
    responses(
        (status = 204),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn delete_certificate(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cert = load(&state, parse_id(&id)?)?;
    CertificateRepository::new(&state.db).remove(cert.id)?;
    info!(certificate_id = %cert.certificate_id, deleted_by = %admin.user_id, "certificate deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Public verification by certificate code.
#[utoipa::path(
    get,
    path = "/api/certificates/verify/{certificate_id}",
    params(("certificate_id" = String, Path, description = "Public certificate code")),
    tag = "Certificates",
    responses(
        (status = 200, body = CertificateVerification),
        (status = 404, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn verify_certificate(
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateVerification>, ApiError> {
    let cert = CertificateRepository::new(&state.db)
        .find_by_certificate_id(&certificate_id)?
        .ok_or_else(|| ApiError::new(ErrorCode::CertificateNotFound))?;

    let on_chain_verified = match &cert.blockchain_tx_hash {
        Some(hash) => match state.horizon.verify_transaction(hash).await {
            Ok(found) => Some(found),
            Err(e) => {
                warn!(certificate_id = %cert.certificate_id, error = %e, "on-chain check skipped");
                None
            }
        },
        None => None,
    };

    state.metrics.record_certificate_verified(&cert.issuer_label());
    info!(
        certificate_id = %cert.certificate_id,
        verified_by = ?viewer.as_ref().map(|u| u.user_id),
        "certificate verified"
    );

    let now = Utc::now();
    Ok(Json(CertificateVerification {
        status: cert.status_at(now),
        valid: cert.is_valid_at(now),
        certificate_id: cert.certificate_id,
        title: cert.title,
        issuer_name: cert.issuer_name,
        recipient_name: cert.recipient_name,
        issued_at: cert.issued_at,
        expires_at: cert.expires_at,
        revocation_reason: cert.revocation_reason,
        blockchain_tx_hash: cert.blockchain_tx_hash,
        on_chain_verified,
        fingerprint: cert.fingerprint,
        verified_at: now,
    }))
}
