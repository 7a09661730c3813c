// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Endpoints that queue notification emails.
//!
//! Queueing failures are reported in the body (`success: false`) rather than
//! as an error status.

use axum::{extract::State, Json};
use tracing::error;

use super::extract::ValidJson;
use crate::{
    auth::{AdminOnly, IssuerRole, RequireRole},
    email::{
        EmailJob, EmailQueuedResponse, QueueError, QueueStats, SendCertificateIssuedDto,
        SendPasswordResetDto, SendRevocationNoticeDto, SendVerificationDto,
    },
    error::ApiError,
    state::AppState,
};

fn queued(result: Result<EmailJob, QueueError>, label: &str) -> Json<EmailQueuedResponse> {
    Json(match result {
        Ok(_) => EmailQueuedResponse {
            success: true,
            message: format!("{} email queued successfully", capitalize(label)),
        },
        Err(e) => {
            error!(error = %e, "failed to queue {label} email");
            EmailQueuedResponse {
                success: false,
                message: format!("Failed to queue {label} email"),
            }
        }
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[utoipa::path(
    post,
    path = "/api/email/send-certificate-issued",
    request_body = SendCertificateIssuedDto,
    tag = "Email",
    security(("bearer" = [])),
    responses(
        (status = 200, body = EmailQueuedResponse),
        (status = 400, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn send_certificate_issued(
    _issuer: RequireRole<IssuerRole>,
    State(state): State<AppState>,
    ValidJson(dto): ValidJson<SendCertificateIssuedDto>,
) -> Json<EmailQueuedResponse> {
    queued(state.email_queue.add_certificate_issued(dto), "certificate issued")
}

#[utoipa::path(
    post,
    path = "/api/email/send-verification",
    request_body = SendVerificationDto,
    tag = "Email",
    security(("bearer" = [])),
    responses(
        (status = 200, body = EmailQueuedResponse),
        (status = 400, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn send_verification(
    _issuer: RequireRole<IssuerRole>,
    State(state): State<AppState>,
    ValidJson(dto): ValidJson<SendVerificationDto>,
) -> Json<EmailQueuedResponse> {
    queued(state.email_queue.add_verification(dto), "verification")
}

#[utoipa::path(
    post,
    path = "/api/email/send-password-reset",
    request_body = SendPasswordResetDto,
    tag = "Email",
    security(("bearer" = [])),
    responses(
        (status = 200, body = EmailQueuedResponse),
        (status = 400, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn send_password_reset(
    _issuer: RequireRole<IssuerRole>,
    State(state): State<AppState>,
    ValidJson(dto): ValidJson<SendPasswordResetDto>,
) -> Json<EmailQueuedResponse> {
    queued(state.email_queue.add_password_reset(dto), "password reset")
}

#[utoipa::path(
    post,
    path = "/api/email/send-revocation-notice",
    request_body = SendRevocationNoticeDto,
    tag = "Email",
    security(("bearer" = [])),
    responses(
        (status = 200, body = EmailQueuedResponse),
        (status = 400, body = crate::error::ErrorEnvelope)
    )
)]
pub async fn send_revocation_notice(
    _issuer: RequireRole<IssuerRole>,
    State(state): State<AppState>,
    ValidJson(dto): ValidJson<SendRevocationNoticeDto>,
) -> Json<EmailQueuedResponse> {
    queued(state.email_queue.add_revocation_notice(dto), "revocation notice")
}

/// Job counts per state.
#[utoipa::path(
    get,
    path = "/api/email/queue/stats",
    tag = "Email",
    security(("bearer" = [])),
    responses((status = 200, body = QueueStats))
)]
pub async fn queue_stats(
    _admin: AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(state.email_queue.stats()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{authenticated, bearer, seed_user, send};
    use crate::auth::Role;
    use crate::email::{EmailJobData, JobStatus};
    use crate::state::test_state;
    use crate::storage::{EmailJobRepository, StorageError};
    use axum::http::StatusCode;
    use std::marker::PhantomData;

    fn issuer(state: &AppState) -> RequireRole<IssuerRole> {
        let user = seed_user(state, "issuer@example.com", Role::Issuer);
        RequireRole(authenticated(&user), PhantomData)
    }

    #[tokio::test]
    async fn send_verification_queues_one_job() {
        let state = test_state();
        let dto = SendVerificationDto {
            to: "new@example.com".to_string(),
            user_name: "New".to_string(),
            verification_link: "https://stellarcert.com/verify/xyz".to_string(),
        };

        let Json(body) =
            send_verification(issuer(&state), State(state.clone()), ValidJson(dto.clone())).await;
        assert!(body.success);
        assert_eq!(body.message, "Verification email queued successfully");

        let jobs = EmailJobRepository::new(&state.db)
            .list_by_status(&[JobStatus::Waiting])
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].payload, EmailJobData::SendVerification(dto));
    }

    #[test]
    fn queue_failure_is_reported_in_body() {
        let Json(body) = queued(
            Err(QueueError::Storage(StorageError::Io(std::io::Error::other("disk full")))),
            "certificate issued",
        );
        assert!(!body.success);
        assert_eq!(body.message, "Failed to queue certificate issued email");

        assert_eq!(capitalize("revocation notice"), "Revocation notice");
    }

    #[tokio::test]
    async fn endpoints_validate_and_authorize_through_router() {
        let state = test_state();
        let issuer = seed_user(&state, "issuer@example.com", Role::Issuer);
        let user = seed_user(&state, "user@example.com", Role::User);
        let admin = seed_user(&state, "admin@example.com", Role::Admin);
        let app = crate::api::router(state.clone());

        let notice = serde_json::json!({
            "to": "alice@example.com",
            "recipientName": "Alice",
            "certificateId": "CERT-1",
            "certificateName": "Rust",
            "reason": "Issued in error",
            "revocationDate": "2026-01-15"
        });

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/email/send-revocation-notice",
            Some(&bearer(&state, &user)),
            Some(notice.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errorCode"], "INSUFFICIENT_PERMISSIONS");

        let mut bad = notice.clone();
        bad["revocationDate"] = "yesterday".into();
        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/email/send-revocation-notice",
            Some(&bearer(&state, &issuer)),
            Some(bad),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorCode"], "VALIDATION_ERROR");
        assert!(body["details"]["revocationDate"].is_array());

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/email/send-revocation-notice",
            Some(&bearer(&state, &issuer)),
            Some(notice),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Revocation notice email queued successfully");

        let (status, body) = send(
            app,
            "GET",
            "/api/email/queue/stats",
            Some(&bearer(&state, &admin)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["waiting"], 1);
        assert_eq!(body["failed"], 0);
    }
}
