// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{Method, Uri},
    routing::{get, post, put},
    Router,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{AuthenticatedUser, Role},
    config::REQUEST_TIMEOUT,
    email::{
        EmailQueuedResponse, QueueStats, SendCertificateIssuedDto, SendPasswordResetDto,
        SendRevocationNoticeDto, SendVerificationDto,
    },
    error::{ApiError, ErrorCode, ErrorEnvelope},
    middleware,
    models::{
        AnchorTransactionRequest, AuthResponse, Certificate, CertificateListResponse,
        CertificateStatus, CertificateVerification, CreateCertificateRequest,
        CreateIssuerRequest, Issuer, IssuerAccountResponse, IssuerListResponse, LoginRequest,
        RegisterRequest, RevokeCertificateRequest, UpdateCertificateRequest,
        UpdateIssuerRequest, UpdateUserRequest, UserListResponse, UserResponse,
    },
    state::AppState,
};

pub mod auth;
pub mod certificates;
pub mod email;
pub mod extract;
pub mod health;
pub mod issuers;
pub mod metrics;
pub mod users;

#[cfg(test)]
mod test_support;

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    let app_metrics = state.metrics.clone();

    let api_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/issuers",
            get(issuers::list_issuers).post(issuers::create_issuer),
        )
        .route(
            "/issuers/{id}",
            get(issuers::get_issuer)
                .put(issuers::update_issuer)
                .delete(issuers::delete_issuer),
        )
        .route(
            "/issuers/{id}/verify-account",
            post(issuers::verify_issuer_account),
        )
        .route(
            "/certificates",
            get(certificates::list_certificates).post(certificates::create_certificate),
        )
        .route(
            "/certificates/verify/{certificate_id}",
            get(certificates::verify_certificate),
        )
        .route(
            "/certificates/{id}",
            get(certificates::get_certificate)
                .put(certificates::update_certificate)
                .delete(certificates::delete_certificate),
        )
        .route(
            "/certificates/{id}/revoke",
            post(certificates::revoke_certificate),
        )
        .route(
            "/certificates/{id}/transaction",
            put(certificates::anchor_transaction),
        )
        .route(
            "/email/send-certificate-issued",
            post(email::send_certificate_issued),
        )
        .route("/email/send-verification", post(email::send_verification))
        .route("/email/send-password-reset", post(email::send_password_reset))
        .route(
            "/email/send-revocation-notice",
            post(email::send_revocation_notice),
        )
        .route("/email/queue/stats", get(email::queue_stats))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/health/live", get(health::liveness))
        .route("/health/database", get(health::database))
        .route("/health/stellar", get(health::stellar))
        .route("/metrics", get(metrics::metrics))
        .route("/metrics/health", get(metrics::metrics_health))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .fallback(not_found);

    middleware::apply(app, &config.allowed_origins, app_metrics, REQUEST_TIMEOUT)
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::with_message(
        ErrorCode::NotFound,
        format!("Cannot {} {}", method, uri.path()),
    )
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StellarWave API",
        description = "Certificate issuance and verification on the Stellar network"
    ),
    paths(
        auth::register,
        auth::login,
        auth::me,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        issuers::list_issuers,
        issuers::get_issuer,
        issuers::create_issuer,
        issuers::update_issuer,
        issuers::delete_issuer,
        issuers::verify_issuer_account,
        certificates::list_certificates,
        certificates::get_certificate,
        certificates::create_certificate,
        certificates::update_certificate,
        certificates::revoke_certificate,
        certificates::anchor_transaction,
        certificates::delete_certificate,
        certificates::verify_certificate,
        email::send_certificate_issued,
        email::send_verification,
        email::send_password_reset,
        email::send_revocation_notice,
        email::queue_stats,
        health::health,
        health::readiness,
        health::liveness,
        health::database,
        health::stellar,
        metrics::metrics,
        metrics::metrics_health
    ),
    components(
        schemas(
            ErrorEnvelope,
            ErrorCode,
            Role,
            AuthenticatedUser,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            UpdateUserRequest,
            UserListResponse,
            Issuer,
            CreateIssuerRequest,
            UpdateIssuerRequest,
            IssuerListResponse,
            IssuerAccountResponse,
            Certificate,
            CertificateStatus,
            CreateCertificateRequest,
            UpdateCertificateRequest,
            RevokeCertificateRequest,
            AnchorTransactionRequest,
            CertificateListResponse,
            CertificateVerification,
            SendCertificateIssuedDto,
            SendVerificationDto,
            SendPasswordResetDto,
            SendRevocationNoticeDto,
            EmailQueuedResponse,
            QueueStats,
            health::HealthCheckResponse,
            health::LivenessResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and sign-in"),
        (name = "Users", description = "User accounts"),
        (name = "Issuers", description = "Certificate issuers"),
        (name = "Certificates", description = "Issuance, revocation and verification"),
        (name = "Email", description = "Queued email notifications"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Metrics", description = "Prometheus metrics")
    )
)]
pub struct ApiDoc;
