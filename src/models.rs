// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Stored entities and the request/response bodies of the REST API. JSON is
//! camelCase throughout; timestamps are RFC 3339 UTC.
//!
//! ## Model Categories
//!
//! - **Users**: accounts, registration and login
//! - **Issuers**: organisations allowed to issue certificates
//! - **Certificates**: issued credentials, revocation and on-chain anchors

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::Role;
use crate::error::ApiError;
use crate::validation::{
    invalid, not_blank, stellar_public_key, strong_password, FIELD_PARAM,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

const CERTIFICATE_ID_MAX: usize = 64;

/// Parse a path id, rejecting anything that is not a UUID.
pub fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("Validation failed (uuid is expected)"))
}

// =============================================================================
// Pagination
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number.
    pub page: Option<u32>,
    /// Page size (max 100).
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn resolve(&self) -> (u32, u32) {
        resolve_page(self.page, self.limit)
    }
}

pub fn resolve_page(page: Option<u32>, limit: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (page, limit)
}

/// Slice one page out of an already ordered list.
pub fn paginate<T>(items: Vec<T>, page: u32, limit: u32) -> Vec<T> {
    let skip = (page as usize - 1).saturating_mul(limit as usize);
    items.into_iter().skip(skip).take(limit as usize).collect()
}

// =============================================================================
// Users
// =============================================================================

/// Stored user record. Never returned directly; see [`UserResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Normalised (trimmed, NFKC, lowercase). Unique.
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "strong_password"))]
    pub password: String,
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub first_name: String,
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub last_name: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub first_name: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub last_name: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 32))]
    pub phone: Option<String>,
    #[validate(custom(function = "strong_password"))]
    pub password: Option<String>,
    /// Admin only.
    pub role: Option<Role>,
    /// Admin only.
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

// =============================================================================
// Issuers
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issuer {
    pub id: Uuid,
    pub name: String,
    /// Stellar account id (`G...`). Unique.
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateIssuerRequest {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: String,
    #[validate(custom(function = "not_blank"), length(max = 56))]
    pub public_key: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(url)]
    pub website: Option<String>,
    #[serde(default)]
    #[validate(email)]
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateIssuerRequest {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub name: Option<String>,
    pub public_key: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(url)]
    pub website: Option<String>,
    #[validate(email)]
    pub contact_email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerListResponse {
    pub issuers: Vec<Issuer>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuerAccountResponse {
    pub issuer_id: Uuid,
    pub public_key: String,
    /// Whether the account exists on the configured network.
    pub exists: bool,
    pub network: String,
}

// =============================================================================
// Certificates
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CertificateStatus {
    /// Issued but not yet anchored on chain.
    Pending,
    Active,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: Uuid,
    /// Public code used for verification. Unique.
    pub certificate_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_id: Option<Uuid>,
    pub issuer_name: String,
    pub recipient_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_public_key: Option<String>,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    /// SHA-256 over the identifying fields, hex encoded.
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Revoked wins over expired, expired over pending.
    pub fn status_at(&self, now: DateTime<Utc>) -> CertificateStatus {
        if self.is_revoked {
            CertificateStatus::Revoked
        } else if self.expires_at.is_some_and(|exp| exp <= now) {
            CertificateStatus::Expired
        } else if self.blockchain_tx_hash.is_none() {
            CertificateStatus::Pending
        } else {
            CertificateStatus::Active
        }
    }

    pub fn status(&self) -> CertificateStatus {
        self.status_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !matches!(
            self.status_at(now),
            CertificateStatus::Revoked | CertificateStatus::Expired
        )
    }

    /// Recompute [`Certificate::fingerprint`] from the current fields.
    pub fn refresh_fingerprint(&mut self) {
        self.fingerprint = compute_fingerprint(self);
    }

    /// Label value used for per-issuer metrics.
    pub fn issuer_label(&self) -> String {
        self.issuer_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| self.issuer_name.clone())
    }
}

pub fn compute_fingerprint(cert: &Certificate) -> String {
    let issued_at = cert.issued_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut hasher = Sha256::new();
    for part in [
        cert.certificate_id.as_str(),
        cert.title.as_str(),
        cert.issuer_name.as_str(),
        cert.recipient_email.as_str(),
        issued_at.as_str(),
        cert.content.as_deref().unwrap_or_default(),
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    hex::encode(hasher.finalize())
}

/// `CERT-` followed by 12 upper-case hex characters.
pub fn generate_certificate_id() -> String {
    let simple = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("CERT-{}", &simple[..12])
}

fn is_valid_certificate_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= CERTIFICATE_ID_MAX
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn certificate_code(code: &str) -> Result<(), ValidationError> {
    if is_valid_certificate_code(code) {
        return Ok(());
    }
    Err(invalid(
        "certificate_code",
        "may only contain letters, digits, '-' and '_' (max 64)",
    ))
}

/// Either an issuer record or a free-text issuer name must be given.
fn issuer_reference(request: &CreateCertificateRequest) -> Result<(), ValidationError> {
    if request.issuer_id.is_some() || request.issuer_name.is_some() {
        return Ok(());
    }
    let mut error = invalid("issuer_reference", "or issuerId is required");
    error.add_param(FIELD_PARAM.into(), &"issuerName");
    Err(error)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "issuer_reference", skip_on_field_errors = false))]
pub struct CreateCertificateRequest {
    /// Generated when omitted.
    #[serde(default)]
    #[validate(custom(function = "certificate_code"))]
    pub certificate_id: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub content: Option<String>,
    #[serde(default)]
    pub issuer_id: Option<Uuid>,
    /// Defaults to the referenced issuer's name.
    #[serde(default)]
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub issuer_name: Option<String>,
    #[validate(email)]
    pub recipient_email: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub recipient_name: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "stellar_public_key"))]
    pub recipient_public_key: Option<String>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateCertificateRequest {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 20000))]
    pub content: Option<String>,
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub recipient_name: Option<String>,
    #[validate(custom(function = "stellar_public_key"))]
    pub recipient_public_key: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RevokeCertificateRequest {
    #[validate(custom(function = "not_blank"), length(max = 2000))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnchorTransactionRequest {
    /// Stellar transaction hash (64 lower-case hex).
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CertificateQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub recipient_email: Option<String>,
    pub issuer_id: Option<Uuid>,
    pub issuer_name: Option<String>,
    pub revoked: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateListResponse {
    pub certificates: Vec<Certificate>,
    pub total: usize,
    pub page: u32,
    pub limit: u32,
}

/// Public verification result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateVerification {
    pub certificate_id: String,
    pub title: String,
    pub issuer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub status: CertificateStatus,
    /// Not revoked and not expired.
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_tx_hash: Option<String>,
    /// Present when the anchor could be checked against Horizon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_verified: Option<bool>,
    pub fingerprint: String,
    pub verified_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_certificate() -> Certificate {
        let now = Utc::now();
        let mut cert = Certificate {
            id: Uuid::new_v4(),
            certificate_id: "CERT-ABC123".to_string(),
            title: "Rust Fundamentals".to_string(),
            description: None,
            content: Some("Completed all modules".to_string()),
            issuer_id: None,
            issuer_name: "Stellar Academy".to_string(),
            recipient_email: "alice@example.com".to_string(),
            recipient_name: Some("Alice".to_string()),
            recipient_public_key: None,
            issued_at: now,
            expires_at: None,
            is_revoked: false,
            revocation_reason: None,
            revoked_at: None,
            blockchain_tx_hash: None,
            fingerprint: String::new(),
            created_at: now,
            updated_at: now,
        };
        cert.refresh_fingerprint();
        cert
    }

    #[test]
    fn status_precedence() {
        let now = Utc::now();
        let mut cert = sample_certificate();
        assert_eq!(cert.status_at(now), CertificateStatus::Pending);

        cert.blockchain_tx_hash = Some("a".repeat(64));
        assert_eq!(cert.status_at(now), CertificateStatus::Active);

        cert.expires_at = Some(now - Duration::days(1));
        assert_eq!(cert.status_at(now), CertificateStatus::Expired);
        assert!(!cert.is_valid_at(now));

        cert.is_revoked = true;
        assert_eq!(cert.status_at(now), CertificateStatus::Revoked);
    }

    #[test]
    fn pending_certificate_is_still_valid() {
        let cert = sample_certificate();
        assert!(cert.is_valid_at(Utc::now()));
    }

    #[test]
    fn fingerprint_tracks_identifying_fields() {
        let mut cert = sample_certificate();
        let original = cert.fingerprint.clone();
        assert_eq!(original.len(), 64);

        cert.description = Some("not part of the fingerprint".to_string());
        cert.refresh_fingerprint();
        assert_eq!(cert.fingerprint, original);

        cert.title = "Advanced Rust".to_string();
        cert.refresh_fingerprint();
        assert_ne!(cert.fingerprint, original);
    }

    #[test]
    fn generated_certificate_ids_have_expected_shape() {
        let id = generate_certificate_id();
        assert_eq!(id.len(), 17);
        assert!(id.starts_with("CERT-"));
        assert!(is_valid_certificate_code(&id));
        assert_ne!(id, generate_certificate_id());
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(resolve_page(None, None), (1, 20));
        assert_eq!(resolve_page(Some(0), Some(500)), (1, 100));
        assert_eq!(
            paginate((1..=45).collect::<Vec<i32>>(), 3, 20),
            (41..=45).collect::<Vec<i32>>()
        );
        assert!(paginate((1..=5).collect::<Vec<i32>>(), 2, 10).is_empty());
    }

    #[test]
    fn register_request_validation_reports_fields() {
        let request = RegisterRequest {
            email: "bad".to_string(),
            password: "weak".to_string(),
            first_name: "".to_string(),
            last_name: "Doe".to_string(),
            phone: None,
        };
        let err = ApiError::from(request.validate().unwrap_err());
        let details = err.details.unwrap();
        assert_eq!(details["email"], serde_json::json!(["email must be an email"]));
        assert!(details["password"][0]
            .as_str()
            .unwrap()
            .starts_with("password must be at least 8 characters"));
        assert_eq!(
            details["firstName"],
            serde_json::json!(["firstName should not be empty"])
        );
        assert!(details.get("lastName").is_none());
    }

    #[test]
    fn create_certificate_requires_an_issuer_reference() {
        let body = serde_json::json!({
            "title": "Course",
            "recipientEmail": "bob@example.com"
        });
        let request: CreateCertificateRequest = serde_json::from_value(body).unwrap();
        let err = ApiError::from(request.validate().unwrap_err());
        assert_eq!(
            err.details.unwrap()["issuerName"],
            serde_json::json!(["issuerName or issuerId is required"])
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let body = serde_json::json!({ "reason": "fraud", "extra": true });
        assert!(serde_json::from_value::<RevokeCertificateRequest>(body).is_err());
    }

    #[test]
    fn user_response_omits_password_hash() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            phone: None,
            role: Role::User,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "A");
        assert_eq!(user.full_name(), "A B");
    }
}
