// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 access tokens.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::Claims;
use super::error::AuthError;
use crate::models::User;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Issues and verifies access tokens with a shared secret.
#[derive(Clone)]
pub struct JwtManager {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    expires_in: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, expires_in: Duration) -> Self {
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            expires_in,
        }
    }

    /// Token lifetime in seconds.
    pub fn expires_in_secs(&self) -> u64 {
        self.expires_in.as_secs()
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.expires_in.as_secs() as i64,
        };
        self.encode_claims(&claims)
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use uuid::Uuid;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "issuer@example.com".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            password_hash: String::new(),
            phone: None,
            role: Role::Issuer,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn claims_expiring_at(exp: i64) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            email: "a@example.com".to_string(),
            role: Role::User,
            iat: exp - 3600,
            exp,
        }
    }

    #[test]
    fn issued_token_round_trips() {
        let jwt = JwtManager::new("secret", Duration::from_secs(3600));
        let user = sample_user();
        let token = jwt.issue(&user).unwrap();

        let claims = jwt.verify(&token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.role, Role::Issuer);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = JwtManager::new("secret", Duration::from_secs(3600));
        let token = jwt
            .encode_claims(&claims_expiring_at(Utc::now().timestamp() - 600))
            .unwrap();
        assert!(matches!(jwt.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn recently_expired_token_is_within_leeway() {
        let jwt = JwtManager::new("secret", Duration::from_secs(3600));
        let token = jwt
            .encode_claims(&claims_expiring_at(Utc::now().timestamp() - 10))
            .unwrap();
        assert!(jwt.verify(&token).is_ok());
    }

    #[test]
    fn wrong_secret_or_garbage_is_invalid() {
        let issuer = JwtManager::new("secret-a", Duration::from_secs(3600));
        let verifier = JwtManager::new("secret-b", Duration::from_secs(3600));
        let token = issuer.issue(&sample_user()).unwrap();

        assert!(matches!(verifier.verify(&token), Err(AuthError::TokenInvalid)));
        assert!(matches!(issuer.verify("not-a-jwt"), Err(AuthError::TokenInvalid)));
    }
}
