// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Argon2 password hashing. Hashing runs on the blocking pool.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use super::error::AuthError;

/// Hash and salt a password (PHC string).
pub fn hash_password_blocking(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Compare a password against a stored hash. An unparsable hash never matches.
pub fn verify_password_blocking(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted() {
        let p = "Fel0n1ou$Gru";
        let a = hash_password_blocking(p).unwrap();
        let b = hash_password_blocking(p).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn verify_matches_only_the_original() {
        let hash = hash_password("Str0ng!Pass".to_string()).await.unwrap();
        assert!(verify_password("Str0ng!Pass".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("str0ng!Pass".to_string(), hash).await.unwrap());
    }

    #[test]
    fn garbage_hash_never_matches() {
        assert!(!verify_password_blocking("anything", "not-a-phc-string"));
    }
}
