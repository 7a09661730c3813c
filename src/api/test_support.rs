// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures shared by the handler tests.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Role};
use crate::models::User;
use crate::state::AppState;
use crate::storage::UserRepository;

/// Store an active user. The password hash is a placeholder; use
/// `hash_password_blocking` when a test needs to log in.
pub fn seed_user(state: &AppState, email: &str, role: Role) -> User {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password_hash: "not-a-hash".to_string(),
        phone: None,
        role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    UserRepository::new(&state.db).create(&user).unwrap();
    user
}

pub fn authenticated(user: &User) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

pub fn bearer(state: &AppState, user: &User) -> String {
    format!("Bearer {}", state.jwt.issue(user).unwrap())
}

/// Send one request through `app` and decode the JSON body (`Null` if empty).
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}
