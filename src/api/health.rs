// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Health probes.
//!
//! Indicator responses share one shape: every indicator lands in `details`,
//! healthy ones also in `info`, failing ones also in `error`. Any failing
//! indicator turns the response into a 503.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;

const DATABASE: &str = "database";
const STELLAR: &str = "stellar";

/// Aggregated indicator results.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// "ok" or "error".
    pub status: String,
    #[schema(value_type = Object)]
    pub info: Map<String, Value>,
    #[schema(value_type = Object)]
    pub error: Map<String, Value>,
    #[schema(value_type = Object)]
    pub details: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LivenessResponse {
    pub status: String,
    pub timestamp: String,
    pub message: String,
}

/// Outcome of a single indicator.
struct Indicator {
    name: &'static str,
    up: bool,
    body: Value,
}

impl Indicator {
    fn up(name: &'static str, mut extra: Map<String, Value>) -> Self {
        extra.insert("status".into(), "up".into());
        Self {
            name,
            up: true,
            body: Value::Object(extra),
        }
    }

    fn down(name: &'static str, message: impl Into<String>) -> Self {
        Self {
            name,
            up: false,
            body: json!({ "status": "down", "message": message.into() }),
        }
    }
}

fn aggregate(indicators: Vec<Indicator>) -> (StatusCode, Json<HealthCheckResponse>) {
    let mut response = HealthCheckResponse {
        status: "ok".to_string(),
        info: Map::new(),
        error: Map::new(),
        details: Map::new(),
        uptime_seconds: None,
        timestamp: None,
    };
    for indicator in indicators {
        let bucket = if indicator.up {
            &mut response.info
        } else {
            &mut response.error
        };
        bucket.insert(indicator.name.into(), indicator.body.clone());
        response.details.insert(indicator.name.into(), indicator.body);
    }

    if response.error.is_empty() {
        (StatusCode::OK, Json(response))
    } else {
        response.status = "error".to_string();
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

fn check_database(state: &AppState) -> Indicator {
    let result = state.db.ping();
    state.metrics.set_db_connection_status(result.is_ok());
    match result {
        Ok(()) => {
            let mut extra = Map::new();
            extra.insert("message".into(), "Database connection is healthy".into());
            Indicator::up(DATABASE, extra)
        }
        Err(e) => {
            warn!(error = %e, "database health check failed");
            Indicator::down(DATABASE, format!("Database connection failed: {e}"))
        }
    }
}

async fn check_stellar(state: &AppState) -> Indicator {
    match state.horizon.check_network_health().await {
        Ok(status) if !status.passphrase_matches => Indicator::down(
            STELLAR,
            format!(
                "Horizon network passphrase mismatch: expected \"{}\", got \"{}\"",
                status.network.passphrase(),
                status.network_passphrase
            ),
        ),
        Ok(status) => {
            let mut extra = match serde_json::to_value(&status) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            };
            extra.insert("message".into(), "Stellar network is reachable".into());
            Indicator::up(STELLAR, extra)
        }
        Err(e) => {
            warn!(error = %e, "stellar health check failed");
            Indicator::down(STELLAR, format!("Stellar network is unreachable: {e}"))
        }
    }
}

/// Basic health check.
///
/// Always 200 while the process can answer.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Service is up", body = HealthCheckResponse))
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthCheckResponse>) {
    let (status, Json(mut response)) = aggregate(Vec::new());
    response.uptime_seconds = Some(state.uptime_seconds());
    response.timestamp = Some(Utc::now().to_rfc3339());
    (status, Json(response))
}

/// Readiness probe: database and Stellar network.
#[utoipa::path(
    get,
    path = "/api/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = HealthCheckResponse),
        (status = 503, description = "A dependency is down", body = HealthCheckResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthCheckResponse>) {
    let database = check_database(&state);
    let stellar = check_stellar(&state).await;
    aggregate(vec![database, stellar])
}

#[utoipa::path(
    get,
    path = "/api/health/database",
    tag = "Health",
    responses(
        (status = 200, body = HealthCheckResponse),
        (status = 503, body = HealthCheckResponse)
    )
)]
pub async fn database(State(state): State<AppState>) -> (StatusCode, Json<HealthCheckResponse>) {
    aggregate(vec![check_database(&state)])
}

#[utoipa::path(
    get,
    path = "/api/health/stellar",
    tag = "Health",
    responses(
        (status = 200, body = HealthCheckResponse),
        (status = 503, body = HealthCheckResponse)
    )
)]
pub async fn stellar(State(state): State<AppState>) -> (StatusCode, Json<HealthCheckResponse>) {
    aggregate(vec![check_stellar(&state).await])
}

/// Liveness probe handler.
///
/// Does not check dependencies; use readiness for that.
#[utoipa::path(
    get,
    path = "/api/health/live",
    tag = "Health",
    responses((status = 200, description = "Service is alive", body = LivenessResponse))
)]
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        message: "Application is alive".to_string(),
    })
}
