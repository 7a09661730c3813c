// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use super::health::LivenessResponse;
use crate::{error::ApiError, monitoring::PROMETHEUS_CONTENT_TYPE, state::AppState};

/// Prometheus scrape endpoint.
#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "Metrics",
    responses((status = 200, description = "Prometheus text exposition", content_type = "text/plain"))
)]
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| ApiError::internal(format!("failed to encode metrics: {e}")))?;
    Ok(([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response())
}

#[utoipa::path(
    get,
    path = "/api/metrics/health",
    tag = "Metrics",
    responses((status = 200, body = LivenessResponse))
)]
pub async fn metrics_health() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        message: "Metrics endpoint is healthy".to_string(),
    })
}
