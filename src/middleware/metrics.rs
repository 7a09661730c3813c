// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::monitoring::{normalize_route, AppMetrics};

/// Record duration, count and errors for every request.
///
/// The route label is the matched route template so ids don't blow up label
/// cardinality. Unmatched paths fall back to [`normalize_route`].
pub async fn track_metrics(
    State(metrics): State<AppMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let route = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_route(request.uri().path()),
    };

    let start = Instant::now();
    let response = next.run(request).await;
    metrics.record_http_request(&method, &route, response.status().as_u16(), start.elapsed());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn labels_with_route_template() {
        let metrics = AppMetrics::new().unwrap();
        let app = Router::new()
            .route("/items/{id}", get(|| async { StatusCode::NO_CONTENT }))
            .layer(middleware::from_fn_with_state(metrics.clone(), track_metrics));

        for id in ["1", "2"] {
            app.clone()
                .oneshot(
                    Request::builder()
                        .uri(format!("/items/{id}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
        }

        let count = metrics
            .http_requests_total
            .with_label_values(&["GET", "/items/{id}", "204"])
            .get();
        assert_eq!(count, 2);
    }
}
