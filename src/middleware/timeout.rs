// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{ApiError, ErrorCode};

/// Fail with `REQUEST_TIMEOUT` (408) when the handler runs past `limit`.
pub async fn request_timeout(
    State(limit): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => ApiError::new(ErrorCode::RequestTimeout).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(limit: Duration) -> Router {
        Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    "done"
                }),
            )
            .layer(middleware::from_fn_with_state(limit, request_timeout))
    }

    async fn status(limit: Duration) -> StatusCode {
        app(limit)
            .oneshot(Request::builder().uri("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn slow_handler_times_out() {
        assert_eq!(status(Duration::from_millis(20)).await, StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn fast_enough_handler_completes() {
        assert_eq!(status(Duration::from_secs(5)).await, StatusCode::OK);
    }
}
