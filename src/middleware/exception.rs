// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Global exception filter.
//!
//! Turns every 4xx/5xx response into the uniform error envelope:
//!
//! - responses built from [`ApiError`] carry the error in their extensions and
//!   are completed with path, method and correlation id;
//! - bare framework responses (405, 413, ...) become `HTTP_ERROR`;
//! - JSON bodies written by handlers on purpose (health checks) pass through.
//!
//! 4xx are logged at warn. 5xx are logged at error and sent to Sentry.

use std::any::Any;

use axum::{
    extract::Request,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        response::Parts,
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use super::correlation::RequestContext;
use crate::error::{ApiError, ErrorCode, ErrorEnvelope};
use crate::monitoring::error_tracking::{self, ErrorContext};

pub async fn exception_filter(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let correlation_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.correlation_id.clone());

    let response = next.run(request).await;
    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let error = match parts.extensions.remove::<ApiError>() {
        Some(error) => error,
        None if is_json(&parts) => return Response::from_parts(parts, body),
        None => bare_error(status),
    };

    if error.is_server_error() {
        error!(
            correlation_id = correlation_id.as_deref().unwrap_or("-"),
            %method,
            %path,
            status = error.status.as_u16(),
            error_code = %error.code,
            "{}",
            error.message
        );
        error_tracking::capture_server_error(
            &error.message,
            &ErrorContext {
                method: &method,
                path: &path,
                status: error.status.as_u16(),
                correlation_id: correlation_id.as_deref(),
                error_code: error.code.as_str(),
            },
        );
    } else {
        warn!(
            correlation_id = correlation_id.as_deref().unwrap_or("-"),
            %method,
            %path,
            status = error.status.as_u16(),
            error_code = %error.code,
            "{}",
            error.message
        );
    }

    let envelope = ErrorEnvelope {
        path,
        method,
        correlation_id,
        ..ErrorEnvelope::from_error(&error)
    };
    let mut rebuilt = (error.status, Json(envelope)).into_response();
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rebuilt.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rebuilt
}

fn is_json(parts: &Parts) -> bool {
    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

fn bare_error(status: StatusCode) -> ApiError {
    let message = status.canonical_reason().unwrap_or("HTTP error");
    ApiError::with_message(ErrorCode::HttpError, message).with_status(status)
}

/// Response for a panicking handler, used with `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::internal(format!("handler panicked: {detail}")).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::correlation::correlation_id;
    use axum::{
        body::{to_bytes, Body},
        middleware,
        routing::get,
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;
    use tracing_subscriber::layer::SubscriberExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/missing",
                get(|| async { ApiError::new(ErrorCode::CertificateNotFound) }),
            )
            .route(
                "/teapot",
                get(|| async { (StatusCode::IM_A_TEAPOT, "short and stout") }),
            )
            .route(
                "/health",
                get(|| async {
                    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"status": "error"})))
                }),
            )
            .route(
                "/internal",
                get(|| async { ApiError::internal("database unavailable") }),
            )
            .route("/panic", get(|| async { panic!("boom") as () }))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn(exception_filter))
            .layer(middleware::from_fn(correlation_id))
    }

    async fn call(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header("x-correlation-id", "corr-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn api_error_gets_request_fields() {
        let (status, body) = call("/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorCode"], "CERTIFICATE_NOT_FOUND");
        assert_eq!(body["message"], "Certificate not found");
        assert_eq!(body["path"], "/missing");
        assert_eq!(body["method"], "GET");
        assert_eq!(body["correlationId"], "corr-1");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn bare_errors_are_wrapped() {
        let (status, body) = call("/teapot").await;
        assert_eq!(status, StatusCode::IM_A_TEAPOT);
        assert_eq!(body["errorCode"], "HTTP_ERROR");
        assert_eq!(body["message"], "I'm a teapot");
    }

    #[tokio::test]
    async fn handler_json_passes_through() {
        let (status, body) = call("/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"status": "error"}));
    }

    #[test]
    fn server_error_is_reported_to_sentry_once() {
        let subscriber = tracing_subscriber::registry().with(crate::logging::sentry_layer());
        let events = sentry::test::with_captured_events(|| {
            tracing::subscriber::with_default(subscriber, || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                let (status, body) = runtime.block_on(call("/internal"));
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body["correlationId"], "corr-1");
            })
        });

        assert_eq!(events.len(), 1);
        let tags = &events[0].tags;
        assert_eq!(tags.get("error_code").map(String::as_str), Some("INTERNAL_SERVER_ERROR"));
        assert_eq!(tags.get("correlation_id").map(String::as_str), Some("corr-1"));
        assert_eq!(tags.get("http.path").map(String::as_str), Some("/internal"));
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let (status, body) = call("/panic").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errorCode"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["message"], "Internal server error");
    }
}
