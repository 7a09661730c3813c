// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP request pipeline.
//!
//! [`apply`] wraps a router in the full stack, outermost first:
//!
//! 1. CORS
//! 2. `x-request-id` (set when absent, propagated to the response)
//! 3. trace span
//! 4. correlation id and request logging
//! 5. HTTP metrics
//! 6. exception filter
//! 7. panic catcher
//! 8. request timeout

pub mod correlation;
pub mod exception;
pub mod metrics;
pub mod timeout;

use std::time::Duration;

use axum::{
    extract::Request,
    http::{header, HeaderName, Method},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

pub use correlation::{RequestContext, CORRELATION_ID_HEADER, REQUEST_ID_HEADER};
pub use exception::{exception_filter, panic_response};
pub use metrics::track_metrics;
pub use timeout::request_timeout;

use crate::monitoring::AppMetrics;

/// CORS for the configured origins. `*` allows any origin without credentials.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            CORRELATION_ID_HEADER,
            REQUEST_ID_HEADER,
        ])
        .expose_headers([CORRELATION_ID_HEADER, REQUEST_ID_HEADER]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<_> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
}

/// Wrap `router` in the request pipeline.
pub fn apply(
    router: Router,
    origins: &[String],
    metrics: AppMetrics,
    request_timeout_limit: Duration,
) -> Router {
    let x_request_id = HeaderName::from_static("x-request-id");

    let stack = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = request
                        .headers()
                        .get(REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(from_fn(correlation::correlation_id))
        .layer(from_fn_with_state(metrics, track_metrics))
        .layer(from_fn(exception_filter))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn_with_state(request_timeout_limit, request_timeout));

    // CORS is applied as its own outermost layer: it requires a `Default`
    // response body, which the trace layer's body type does not provide.
    router.layer(stack).layer(cors_layer(origins))
}
