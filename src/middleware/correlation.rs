// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Correlation ids.
//!
//! Every request gets a [`RequestContext`] in its extensions. The id comes
//! from `x-correlation-id` when the caller sent a usable one, otherwise a new
//! uuid v4 is generated. It is echoed on the response.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::info;
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub correlation_id: String,
    /// Set by the request-id layer.
    pub request_id: Option<String>,
}

fn header_id(request: &Request, name: &HeaderName) -> Option<String> {
    let value = request.headers().get(name)?.to_str().ok()?.trim();
    let usable = !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());
    usable.then(|| value.to_string())
}

pub async fn correlation_id(mut request: Request, next: Next) -> Response {
    let correlation_id =
        header_id(&request, &CORRELATION_ID_HEADER).unwrap_or_else(|| Uuid::new_v4().to_string());
    let request_id = header_id(&request, &REQUEST_ID_HEADER);

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    request.extensions_mut().insert(RequestContext {
        correlation_id: correlation_id.clone(),
        request_id,
    });

    info!(correlation_id = %correlation_id, %method, %path, "Incoming request");
    let start = Instant::now();

    let mut response = next.run(request).await;

    info!(
        correlation_id = %correlation_id,
        %method,
        %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
