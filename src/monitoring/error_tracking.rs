// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sentry error tracking.
//!
//! Only initialised when `ENABLE_SENTRY=true` and `SENTRY_DSN` is set. When it
//! is off, [`capture_server_error`] is a no-op: the caller has already logged.

use std::borrow::Cow;

use tracing::{debug, info, warn};

use crate::config::{Environment, SentryConfig};

/// Request metadata attached to a reported error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub status: u16,
    pub correlation_id: Option<&'a str>,
    pub error_code: &'a str,
}

/// Initialise the Sentry client. Keep the guard alive for the process lifetime.
pub fn init(config: &SentryConfig, environment: Environment) -> Option<sentry::ClientInitGuard> {
    let dsn = match (&config.dsn, config.enabled) {
        (Some(dsn), true) => dsn,
        _ => {
            debug!("Sentry is disabled or DSN is not configured");
            return None;
        }
    };

    let dsn = match dsn.parse::<sentry::types::Dsn>() {
        Ok(dsn) => dsn,
        Err(e) => {
            warn!(error = %e, "invalid SENTRY_DSN; error tracking disabled");
            return None;
        }
    };

    let guard = sentry::init(sentry::ClientOptions {
        dsn: Some(dsn),
        environment: Some(Cow::Borrowed(environment.as_str())),
        release: sentry::release_name!(),
        traces_sample_rate: if environment.is_production() { 0.1 } else { 1.0 },
        debug: !environment.is_production(),
        ..Default::default()
    });

    info!(environment = environment.as_str(), "Sentry initialized");
    Some(guard)
}

/// Report a 5xx response.
pub fn capture_server_error(message: &str, context: &ErrorContext<'_>) {
    if sentry::Hub::current().client().is_none() {
        return;
    }

    sentry::with_scope(
        |scope| {
            scope.set_tag("http.method", context.method);
            scope.set_tag("http.path", context.path);
            scope.set_tag("http.status_code", context.status);
            scope.set_tag("error_code", context.error_code);
            if let Some(id) = context.correlation_id {
                scope.set_tag("correlation_id", id);
            }
        },
        || sentry::capture_message(message, sentry::Level::Error),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_skipped_without_dsn() {
        let config = SentryConfig {
            dsn: None,
            enabled: true,
        };
        assert!(init(&config, Environment::Test).is_none());
    }

    #[test]
    fn init_is_skipped_when_disabled() {
        let config = SentryConfig {
            dsn: Some("https://public@sentry.example.com/1".to_string()),
            enabled: false,
        };
        assert!(init(&config, Environment::Test).is_none());
    }

    #[test]
    fn capture_without_client_is_noop() {
        capture_server_error(
            "boom",
            &ErrorContext {
                method: "GET",
                path: "/api/health",
                status: 500,
                correlation_id: Some("abc"),
                error_code: "INTERNAL_SERVER_ERROR",
            },
        );
    }
}
