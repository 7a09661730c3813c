// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Structured logging setup.
//!
//! Pretty output for local development, JSON lines in production. `RUST_LOG`
//! overrides the default filter.

use sentry::integrations::tracing::{EventFilter, SentryLayer};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `"json"` (any case) selects JSON; anything else is pretty.
    pub fn from_str_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Sentry tracing layer that records log lines as breadcrumbs only.
///
/// Server errors are reported once, by the exception filter.
pub fn sentry_layer<S>() -> SentryLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    sentry::integrations::tracing::layer().event_filter(|metadata| match *metadata.level() {
        Level::ERROR | Level::WARN | Level::INFO => EventFilter::Breadcrumb,
        _ => EventFilter::Ignore,
    })
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(default_level: &str, format: LogFormat, with_sentry: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let sentry_layer = with_sentry.then(sentry_layer);

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(sentry_layer)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_file(true)
                        .with_line_number(true),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(sentry_layer)
                .with(fmt::layer().json().with_target(true))
                .init();
        }
    }

    tracing::info!(format = ?format, "logging initialized");
}
