// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Prometheus Metrics
//!
//! All metrics live in a dedicated [`prometheus::Registry`] owned by
//! [`AppMetrics`] and are rendered at `GET /api/metrics`.

use std::time::Duration;

use prometheus::{
    core::Collector, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

/// Content type of the text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const HTTP_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
const DB_BUCKETS: &[f64] = &[0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

/// Metric handles shared by middleware, repositories and the email worker.
///
/// Cloning is cheap; every handle is reference counted by prometheus.
#[derive(Clone)]
pub struct AppMetrics {
    registry: Registry,
    pub http_request_duration_seconds: HistogramVec,
    pub http_requests_total: IntCounterVec,
    pub http_errors_total: IntCounterVec,
    pub db_query_duration_seconds: HistogramVec,
    pub db_connection_status: IntGauge,
    pub certificate_issued_total: IntCounterVec,
    pub certificate_verified_total: IntCounterVec,
    pub authentication_attempts_total: IntCounterVec,
    pub email_jobs_total: IntCounterVec,
}

fn register<C: Collector + Clone + 'static>(
    registry: &Registry,
    collector: C,
) -> Result<C, prometheus::Error> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_request_duration_seconds = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "http_request_duration_seconds",
                    "Duration of HTTP requests in seconds",
                )
                .buckets(HTTP_BUCKETS.to_vec()),
                &["method", "route", "status"],
            )?,
        )?;
        let http_requests_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total number of HTTP requests"),
                &["method", "route", "status"],
            )?,
        )?;
        let http_errors_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("http_errors_total", "Total number of HTTP error responses"),
                &["method", "route", "status"],
            )?,
        )?;
        let db_query_duration_seconds = register(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "db_query_duration_seconds",
                    "Duration of database operations in seconds",
                )
                .buckets(DB_BUCKETS.to_vec()),
                &["query_type"],
            )?,
        )?;
        let db_connection_status = register(
            &registry,
            IntGauge::new(
                "db_connection_status",
                "Database status (1 = healthy, 0 = unhealthy)",
            )?,
        )?;
        let certificate_issued_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("certificate_issued_total", "Total certificates issued"),
                &["issuer_id"],
            )?,
        )?;
        let certificate_verified_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("certificate_verified_total", "Total certificate verifications"),
                &["issuer_id"],
            )?,
        )?;
        let authentication_attempts_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "authentication_attempts_total",
                    "Total authentication attempts",
                ),
                &["status"],
            )?,
        )?;
        let email_jobs_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new("email_jobs_total", "Email jobs processed by outcome"),
                &["type", "outcome"],
            )?,
        )?;

        Ok(Self {
            registry,
            http_request_duration_seconds,
            http_requests_total,
            http_errors_total,
            db_query_duration_seconds,
            db_connection_status,
            certificate_issued_total,
            certificate_verified_total,
            authentication_attempts_total,
            email_jobs_total,
        })
    }

    pub fn record_http_request(&self, method: &str, route: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        let labels = [method, route, status.as_str()];
        self.http_request_duration_seconds
            .with_label_values(&labels)
            .observe(elapsed.as_secs_f64());
        self.http_requests_total.with_label_values(&labels).inc();
        if status.starts_with('4') || status.starts_with('5') {
            self.http_errors_total.with_label_values(&labels).inc();
        }
    }

    pub fn record_db_query(&self, query_type: &str, elapsed: Duration) {
        self.db_query_duration_seconds
            .with_label_values(&[query_type])
            .observe(elapsed.as_secs_f64());
    }

    pub fn set_db_connection_status(&self, healthy: bool) {
        self.db_connection_status.set(i64::from(healthy));
    }

    pub fn record_certificate_issued(&self, issuer_id: &str) {
        self.certificate_issued_total
            .with_label_values(&[issuer_id])
            .inc();
    }

    pub fn record_certificate_verified(&self, issuer_id: &str) {
        self.certificate_verified_total
            .with_label_values(&[issuer_id])
            .inc();
    }

    pub fn record_authentication_attempt(&self, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.authentication_attempts_total
            .with_label_values(&[status])
            .inc();
    }

    pub fn record_email_job(&self, job_type: &str, outcome: &str) {
        self.email_jobs_total
            .with_label_values(&[job_type, outcome])
            .inc();
    }

    /// Render every registered metric in the text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Collapse ids in a raw path so label cardinality stays bounded.
///
/// Numeric segments become `{id}`, UUID-shaped segments `{uuid}`; the query
/// string is dropped.
pub fn normalize_route(path: &str) -> String {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "{id}"
            } else if segment.len() == 36
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_hexdigit() || b == b'-')
            {
                "{uuid}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
