// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Metrics and error tracking.

pub mod error_tracking;
pub mod metrics;

pub use metrics::{normalize_route, AppMetrics, PROMETHEUS_CONTENT_TYPE};
