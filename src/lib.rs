// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! StellarWave - Certificate Issuance Service
//!
//! REST backend for issuing, revoking and verifying certificates anchored on
//! the Stellar network, with queued email notifications.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWT authentication, password hashing and role checks
//! - `email` - Templates, SMTP delivery and the persisted job queue
//! - `middleware` - Correlation ids, metrics, error envelopes, timeouts
//! - `monitoring` - Prometheus registry and Sentry reporting
//! - `stellar` - Horizon client and StrKey helpers
//! - `storage` - Embedded database (redb) and repositories

pub mod api;
pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod state;
pub mod stellar;
pub mod storage;
pub mod validation;
