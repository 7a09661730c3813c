// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtManager;
use crate::config::AppConfig;
use crate::email::EmailQueue;
use crate::monitoring::AppMetrics;
use crate::stellar::HorizonClient;
use crate::storage::Database;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<Database>,
    pub jwt: JwtManager,
    pub metrics: AppMetrics,
    pub horizon: HorizonClient,
    pub email_queue: EmailQueue,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: Arc<Database>,
        metrics: AppMetrics,
        horizon: HorizonClient,
        email_queue: EmailQueue,
    ) -> Self {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_expires_in);
        Self {
            config: Arc::new(config),
            db,
            jwt,
            metrics,
            horizon,
            email_queue,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// State over an in-memory database and the log email transport. No worker is
/// attached, so queued jobs stay `waiting`.
#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let config = AppConfig::for_tests();
    let horizon_url = config.horizon_url.clone();
    test_state_with_horizon(config, &horizon_url)
}

/// Like [`test_state`] but pointed at a mock Horizon server.
#[cfg(test)]
pub(crate) fn test_state_with_horizon(mut config: AppConfig, horizon_url: &str) -> AppState {
    config.horizon_url = horizon_url.to_string();
    let metrics = AppMetrics::new().unwrap();
    let db = Arc::new(Database::in_memory().unwrap().with_metrics(metrics.clone()));
    let horizon = HorizonClient::new(config.stellar_network, horizon_url).unwrap();
    let (email_queue, _receiver) = EmailQueue::new(db.clone());
    AppState::new(config, db, metrics, horizon, email_queue)
}
