// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use stellarwave_server::{
    api::{router, users::seed_admin},
    config::{AppConfig, DEFAULT_LOG_LEVEL, ENABLE_SENTRY_ENV, LOG_FORMAT_ENV},
    email::{EmailQueue, EmailService, EmailWorker},
    logging::{init_logging, LogFormat},
    monitoring::{error_tracking, AppMetrics},
    state::AppState,
    stellar::HorizonClient,
    storage::Database,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let log_format = std::env::var(LOG_FORMAT_ENV)
        .map(|v| LogFormat::from_str_lossy(&v))
        .unwrap_or(LogFormat::Pretty);
    let sentry_requested = std::env::var(ENABLE_SENTRY_ENV)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    init_logging(DEFAULT_LOG_LEVEL, log_format, sentry_requested);

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    let _sentry = error_tracking::init(&config.sentry, config.environment);

    let metrics = AppMetrics::new()?;

    let db_path = config.database_path();
    let db = Arc::new(Database::open(&db_path)?.with_metrics(metrics.clone()));
    metrics.set_db_connection_status(true);
    info!(path = %db_path.display(), "database opened");

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        seed_admin(&db, email, password.clone())
            .await
            .map_err(|e| anyhow::anyhow!("failed to seed admin account: {}", e.message))?;
    }

    let horizon = HorizonClient::new(config.stellar_network, config.horizon_url.clone())?;
    info!(
        network = config.stellar_network.as_str(),
        horizon_url = %config.horizon_url,
        "Stellar network configured"
    );

    let email_service = EmailService::new(&config.email)?;
    if !email_service.verify_connection().await {
        warn!("email relay unreachable; jobs will retry until it recovers");
    }

    let (email_queue, receiver) = EmailQueue::new(db.clone());
    let shutdown = CancellationToken::new();
    let worker = EmailWorker::new(email_queue.clone(), receiver, Arc::new(email_service))
        .with_metrics(metrics.clone());
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    let addr = config.bind_address();
    let state = AppState::new(config, db, metrics, horizon, email_queue);
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("StellarWave server listening on http://{addr} (docs at /api/docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "email worker did not stop cleanly");
    }
    info!("server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM and tell background tasks to stop.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
    shutdown.cancel();
}
