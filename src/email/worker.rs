// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Background email worker.
//!
//! Consumes job ids from [`EmailQueue`] and delivers them through an
//! [`EmailDispatch`] implementation. Per job:
//!
//! 1. Mark it `active` and count the attempt.
//! 2. On success, drop the record (or keep it as `completed`).
//! 3. On failure with attempts left, mark it `delayed` and re-signal after the
//!    exponential backoff.
//! 4. On the last failure, mark it `failed` with the reason.
//!
//! Jobs left `waiting`, `active` or `delayed` by a previous process are picked
//! up again when the worker starts.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::error::EmailError;
use super::job::{EmailJob, EmailJobData, JobStatus};
use super::queue::EmailQueue;
use crate::monitoring::AppMetrics;
use crate::storage::{EmailJobRepository, StorageError};

/// Delivers one job payload.
#[async_trait]
pub trait EmailDispatch: Send + Sync {
    async fn dispatch(&self, job: &EmailJobData) -> Result<(), EmailError>;
}

pub struct EmailWorker {
    queue: EmailQueue,
    receiver: mpsc::UnboundedReceiver<Uuid>,
    dispatcher: Arc<dyn EmailDispatch>,
    metrics: Option<AppMetrics>,
    shutdown: CancellationToken,
}

impl EmailWorker {
    pub fn new(
        queue: EmailQueue,
        receiver: mpsc::UnboundedReceiver<Uuid>,
        dispatcher: Arc<dyn EmailDispatch>,
    ) -> Self {
        Self {
            queue,
            receiver,
            dispatcher,
            metrics: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Process jobs until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// let handle = tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Email worker starting");
        self.shutdown = shutdown.clone();

        if let Err(e) = self.recover() {
            error!(error = %e, "Email worker: failed to recover persisted jobs");
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Email worker shutting down");
                    return;
                }
                next = self.receiver.recv() => match next {
                    Some(id) => self.process(id).await,
                    None => {
                        info!("Email queue closed; worker stopping");
                        return;
                    }
                },
            }
        }
    }

    fn recover(&self) -> Result<(), StorageError> {
        let pending = EmailJobRepository::new(self.queue.db()).list_by_status(&[
            JobStatus::Waiting,
            JobStatus::Active,
            JobStatus::Delayed,
        ])?;
        if pending.is_empty() {
            return Ok(());
        }

        info!(count = pending.len(), "Email worker: resuming persisted jobs");
        let now = Utc::now();
        for job in pending {
            let remaining = job
                .run_at
                .filter(|_| job.status == JobStatus::Delayed)
                .and_then(|at| (at - now).to_std().ok());
            match remaining {
                Some(delay) => self.schedule(job.id, delay),
                None => self.queue.signal(job.id),
            }
        }
        Ok(())
    }

    async fn process(&self, id: Uuid) {
        let repo = EmailJobRepository::new(self.queue.db());

        let mut job = match repo.get(id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                debug!(job_id = %id, "Email job no longer exists; skipping");
                return;
            }
            Err(e) => {
                error!(job_id = %id, error = %e, "Email worker: failed to load job");
                return;
            }
        };
        if matches!(job.status, JobStatus::Failed | JobStatus::Completed) {
            return;
        }
        // A job left active by a crash on its last attempt must not run again.
        if !job.has_attempts_left() {
            let reason = job
                .failed_reason
                .clone()
                .unwrap_or_else(|| "interrupted on final attempt".to_string());
            if let Err(e) = self.give_up(&repo, job, reason) {
                error!(job_id = %id, error = %e, "Email worker: failed to persist job state");
            }
            return;
        }

        job.status = JobStatus::Active;
        job.attempts_made += 1;
        job.run_at = None;
        job.updated_at = Utc::now();
        if let Err(e) = repo.update(&job) {
            error!(job_id = %id, error = %e, "Email worker: failed to mark job active");
            return;
        }

        info!("Processing {} email job: {}", job.payload.label(), job.id);

        let outcome = self.dispatcher.dispatch(&job.payload).await;
        let result = match outcome {
            Ok(()) => self.complete(&repo, job),
            Err(e) => self.fail(&repo, job, e.to_string()),
        };
        if let Err(e) = result {
            error!(job_id = %id, error = %e, "Email worker: failed to persist job state");
        }
    }

    fn complete(
        &self,
        repo: &EmailJobRepository<'_>,
        mut job: EmailJob,
    ) -> Result<(), StorageError> {
        if job.options.remove_on_complete {
            repo.remove(job.id)?;
            self.queue.record_completed();
        } else {
            // Counted from storage while the record exists.
            job.status = JobStatus::Completed;
            job.failed_reason = None;
            job.updated_at = Utc::now();
            repo.update(&job)?;
        }
        self.record(&job, "completed");
        info!("Email job {} completed", job.id);
        Ok(())
    }

    fn fail(
        &self,
        repo: &EmailJobRepository<'_>,
        mut job: EmailJob,
        reason: String,
    ) -> Result<(), StorageError> {
        job.failed_reason = Some(reason.clone());
        job.updated_at = Utc::now();

        if job.has_attempts_left() {
            let delay = job.options.backoff(job.attempts_made);
            job.status = JobStatus::Delayed;
            job.run_at = chrono::Duration::from_std(delay)
                .ok()
                .map(|d| job.updated_at + d);
            repo.update(&job)?;
            warn!(
                job_id = %job.id,
                attempt = job.attempts_made,
                retry_in_ms = delay.as_millis() as u64,
                "Email job attempt failed: {reason}"
            );
            self.record(&job, "retried");
            self.schedule(job.id, delay);
            return Ok(());
        }

        self.give_up(repo, job, reason)
    }

    fn give_up(
        &self,
        repo: &EmailJobRepository<'_>,
        mut job: EmailJob,
        reason: String,
    ) -> Result<(), StorageError> {
        job.status = JobStatus::Failed;
        job.failed_reason = Some(reason.clone());
        job.run_at = None;
        job.updated_at = Utc::now();
        if job.options.remove_on_fail {
            repo.remove(job.id)?;
        } else {
            repo.update(&job)?;
        }
        error!(
            "Job {} failed after {} attempts: {}",
            job.id, job.attempts_made, reason
        );
        self.record(&job, "failed");
        Ok(())
    }

    /// Re-signal `id` after `delay` unless shutdown comes first.
    fn schedule(&self, id: Uuid, delay: std::time::Duration) {
        let queue = self.queue.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => queue.signal(id),
                _ = shutdown.cancelled() => {}
            }
        });
    }

    fn record(&self, job: &EmailJob, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_email_job(job.payload.name(), outcome);
        }
    }
}
