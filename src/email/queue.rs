// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email queue producer.
//!
//! Jobs are written to the `email_jobs` table before the worker is signalled,
//! so a job accepted here survives a restart even if the worker never saw it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::dto::{
    SendCertificateIssuedDto, SendEmailDto, SendPasswordResetDto, SendRevocationNoticeDto,
    SendVerificationDto,
};
use super::error::QueueError;
use super::job::{EmailJob, EmailJobData, JobOptions, JobStatus};
use crate::storage::{Database, EmailJobRepository};

/// Counts per job state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QueueStats {
    pub waiting: u64,
    pub active: u64,
    pub delayed: u64,
    pub failed: u64,
    /// Completed since startup plus any completed records still stored.
    pub completed: u64,
}

#[derive(Clone)]
pub struct EmailQueue {
    db: Arc<Database>,
    sender: mpsc::UnboundedSender<Uuid>,
    completed: Arc<AtomicU64>,
    options: JobOptions,
}

impl EmailQueue {
    /// Create the queue and the receiving end for [`EmailWorker`](super::EmailWorker).
    pub fn new(db: Arc<Database>) -> (Self, mpsc::UnboundedReceiver<Uuid>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            db,
            sender,
            completed: Arc::new(AtomicU64::new(0)),
            options: JobOptions::default(),
        };
        (queue, receiver)
    }

    /// Options applied to jobs added after this call.
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    /// Persist a job and wake the worker.
    pub fn add(&self, payload: EmailJobData) -> Result<EmailJob, QueueError> {
        let job = EmailJob::new(payload, self.options);
        EmailJobRepository::new(&self.db).insert(&job)?;
        self.signal(job.id);
        info!("Queued {} email job: {}", job.payload.label(), job.id);
        Ok(job)
    }

    pub fn add_email(&self, dto: SendEmailDto) -> Result<EmailJob, QueueError> {
        self.add(EmailJobData::SendEmail(dto))
    }

    pub fn add_certificate_issued(
        &self,
        dto: SendCertificateIssuedDto,
    ) -> Result<EmailJob, QueueError> {
        self.add(EmailJobData::SendCertificateIssued(dto))
    }

    pub fn add_verification(&self, dto: SendVerificationDto) -> Result<EmailJob, QueueError> {
        self.add(EmailJobData::SendVerification(dto))
    }

    pub fn add_password_reset(&self, dto: SendPasswordResetDto) -> Result<EmailJob, QueueError> {
        self.add(EmailJobData::SendPasswordReset(dto))
    }

    pub fn add_revocation_notice(
        &self,
        dto: SendRevocationNoticeDto,
    ) -> Result<EmailJob, QueueError> {
        self.add(EmailJobData::SendRevocation(dto))
    }

    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        let repo = EmailJobRepository::new(&self.db);
        let count = |status| repo.count_by_status(status).map(|n| n as u64);
        Ok(QueueStats {
            waiting: count(JobStatus::Waiting)?,
            active: count(JobStatus::Active)?,
            delayed: count(JobStatus::Delayed)?,
            failed: count(JobStatus::Failed)?,
            completed: self.completed.load(Ordering::Relaxed) + count(JobStatus::Completed)?,
        })
    }

    /// Hand a stored job to the worker. Without a running worker the job stays
    /// persisted and is picked up on the next start.
    pub(crate) fn signal(&self, id: Uuid) {
        if self.sender.send(id).is_err() {
            warn!(job_id = %id, "email worker is not running; job stays queued");
        }
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}
