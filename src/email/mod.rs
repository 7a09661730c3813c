// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transactional email: templates, delivery and the background queue.

pub mod dto;
pub mod error;
pub mod job;
pub mod queue;
pub mod service;
pub mod templates;
pub mod worker;

pub use dto::{
    EmailQueuedResponse, SendCertificateIssuedDto, SendEmailDto, SendPasswordResetDto,
    SendRevocationNoticeDto, SendVerificationDto,
};
pub use error::{EmailError, QueueError};
pub use job::{EmailJob, EmailJobData, JobOptions, JobStatus};
pub use queue::{EmailQueue, QueueStats};
pub use service::EmailService;
pub use templates::EmailTemplates;
pub use worker::{EmailDispatch, EmailWorker};
