// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted email job records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dto::{
    SendCertificateIssuedDto, SendEmailDto, SendPasswordResetDto, SendRevocationNoticeDto,
    SendVerificationDto,
};

/// Job name plus its payload. The name is the queue's job type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data", rename_all = "kebab-case")]
pub enum EmailJobData {
    SendEmail(SendEmailDto),
    SendCertificateIssued(SendCertificateIssuedDto),
    SendVerification(SendVerificationDto),
    SendPasswordReset(SendPasswordResetDto),
    SendRevocation(SendRevocationNoticeDto),
}

impl EmailJobData {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendEmail(_) => "send-email",
            Self::SendCertificateIssued(_) => "send-certificate-issued",
            Self::SendVerification(_) => "send-verification",
            Self::SendPasswordReset(_) => "send-password-reset",
            Self::SendRevocation(_) => "send-revocation",
        }
    }

    /// Human label used in log lines and endpoint messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SendEmail(_) => "generic",
            Self::SendCertificateIssued(_) => "certificate issued",
            Self::SendVerification(_) => "verification",
            Self::SendPasswordReset(_) => "password reset",
            Self::SendRevocation(_) => "revocation notice",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Self::SendEmail(dto) => &dto.to,
            Self::SendCertificateIssued(dto) => &dto.to,
            Self::SendVerification(dto) => &dto.to,
            Self::SendPasswordReset(dto) => &dto.to,
            Self::SendRevocation(dto) => &dto.to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Waiting,
    Active,
    /// Waiting out a retry backoff.
    Delayed,
    /// Out of attempts. Kept for inspection unless `remove_on_fail`.
    Failed,
    /// Only persisted when `remove_on_complete` is off.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub attempts: u32,
    /// Base of the exponential backoff.
    pub backoff_delay_ms: u64,
    pub remove_on_complete: bool,
    pub remove_on_fail: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_delay_ms: 2000,
            remove_on_complete: true,
            remove_on_fail: false,
        }
    }
}

impl JobOptions {
    /// Delay before the next try after `attempts_made` failures.
    pub fn backoff(&self, attempts_made: u32) -> Duration {
        let exponent = attempts_made.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_delay_ms.saturating_mul(1u64 << exponent))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailJob {
    pub id: Uuid,
    pub payload: EmailJobData,
    pub status: JobStatus,
    pub attempts_made: u32,
    pub options: JobOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_reason: Option<String>,
    /// Set while delayed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailJob {
    pub fn new(payload: EmailJobData, options: JobOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payload,
            status: JobStatus::Waiting,
            attempts_made: 0,
            options,
            failed_reason: None,
            run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_attempts_left(&self) -> bool {
        self.attempts_made < self.options.attempts
    }
}
