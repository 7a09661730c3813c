// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Email job repository. Backs the email queue across restarts.

use redb::ReadableTable;
use uuid::Uuid;

use crate::email::job::{EmailJob, JobStatus};
use crate::storage::database::{
    get_json, list_json, to_json, Database, StorageError, StorageResult, EMAIL_JOBS,
};

pub struct EmailJobRepository<'a> {
    db: &'a Database,
}

impl<'a> EmailJobRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn insert(&self, job: &EmailJob) -> StorageResult<()> {
        let key = job.id.to_string();
        let json = to_json(job)?;
        self.db.write("email_jobs.insert", |txn| {
            let mut table = txn.open_table(EMAIL_JOBS)?;
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    pub fn get(&self, id: Uuid) -> StorageResult<Option<EmailJob>> {
        let key = id.to_string();
        self.db.read("email_jobs.get", |txn| {
            let table = txn.open_table(EMAIL_JOBS)?;
            get_json(&table, &key)
        })
    }

    pub fn update(&self, job: &EmailJob) -> StorageResult<()> {
        let key = job.id.to_string();
        let json = to_json(job)?;
        self.db.write("email_jobs.update", |txn| {
            let mut table = txn.open_table(EMAIL_JOBS)?;
            if table.get(key.as_str())?.is_none() {
                return Err(StorageError::NotFound("Email job".to_string()));
            }
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    /// Returns whether a record was removed.
    pub fn remove(&self, id: Uuid) -> StorageResult<bool> {
        let key = id.to_string();
        self.db.write("email_jobs.remove", |txn| {
            let mut table = txn.open_table(EMAIL_JOBS)?;
            let removed = table.remove(key.as_str())?.is_some();
            Ok(removed)
        })
    }

    /// Jobs in any of `statuses`, oldest first.
    pub fn list_by_status(&self, statuses: &[JobStatus]) -> StorageResult<Vec<EmailJob>> {
        let all: Vec<EmailJob> = self.db.read("email_jobs.list", |txn| {
            let table = txn.open_table(EMAIL_JOBS)?;
            list_json(&table)
        })?;
        let mut jobs: Vec<EmailJob> = all
            .into_iter()
            .filter(|job| statuses.contains(&job.status))
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    pub fn count_by_status(&self, status: JobStatus) -> StorageResult<usize> {
        Ok(self.list_by_status(&[status])?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::dto::SendPasswordResetDto;
    use crate::email::job::{EmailJobData, JobOptions};

    fn sample_job() -> EmailJob {
        EmailJob::new(
            EmailJobData::SendPasswordReset(SendPasswordResetDto {
                to: "user@example.com".to_string(),
                user_name: "User".to_string(),
                reset_link: "https://stellarcert.com/reset/xyz".to_string(),
            }),
            JobOptions::default(),
        )
    }

    #[test]
    fn insert_get_update_remove() {
        let db = Database::in_memory().unwrap();
        let repo = EmailJobRepository::new(&db);
        let mut job = sample_job();
        repo.insert(&job).unwrap();
        assert_eq!(repo.get(job.id).unwrap().unwrap().payload, job.payload);

        job.status = JobStatus::Failed;
        job.failed_reason = Some("smtp down".to_string());
        repo.update(&job).unwrap();
        assert_eq!(repo.get(job.id).unwrap().unwrap().status, JobStatus::Failed);

        assert!(repo.remove(job.id).unwrap());
        assert!(!repo.remove(job.id).unwrap());
        assert!(matches!(repo.update(&job), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn list_and_count_by_status() {
        let db = Database::in_memory().unwrap();
        let repo = EmailJobRepository::new(&db);
        let waiting = sample_job();
        let mut delayed = sample_job();
        delayed.status = JobStatus::Delayed;
        let mut failed = sample_job();
        failed.status = JobStatus::Failed;
        for job in [&waiting, &delayed, &failed] {
            repo.insert(job).unwrap();
        }

        let pending = repo
            .list_by_status(&[JobStatus::Waiting, JobStatus::Active, JobStatus::Delayed])
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(repo.count_by_status(JobStatus::Failed).unwrap(), 1);
        assert_eq!(repo.count_by_status(JobStatus::Active).unwrap(), 0);
    }
}
