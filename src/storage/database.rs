// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user id → JSON `User`
//! - `user_emails`: normalised email → user id
//! - `issuers`: issuer id → JSON `Issuer`
//! - `issuer_keys`: Stellar public key → issuer id
//! - `certificates`: certificate uuid → JSON `Certificate`
//! - `certificate_codes`: public certificate id → certificate uuid
//! - `email_jobs`: job id → JSON `EmailJob`

use std::path::Path;
use std::time::Instant;

use redb::{
    backends::InMemoryBackend, Database as RedbDatabase, ReadTransaction, ReadableDatabase,
    ReadableTable, TableDefinition, WriteTransaction,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ApiError, ErrorCode};
use crate::monitoring::AppMetrics;

// =============================================================================
// Table Definitions
// =============================================================================

pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
pub(crate) const USER_EMAILS: TableDefinition<&str, &str> = TableDefinition::new("user_emails");
pub(crate) const ISSUERS: TableDefinition<&str, &[u8]> = TableDefinition::new("issuers");
pub(crate) const ISSUER_KEYS: TableDefinition<&str, &str> = TableDefinition::new("issuer_keys");
pub(crate) const CERTIFICATES: TableDefinition<&str, &[u8]> = TableDefinition::new("certificates");
pub(crate) const CERTIFICATE_CODES: TableDefinition<&str, &str> =
    TableDefinition::new("certificate_codes");
pub(crate) const EMAIL_JOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("email_jobs");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0} is in use")]
    InUse(String),

    #[error("issuer is not active")]
    InactiveIssuer,
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            StorageError::AlreadyExists(what) => {
                ApiError::conflict(format!("{what} already exists"))
            }
            StorageError::InUse(what) => {
                ApiError::with_message(ErrorCode::ResourceInUse, format!("{what} is in use"))
            }
            StorageError::InactiveIssuer => {
                ApiError::with_message(ErrorCode::InvalidCertificateData, "Issuer is not active")
            }
            other => {
                tracing::error!(error = %other, "database operation failed");
                ApiError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

// =============================================================================
// JSON helpers
// =============================================================================

pub(crate) fn get_json<T, Tbl>(table: &Tbl, key: &str) -> StorageResult<Option<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    match table.get(key)? {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

pub(crate) fn list_json<T, Tbl>(table: &Tbl) -> StorageResult<Vec<T>>
where
    T: DeserializeOwned,
    Tbl: ReadableTable<&'static str, &'static [u8]>,
{
    let mut items = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        items.push(serde_json::from_slice(value.value())?);
    }
    Ok(items)
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle to the embedded database.
pub struct Database {
    db: RedbDatabase,
    metrics: Option<AppMetrics>,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = RedbDatabase::create(path)?;
        Self::init(db)
    }

    /// Non-persistent database, used by tests.
    pub fn in_memory() -> StorageResult<Self> {
        let db = RedbDatabase::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: RedbDatabase) -> StorageResult<Self> {
        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAILS)?;
            let _ = write_txn.open_table(ISSUERS)?;
            let _ = write_txn.open_table(ISSUER_KEYS)?;
            let _ = write_txn.open_table(CERTIFICATES)?;
            let _ = write_txn.open_table(CERTIFICATE_CODES)?;
            let _ = write_txn.open_table(EMAIL_JOBS)?;
        }
        write_txn.commit()?;

        Ok(Self { db, metrics: None })
    }

    /// Record every operation in `db_query_duration_seconds`.
    pub fn with_metrics(mut self, metrics: AppMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cheap liveness check used by the health endpoints.
    pub fn ping(&self) -> StorageResult<()> {
        self.read("ping", |txn| {
            let _ = txn.open_table(USERS)?;
            Ok(())
        })
    }

    /// Run `f` in a read transaction, timed under `query_type`.
    pub(crate) fn read<T>(
        &self,
        query_type: &str,
        f: impl FnOnce(&ReadTransaction) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let start = Instant::now();
        let result = self.db.begin_read().map_err(StorageError::from).and_then(|txn| f(&txn));
        self.observe(query_type, start);
        result
    }

    /// Run `f` in a write transaction. Commits only when `f` succeeds.
    pub(crate) fn write<T>(
        &self,
        query_type: &str,
        f: impl FnOnce(&WriteTransaction) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let start = Instant::now();
        let result = (|| -> StorageResult<T> {
            let txn = self.db.begin_write()?;
            let value = f(&txn)?;
            txn.commit()?;
            Ok(value)
        })();
        self.observe(query_type, start);
        result
    }

    fn observe(&self, query_type: &str, start: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_db_query(query_type, start.elapsed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.redb");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        db.ping().unwrap();
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let db = Database::in_memory().unwrap();
        let result: StorageResult<()> = db.write("test", |txn| {
            let mut table = txn.open_table(USER_EMAILS)?;
            table.insert("a@example.com", "id-1")?;
            Err(StorageError::AlreadyExists("User".to_string()))
        });
        assert!(result.is_err());

        let found = db
            .read("test", |txn| {
                let table = txn.open_table(USER_EMAILS)?;
                Ok(table.get("a@example.com")?.is_some())
            })
            .unwrap();
        assert!(!found);
    }

    #[test]
    fn operations_are_timed_when_metrics_attached() {
        let metrics = AppMetrics::new().unwrap();
        let db = Database::in_memory().unwrap().with_metrics(metrics.clone());
        db.ping().unwrap();
        assert_eq!(
            metrics
                .db_query_duration_seconds
                .with_label_values(&["ping"])
                .get_sample_count(),
            1
        );
    }

    #[test]
    fn storage_errors_map_to_api_codes() {
        let api: ApiError = StorageError::NotFound("User".to_string()).into();
        assert_eq!(api.code, ErrorCode::NotFound);
        assert_eq!(api.message, "User not found");

        let api: ApiError = StorageError::AlreadyExists("Issuer".to_string()).into();
        assert_eq!(api.status.as_u16(), 409);

        let api: ApiError = StorageError::InUse("Issuer".to_string()).into();
        assert_eq!(api.code, ErrorCode::ResourceInUse);
    }
}
