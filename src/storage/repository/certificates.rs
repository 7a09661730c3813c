// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate repository.
//!
//! Certificates are keyed by their internal uuid. The public `certificate_id`
//! is indexed in `certificate_codes` and never changes after creation.

use redb::ReadableTable;
use uuid::Uuid;

use crate::models::{Certificate, Issuer};
use crate::storage::database::{
    get_json, list_json, to_json, Database, StorageError, StorageResult, CERTIFICATES,
    CERTIFICATE_CODES, ISSUERS,
};

/// Listing filter. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct CertificateFilter {
    /// Exact match on the normalised recipient email.
    pub recipient_email: Option<String>,
    pub issuer_id: Option<Uuid>,
    /// Case-insensitive substring match.
    pub issuer_name: Option<String>,
    pub revoked: Option<bool>,
}

impl CertificateFilter {
    fn matches(&self, cert: &Certificate) -> bool {
        if let Some(email) = &self.recipient_email {
            if !cert.recipient_email.eq_ignore_ascii_case(email) {
                return false;
            }
        }
        if let Some(issuer_id) = self.issuer_id {
            if cert.issuer_id != Some(issuer_id) {
                return false;
            }
        }
        if let Some(name) = &self.issuer_name {
            if !cert
                .issuer_name
                .to_lowercase()
                .contains(&name.to_lowercase())
            {
                return false;
            }
        }
        if let Some(revoked) = self.revoked {
            if cert.is_revoked != revoked {
                return false;
            }
        }
        true
    }
}

pub struct CertificateRepository<'a> {
    db: &'a Database,
}

impl<'a> CertificateRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn find_by_id(&self, id: Uuid) -> StorageResult<Option<Certificate>> {
        let key = id.to_string();
        self.db.read("certificates.find_by_id", |txn| {
            let table = txn.open_table(CERTIFICATES)?;
            get_json(&table, &key)
        })
    }

    pub fn get(&self, id: Uuid) -> StorageResult<Certificate> {
        self.find_by_id(id)?
            .ok_or_else(|| StorageError::NotFound("Certificate".to_string()))
    }

    /// Look up by the public certificate code.
    pub fn find_by_certificate_id(&self, code: &str) -> StorageResult<Option<Certificate>> {
        self.db.read("certificates.find_by_certificate_id", |txn| {
            let index = txn.open_table(CERTIFICATE_CODES)?;
            let Some(id) = index.get(code)?.map(|v| v.value().to_string()) else {
                return Ok(None);
            };
            let table = txn.open_table(CERTIFICATES)?;
            get_json(&table, &id)
        })
    }

    /// Insert a new certificate. A referenced issuer must exist and be active
    /// within the same transaction, so it cannot be deleted underneath us.
    pub fn create(&self, cert: &Certificate) -> StorageResult<()> {
        let key = cert.id.to_string();
        let json = to_json(cert)?;
        self.db.write("certificates.create", |txn| {
            if let Some(issuer_id) = cert.issuer_id {
                let issuers = txn.open_table(ISSUERS)?;
                let issuer: Issuer = get_json(&issuers, &issuer_id.to_string())?
                    .ok_or_else(|| StorageError::NotFound("Issuer".to_string()))?;
                if !issuer.is_active {
                    return Err(StorageError::InactiveIssuer);
                }
            }

            let mut index = txn.open_table(CERTIFICATE_CODES)?;
            if index.get(cert.certificate_id.as_str())?.is_some() {
                return Err(StorageError::AlreadyExists(
                    "Certificate with this ID".to_string(),
                ));
            }
            index.insert(cert.certificate_id.as_str(), key.as_str())?;

            let mut table = txn.open_table(CERTIFICATES)?;
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    /// Replace a stored certificate. The public code must not change.
    pub fn update(&self, cert: &Certificate) -> StorageResult<()> {
        let key = cert.id.to_string();
        let json = to_json(cert)?;
        self.db.write("certificates.update", |txn| {
            let mut table = txn.open_table(CERTIFICATES)?;
            let previous: Certificate = get_json(&table, &key)?
                .ok_or_else(|| StorageError::NotFound("Certificate".to_string()))?;
            debug_assert_eq!(previous.certificate_id, cert.certificate_id);
            table.insert(key.as_str(), json.as_slice())?;
            Ok(())
        })
    }

    pub fn remove(&self, id: Uuid) -> StorageResult<()> {
        let key = id.to_string();
        self.db.write("certificates.remove", |txn| {
            let mut table = txn.open_table(CERTIFICATES)?;
            let cert: Certificate = get_json(&table, &key)?
                .ok_or_else(|| StorageError::NotFound("Certificate".to_string()))?;
            table.remove(key.as_str())?;

            let mut index = txn.open_table(CERTIFICATE_CODES)?;
            index.remove(cert.certificate_id.as_str())?;
            Ok(())
        })
    }

    /// Matching certificates, most recently issued first.
    pub fn list(&self, filter: &CertificateFilter) -> StorageResult<Vec<Certificate>> {
        let all: Vec<Certificate> = self.db.read("certificates.list", |txn| {
            let table = txn.open_table(CERTIFICATES)?;
            list_json(&table)
        })?;
        let mut matching: Vec<Certificate> =
            all.into_iter().filter(|c| filter.matches(c)).collect();
        matching.sort_by(|a, b| {
            b.issued_at
                .cmp(&a.issued_at)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(matching)
    }

    pub fn count_by_issuer(&self, issuer_id: Uuid) -> StorageResult<usize> {
        let filter = CertificateFilter {
            issuer_id: Some(issuer_id),
            ..Default::default()
        };
        Ok(self.list(&filter)?.len())
    }
}
