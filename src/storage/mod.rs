// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in a single redb file under `DATA_DIR`. Records are
//! stored as JSON; secondary tables index the unique fields (user email,
//! issuer public key, certificate code) and are updated in the same write
//! transaction as the record they point to.
//!
//! ```text
//! $DATA_DIR/
//!   stellarwave.redb
//! ```

pub mod database;
pub mod repository;

pub use database::{Database, StorageError, StorageResult};
pub use repository::{
    CertificateFilter, CertificateRepository, EmailJobRepository, IssuerRepository,
    UserRepository,
};
