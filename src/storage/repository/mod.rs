// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the embedded database.
//!
//! Repositories borrow the [`Database`](crate::storage::Database) and expose
//! CRUD operations for one entity type each.

pub mod certificates;
pub mod email_jobs;
pub mod issuers;
pub mod users;

pub use certificates::{CertificateFilter, CertificateRepository};
pub use email_jobs::EmailJobRepository;
pub use issuers::IssuerRepository;
pub use users::UserRepository;
