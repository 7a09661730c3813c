// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Stellar Integration
//!
//! Certificates are anchored by recording the hash of a Stellar transaction.
//! This module checks those anchors against Horizon and validates StrKey
//! account ids. No transactions are built or submitted here.

pub mod client;
pub mod keys;
pub mod types;

pub use client::{HorizonClient, StellarError};
pub use types::{NetworkInfo, NetworkStatus, StellarNetwork};
