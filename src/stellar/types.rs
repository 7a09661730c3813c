// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stellar network definitions and Horizon response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";
pub const PUBLIC_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

pub const TESTNET_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";
pub const PUBLIC_HORIZON_URL: &str = "https://horizon.stellar.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StellarNetwork {
    Testnet,
    Public,
}

impl StellarNetwork {
    /// Parse `testnet`, `public` or `mainnet` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "testnet" | "test" => Some(StellarNetwork::Testnet),
            "public" | "mainnet" | "pubnet" => Some(StellarNetwork::Public),
            _ => None,
        }
    }

    pub fn passphrase(&self) -> &'static str {
        match self {
            StellarNetwork::Testnet => TESTNET_PASSPHRASE,
            StellarNetwork::Public => PUBLIC_PASSPHRASE,
        }
    }

    pub fn default_horizon_url(&self) -> &'static str {
        match self {
            StellarNetwork::Testnet => TESTNET_HORIZON_URL,
            StellarNetwork::Public => PUBLIC_HORIZON_URL,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StellarNetwork::Testnet => "testnet",
            StellarNetwork::Public => "public",
        }
    }
}

/// Static description of the network this server talks to.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub network: StellarNetwork,
    pub horizon_url: String,
    pub network_passphrase: String,
}

/// Result of probing the Horizon root endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub network: StellarNetwork,
    pub horizon_url: String,
    pub network_passphrase: String,
    pub latest_ledger: Option<u64>,
    pub horizon_version: Option<String>,
    pub core_version: Option<String>,
    /// Whether Horizon reports the passphrase we expect.
    pub passphrase_matches: bool,
}

// =============================================================================
// Horizon wire types (only the fields we read)
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct HorizonRoot {
    #[serde(default)]
    pub horizon_version: Option<String>,
    #[serde(default)]
    pub core_version: Option<String>,
    #[serde(default)]
    pub history_latest_ledger: Option<u64>,
    pub network_passphrase: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HorizonTransaction {
    pub hash: String,
    #[serde(default = "default_successful")]
    pub successful: bool,
}

fn default_successful() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct HorizonAccount {
    pub account_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(StellarNetwork::parse("TESTNET"), Some(StellarNetwork::Testnet));
        assert_eq!(StellarNetwork::parse("mainnet"), Some(StellarNetwork::Public));
        assert_eq!(StellarNetwork::parse("futurenet"), None);
    }

    #[test]
    fn passphrases_match_network() {
        assert_eq!(
            StellarNetwork::Testnet.passphrase(),
            "Test SDF Network ; September 2015"
        );
        assert_eq!(
            StellarNetwork::Public.default_horizon_url(),
            "https://horizon.stellar.org"
        );
    }
}
