// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Horizon HTTP client used to verify transactions and accounts.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::keys;
use super::types::{
    HorizonAccount, HorizonRoot, HorizonTransaction, NetworkInfo, NetworkStatus, StellarNetwork,
};
use crate::error::{ApiError, ErrorCode};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum StellarError {
    #[error("invalid Stellar address: {0}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTransactionHash(String),

    #[error("Horizon request failed: {0}")]
    Connection(String),

    #[error("Horizon returned {status}: {body}")]
    Horizon { status: u16, body: String },

    #[error("Horizon response was invalid: {0}")]
    InvalidResponse(String),
}

impl From<StellarError> for ApiError {
    fn from(err: StellarError) -> Self {
        match &err {
            StellarError::InvalidAddress(_) => {
                ApiError::with_message(ErrorCode::InvalidStellarAddress, err.to_string())
            }
            StellarError::InvalidTransactionHash(_) => {
                ApiError::with_message(ErrorCode::InvalidTransaction, err.to_string())
            }
            StellarError::Connection(_) => {
                warn!(error = %err, "Horizon unreachable");
                ApiError::new(ErrorCode::BlockchainConnectionError)
            }
            StellarError::Horizon { .. } | StellarError::InvalidResponse(_) => {
                warn!(error = %err, "Horizon error");
                ApiError::new(ErrorCode::StellarError)
            }
        }
    }
}

/// Thin client over the Horizon REST API.
#[derive(Debug, Clone)]
pub struct HorizonClient {
    network: StellarNetwork,
    horizon_url: String,
    http: Client,
}

impl HorizonClient {
    pub fn new(network: StellarNetwork, horizon_url: impl Into<String>) -> Result<Self, StellarError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StellarError::Connection(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            network,
            horizon_url: horizon_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn network(&self) -> StellarNetwork {
        self.network
    }

    pub fn network_info(&self) -> NetworkInfo {
        NetworkInfo {
            network: self.network,
            horizon_url: self.horizon_url.clone(),
            network_passphrase: self.network.passphrase().to_string(),
        }
    }

    /// `true` if Horizon knows the transaction and it succeeded.
    pub async fn verify_transaction(&self, tx_hash: &str) -> Result<bool, StellarError> {
        if !keys::is_valid_tx_hash(tx_hash) {
            return Err(StellarError::InvalidTransactionHash(tx_hash.to_string()));
        }
        let tx: Option<HorizonTransaction> =
            self.get_optional(&format!("/transactions/{tx_hash}")).await?;

        Ok(match tx {
            Some(tx) => {
                debug!(tx_hash = %tx.hash, successful = tx.successful, "transaction found on Horizon");
                tx.successful
            }
            None => false,
        })
    }

    /// `true` if the account exists on the network.
    pub async fn verify_account(&self, account_id: &str) -> Result<bool, StellarError> {
        if !keys::is_valid_public_key(account_id) {
            return Err(StellarError::InvalidAddress(account_id.to_string()));
        }
        let account: Option<HorizonAccount> =
            self.get_optional(&format!("/accounts/{account_id}")).await?;

        Ok(account.is_some_and(|a| a.account_id == account_id))
    }

    /// Probe the Horizon root endpoint.
    pub async fn check_network_health(&self) -> Result<NetworkStatus, StellarError> {
        let root: HorizonRoot = self
            .get_optional("/")
            .await?
            .ok_or_else(|| StellarError::InvalidResponse("Horizon root returned 404".into()))?;

        let passphrase_matches = root.network_passphrase == self.network.passphrase();
        if !passphrase_matches {
            warn!(
                expected = self.network.passphrase(),
                actual = %root.network_passphrase,
                "Horizon network passphrase mismatch"
            );
        }

        Ok(NetworkStatus {
            network: self.network,
            horizon_url: self.horizon_url.clone(),
            network_passphrase: root.network_passphrase,
            latest_ledger: root.history_latest_ledger,
            horizon_version: root.horizon_version,
            core_version: root.core_version,
            passphrase_matches,
        })
    }

    /// GET a JSON resource, mapping 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StellarError> {
        let response = self
            .http
            .get(format!("{}{}", self.horizon_url, path))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| StellarError::Connection(format!("GET {path} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StellarError::Horizon {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| StellarError::InvalidResponse(format!("GET {path} invalid JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ACCOUNT: &str = "GAB2CB576PHBBPQ5ODORRZ2LYCMWPZGWGCN2KDK7DXOIMZASKUY3QZ6Q";

    fn tx_hash() -> String {
        "3389e9f0f1a65f19736cacf544c2e825313e8447f569233bb8db39aa607c8889".to_string()
    }

    async fn client_for(server: &MockServer) -> HorizonClient {
        HorizonClient::new(StellarNetwork::Testnet, server.uri()).unwrap()
    }

    #[tokio::test]
    async fn verify_transaction_true_when_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/transactions/{}", tx_hash())))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({
                    "hash": tx_hash(),
                    "successful": true,
                    "ledger": 123
                })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.verify_transaction(&tx_hash()).await.unwrap());
    }

    #[tokio::test]
    async fn verify_transaction_false_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/transactions/{}", tx_hash())))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(!client.verify_transaction(&tx_hash()).await.unwrap());
    }

    #[tokio::test]
    async fn verify_transaction_rejects_malformed_hash() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;
        let result = client.verify_transaction("not-a-hash").await;
        assert!(matches!(result, Err(StellarError::InvalidTransactionHash(_))));
    }

    #[tokio::test]
    async fn verify_account_maps_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}")))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.verify_account(ACCOUNT).await.unwrap_err();
        assert!(matches!(err, StellarError::Horizon { status: 500, .. }));
        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::StellarError);
        assert_eq!(api.status.as_u16(), 502);
    }

    #[tokio::test]
    async fn verify_account_true_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "account_id": ACCOUNT })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(client.verify_account(ACCOUNT).await.unwrap());
    }

    #[tokio::test]
    async fn network_health_reports_passphrase_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "horizon_version": "2.30.0",
                "core_version": "stellar-core 21.0.0",
                "history_latest_ledger": 4242,
                "network_passphrase": "Test SDF Network ; September 2015"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let status = client.check_network_health().await.unwrap();
        assert!(status.passphrase_matches);
        assert_eq!(status.latest_ledger, Some(4242));
    }

    #[tokio::test]
    async fn unreachable_horizon_is_connection_error() {
        // Nothing listens on port 9 locally.
        let client = HorizonClient::new(StellarNetwork::Testnet, "http://127.0.0.1:9").unwrap();
        let err = client.check_network_health().await.unwrap_err();
        assert!(matches!(err, StellarError::Connection(_)));
        let api: ApiError = err.into();
        assert_eq!(api.code, ErrorCode::BlockchainConnectionError);
    }
}
