//! Blockfrost API provider.
//!
//! Blockfrost is the only backend here that can list the transactions of an
//! address, so it is the one to pick when transaction history is needed.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::http::{HttpTransport, parse_submitted_hash};
use super::{
    AccountInfo, AddressInfo, Amount, ProtocolParameters, Provider, SignedTx, TxHash, TxInfo,
    TxRef, TxUtxos, Utxo,
};
use crate::config::{Network, ProviderConfig, ProviderKind};
use crate::error::{ProviderError, Result};

/// Default Blockfrost mainnet base URL.
pub const BLOCKFROST_MAINNET_URL: &str = "https://cardano-mainnet.blockfrost.io/api/v0";

/// Default Blockfrost pre-production base URL.
pub const BLOCKFROST_PREPROD_URL: &str = "https://cardano-preprod.blockfrost.io/api/v0";

/// Blockfrost pages are capped at 100 items.
const PAGE_SIZE: usize = 100;

/// Pages of address history fetched, newest first.
const MAX_HISTORY_PAGES: usize = 5;

/// Blockfrost API client.
///
/// # Example
///
/// ```rust,ignore
/// use cardano_agent::chain::BlockfrostProvider;
/// use cardano_agent::config::Network;
///
/// let provider = BlockfrostProvider::new("preprodXYZ", Network::Testnet)?;
/// ```
#[derive(Clone)]
pub struct BlockfrostProvider {
    http: HttpTransport,
    network: Network,
}

impl fmt::Debug for BlockfrostProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockfrostProvider")
            .field("base_url", &self.http.base_url())
            .field("network", &self.network)
            .field("project_id", &"[REDACTED]")
            .finish()
    }
}

impl BlockfrostProvider {
    /// Create a client with default HTTP and retry settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable project id.
    pub fn new(project_id: impl Into<String>, network: Network) -> Result<Self> {
        Self::from_config(&ProviderConfig::new(
            ProviderKind::Blockfrost,
            project_id,
            network,
        ))
    }

    /// Create a client from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable project id or HTTP setup.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let default_url = match config.network {
            Network::Mainnet => BLOCKFROST_MAINNET_URL,
            Network::Testnet => BLOCKFROST_PREPROD_URL,
        };
        Ok(Self {
            http: HttpTransport::new(
                "blockfrost",
                config,
                default_url,
                "project_id",
                &config.api_key,
            )?,
            network: config.network,
        })
    }

    /// Fetch every page of a paginated list endpoint.
    async fn get_all_pages<T: serde::de::DeserializeOwned + Send>(
        &self,
        path: &str,
    ) -> Result<Vec<T>, ProviderError> {
        self.get_pages(path, usize::MAX).await
    }

    /// Fetch pages until a short page or `max_pages` pages.
    async fn get_pages<T: serde::de::DeserializeOwned + Send>(
        &self,
        path: &str,
        max_pages: usize,
    ) -> Result<Vec<T>, ProviderError> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1;
        while page <= max_pages {
            let url = format!("{path}{sep}count={PAGE_SIZE}&page={page}");
            let batch: Vec<T> = match self.http.get_optional(&url).await? {
                Some(batch) => batch,
                None => break,
            };
            let len = batch.len();
            items.extend(batch);
            if len < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(items)
    }
}

#[derive(Deserialize)]
struct BfAddress {
    address: String,
    amount: Vec<Amount>,
    stake_address: Option<String>,
}

#[derive(Deserialize)]
struct BfAsset {
    onchain_metadata: Option<Value>,
    metadata: Option<Value>,
}

#[derive(Deserialize)]
struct BfTxUtxos {
    hash: String,
    inputs: Vec<BfTxIo>,
    outputs: Vec<BfTxIo>,
}

#[derive(Deserialize)]
struct BfTxIo {
    address: String,
    amount: Vec<Amount>,
    tx_hash: Option<String>,
    output_index: u32,
}

impl BfTxIo {
    fn into_utxo(self, produced_by: &str) -> Utxo {
        Utxo {
            tx_hash: self.tx_hash.unwrap_or_else(|| produced_by.to_owned()),
            output_index: self.output_index,
            address: self.address,
            amount: self.amount,
        }
    }
}

#[async_trait]
impl Provider for BlockfrostProvider {
    fn name(&self) -> &'static str {
        "blockfrost"
    }

    fn network(&self) -> Network {
        self.network
    }

    fn supports_address_transactions(&self) -> bool {
        true
    }

    async fn fetch_address_info(
        &self,
        address: &str,
    ) -> Result<Option<AddressInfo>, ProviderError> {
        let raw: Option<BfAddress> = self
            .http
            .get_optional(&format!("/addresses/{address}"))
            .await?;
        Ok(raw.map(|a| AddressInfo {
            address: a.address,
            amounts: a.amount,
            stake_address: a.stake_address,
        }))
    }

    async fn fetch_address_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
        self.get_all_pages(&format!("/addresses/{address}/utxos"))
            .await
    }

    async fn fetch_asset_metadata(&self, unit: &str) -> Result<Option<Value>, ProviderError> {
        let asset: BfAsset = self.http.get(&format!("/assets/{unit}")).await?;
        Ok(asset.onchain_metadata.or(asset.metadata))
    }

    async fn fetch_account_info(&self, reward_address: &str) -> Result<AccountInfo, ProviderError> {
        // Blockfrost answers 404 for stake addresses it has never seen.
        let account: Option<AccountInfo> = self
            .http
            .get_optional(&format!("/accounts/{reward_address}"))
            .await?;
        Ok(account.unwrap_or_else(|| AccountInfo::unregistered(reward_address)))
    }

    async fn fetch_address_transactions(&self, address: &str) -> Result<Vec<TxRef>, ProviderError> {
        self.get_pages(
            &format!("/addresses/{address}/transactions?order=desc"),
            MAX_HISTORY_PAGES,
        )
        .await
    }

    async fn fetch_tx_info(&self, hash: &str) -> Result<TxInfo, ProviderError> {
        self.http.get(&format!("/txs/{hash}")).await
    }

    async fn fetch_utxos(&self, hash: &str) -> Result<TxUtxos, ProviderError> {
        let raw: BfTxUtxos = self.http.get(&format!("/txs/{hash}/utxos")).await?;
        let hash = raw.hash;
        Ok(TxUtxos {
            inputs: raw
                .inputs
                .into_iter()
                .map(|io| io.into_utxo(&hash))
                .collect(),
            outputs: raw
                .outputs
                .into_iter()
                .map(|io| io.into_utxo(&hash))
                .collect(),
            hash,
        })
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError> {
        self.http.get("/epochs/latest/parameters").await
    }

    async fn submit_tx(&self, tx: &SignedTx) -> Result<TxHash, ProviderError> {
        let body = self.http.post_cbor("/tx/submit", tx.as_bytes()).await?;
        parse_submitted_hash(&body).map(TxHash)
    }
}
