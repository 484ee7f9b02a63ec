//! Maestro API provider.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::http::{HttpTransport, parse_submitted_hash};
use super::{
    AccountInfo, AddressInfo, Amount, ProtocolParameters, Provider, SignedTx, TxHash, TxInfo,
    TxUtxos, Utxo, de_quantity, sum_amounts,
};
use crate::config::{Network, ProviderConfig, ProviderKind};
use crate::error::{ProviderError, Result};

/// Default Maestro mainnet base URL.
pub const MAESTRO_MAINNET_URL: &str = "https://mainnet.gomaestro-api.org/v1";

/// Default Maestro pre-production base URL.
pub const MAESTRO_PREPROD_URL: &str = "https://preprod.gomaestro-api.org/v1";

/// Maximum UTXOs requested per page.
const PAGE_SIZE: usize = 100;

/// Maestro API client.
#[derive(Clone)]
pub struct MaestroProvider {
    http: HttpTransport,
    network: Network,
}

impl fmt::Debug for MaestroProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaestroProvider")
            .field("base_url", &self.http.base_url())
            .field("network", &self.network)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl MaestroProvider {
    /// Create a client with default HTTP and retry settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable API key.
    pub fn new(api_key: impl Into<String>, network: Network) -> Result<Self> {
        Self::from_config(&ProviderConfig::new(
            ProviderKind::Maestro,
            api_key,
            network,
        ))
    }

    /// Create a client from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable API key or HTTP setup.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let default_url = match config.network {
            Network::Mainnet => MAESTRO_MAINNET_URL,
            Network::Testnet => MAESTRO_PREPROD_URL,
        };
        Ok(Self {
            http: HttpTransport::new("maestro", config, default_url, "api-key", &config.api_key)?,
            network: config.network,
        })
    }

    async fn transaction(&self, hash: &str) -> Result<MaestroTx, ProviderError> {
        let tx: Envelope<MaestroTx> = self.http.get(&format!("/transactions/{hash}")).await?;
        Ok(tx.data)
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct MaestroAsset {
    unit: String,
    #[serde(deserialize_with = "de_quantity")]
    amount: String,
}

#[derive(Deserialize)]
struct MaestroUtxo {
    tx_hash: String,
    index: u32,
    address: String,
    #[serde(default)]
    assets: Vec<MaestroAsset>,
}

impl MaestroUtxo {
    fn into_utxo(self) -> Utxo {
        Utxo {
            tx_hash: self.tx_hash,
            output_index: self.index,
            address: self.address,
            amount: self
                .assets
                .into_iter()
                .map(|a| Amount::new(a.unit, a.amount))
                .collect(),
        }
    }
}

#[derive(Deserialize)]
struct MaestroAssetInfo {
    #[serde(default)]
    asset_standards: Option<AssetStandards>,
}

#[derive(Deserialize)]
struct AssetStandards {
    cip25_metadata: Option<Value>,
    cip68_metadata: Option<Value>,
}

#[derive(Deserialize)]
struct MaestroAccount {
    stake_address: String,
    registered: bool,
    delegated_pool: Option<String>,
    #[serde(deserialize_with = "de_quantity")]
    total_balance: String,
    #[serde(deserialize_with = "de_quantity")]
    rewards_available: String,
}

#[derive(Deserialize)]
struct MaestroTx {
    tx_hash: String,
    block_height: Option<u64>,
    block_timestamp: Option<i64>,
    block_absolute_slot: Option<u64>,
    #[serde(deserialize_with = "de_quantity")]
    fee: String,
    #[serde(deserialize_with = "de_quantity")]
    deposit: String,
    size: u64,
    #[serde(default)]
    inputs: Vec<MaestroUtxo>,
    #[serde(default)]
    outputs: Vec<MaestroUtxo>,
}

#[derive(Deserialize)]
struct Lovelace {
    ada: LovelaceInner,
}

#[derive(Deserialize)]
struct LovelaceInner {
    lovelace: u64,
}

#[derive(Deserialize)]
struct Bytes {
    bytes: u64,
}

#[derive(Deserialize)]
struct MaestroParams {
    min_fee_coefficient: u64,
    min_fee_constant: Lovelace,
    max_transaction_size: Bytes,
    stake_credential_deposit: Lovelace,
    stake_pool_deposit: Lovelace,
    min_utxo_deposit_coefficient: u64,
}

#[async_trait]
impl Provider for MaestroProvider {
    fn name(&self) -> &'static str {
        "maestro"
    }

    fn network(&self) -> Network {
        self.network
    }

    /// Maestro has no address endpoint; an address counts as seen once it
    /// holds UTXOs.
    async fn fetch_address_info(
        &self,
        address: &str,
    ) -> Result<Option<AddressInfo>, ProviderError> {
        let utxos = self.fetch_address_utxos(address).await?;
        if utxos.is_empty() {
            return Ok(None);
        }
        let amounts = sum_amounts(utxos.iter().flat_map(|u| &u.amount))?;
        Ok(Some(AddressInfo {
            address: address.to_owned(),
            amounts,
            stake_address: None,
        }))
    }

    async fn fetch_address_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
        let mut utxos = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut path = format!("/addresses/{address}/utxos?count={PAGE_SIZE}");
            if let Some(c) = &cursor {
                path.push_str("&cursor=");
                path.push_str(c);
            }
            let Some(page) = self
                .http
                .get_optional::<Envelope<Vec<MaestroUtxo>>>(&path)
                .await?
            else {
                break;
            };
            utxos.extend(page.data.into_iter().map(MaestroUtxo::into_utxo));
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(utxos)
    }

    async fn fetch_asset_metadata(&self, unit: &str) -> Result<Option<Value>, ProviderError> {
        let info: Option<Envelope<MaestroAssetInfo>> =
            self.http.get_optional(&format!("/assets/{unit}")).await?;
        Ok(info
            .and_then(|i| i.data.asset_standards)
            .and_then(|s| s.cip25_metadata.or(s.cip68_metadata)))
    }

    async fn fetch_account_info(&self, reward_address: &str) -> Result<AccountInfo, ProviderError> {
        let account: Option<Envelope<MaestroAccount>> = self
            .http
            .get_optional(&format!("/accounts/{reward_address}"))
            .await?;
        Ok(match account {
            Some(Envelope { data: a, .. }) => AccountInfo {
                stake_address: a.stake_address,
                active: a.registered,
                pool_id: a.delegated_pool,
                controlled_amount: a.total_balance,
                withdrawable_amount: a.rewards_available,
            },
            None => AccountInfo::unregistered(reward_address),
        })
    }

    async fn fetch_tx_info(&self, hash: &str) -> Result<TxInfo, ProviderError> {
        let tx = self.transaction(hash).await?;
        let produced: Vec<Amount> = tx
            .outputs
            .iter()
            .flat_map(|o| &o.assets)
            .map(|a| Amount::new(a.unit.clone(), a.amount.clone()))
            .collect();
        Ok(TxInfo {
            output_amount: sum_amounts(&produced)?,
            hash: tx.tx_hash,
            block_height: tx.block_height,
            block_time: tx.block_timestamp,
            slot: tx.block_absolute_slot,
            fees: tx.fee,
            deposit: tx.deposit,
            size: tx.size,
        })
    }

    async fn fetch_utxos(&self, hash: &str) -> Result<TxUtxos, ProviderError> {
        let tx = self.transaction(hash).await?;
        Ok(TxUtxos {
            hash: tx.tx_hash,
            inputs: tx.inputs.into_iter().map(MaestroUtxo::into_utxo).collect(),
            outputs: tx.outputs.into_iter().map(MaestroUtxo::into_utxo).collect(),
        })
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError> {
        let params: Envelope<MaestroParams> = self.http.get("/protocol-parameters").await?;
        let p = params.data;
        Ok(ProtocolParameters {
            min_fee_a: p.min_fee_coefficient,
            min_fee_b: p.min_fee_constant.ada.lovelace,
            max_tx_size: p.max_transaction_size.bytes,
            key_deposit: p.stake_credential_deposit.ada.lovelace.to_string(),
            pool_deposit: p.stake_pool_deposit.ada.lovelace.to_string(),
            coins_per_utxo_size: p.min_utxo_deposit_coefficient.to_string(),
        })
    }

    async fn submit_tx(&self, tx: &SignedTx) -> Result<TxHash, ProviderError> {
        let body = self.http.post_cbor("/txmanager", tx.as_bytes()).await?;
        parse_submitted_hash(&body).map(TxHash)
    }
}
