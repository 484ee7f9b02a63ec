//! Koios API provider.
//!
//! Koios is queried through its bulk POST endpoints. Quantities come back as
//! strings and native assets are split into policy id and hex asset name.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::http::{HttpTransport, parse_submitted_hash};
use super::{
    AccountInfo, AddressInfo, Amount, ProtocolParameters, Provider, SignedTx, TxHash, TxInfo,
    TxUtxos, Utxo, sum_amounts,
};
use crate::config::{Network, ProviderConfig, ProviderKind};
use crate::error::{ProviderError, Result};
use crate::wallet::POLICY_ID_LENGTH;

/// Default Koios mainnet base URL.
pub const KOIOS_MAINNET_URL: &str = "https://api.koios.rest/api/v1";

/// Default Koios pre-production base URL.
pub const KOIOS_PREPROD_URL: &str = "https://preprod.koios.rest/api/v1";

/// Koios API client.
#[derive(Clone)]
pub struct KoiosProvider {
    http: HttpTransport,
    network: Network,
}

impl fmt::Debug for KoiosProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KoiosProvider")
            .field("base_url", &self.http.base_url())
            .field("network", &self.network)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl KoiosProvider {
    /// Create a client with default HTTP and retry settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable API key.
    pub fn new(api_key: impl Into<String>, network: Network) -> Result<Self> {
        Self::from_config(&ProviderConfig::new(ProviderKind::Koios, api_key, network))
    }

    /// Create a client from provider configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable API key or HTTP setup.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let default_url = match config.network {
            Network::Mainnet => KOIOS_MAINNET_URL,
            Network::Testnet => KOIOS_PREPROD_URL,
        };
        let bearer = format!("Bearer {}", config.api_key);
        Ok(Self {
            http: HttpTransport::new("koios", config, default_url, "authorization", &bearer)?,
            network: config.network,
        })
    }

    async fn tx_info(&self, hash: &str) -> Result<KoiosTx, ProviderError> {
        let body = json!({ "_tx_hashes": [hash], "_inputs": true });
        let txs: Vec<KoiosTx> = self.http.post("/tx_info", &body).await?;
        txs.into_iter().next().ok_or_else(|| {
            ProviderError::not_found(format!("transaction {hash} not found")).with_provider("koios")
        })
    }
}

#[derive(Deserialize)]
struct KoiosAsset {
    policy_id: String,
    #[serde(default)]
    asset_name: Option<String>,
    quantity: String,
}

impl KoiosAsset {
    fn to_amount(&self) -> Amount {
        Amount::new(
            format!(
                "{}{}",
                self.policy_id,
                self.asset_name.as_deref().unwrap_or("")
            ),
            self.quantity.clone(),
        )
    }
}

fn amounts_of(value: &str, assets: &[KoiosAsset]) -> Vec<Amount> {
    std::iter::once(Amount::lovelace(value))
        .chain(assets.iter().map(KoiosAsset::to_amount))
        .collect()
}

#[derive(Deserialize)]
struct KoiosAddressInfo {
    address: String,
    balance: String,
    stake_address: Option<String>,
    #[serde(default)]
    utxo_set: Vec<KoiosUtxo>,
}

#[derive(Deserialize)]
struct KoiosUtxo {
    tx_hash: String,
    tx_index: u32,
    #[serde(default)]
    address: Option<String>,
    value: String,
    #[serde(default)]
    asset_list: Option<Vec<KoiosAsset>>,
}

impl KoiosUtxo {
    fn into_utxo(self, fallback_address: &str) -> Utxo {
        let amount = amounts_of(&self.value, self.asset_list.as_deref().unwrap_or_default());
        Utxo {
            tx_hash: self.tx_hash,
            output_index: self.tx_index,
            address: self.address.unwrap_or_else(|| fallback_address.to_owned()),
            amount,
        }
    }
}

#[derive(Deserialize)]
struct KoiosAssetInfo {
    policy_id: String,
    #[serde(default)]
    asset_name_ascii: Option<String>,
    #[serde(default)]
    minting_tx_metadata: Option<Value>,
    #[serde(default)]
    token_registry_metadata: Option<Value>,
}

impl KoiosAssetInfo {
    /// Pick the CIP-25 entry for this asset out of the minting metadata.
    fn metadata(self) -> Option<Value> {
        let entry = self.minting_tx_metadata.as_ref().and_then(|meta| {
            let name = self.asset_name_ascii.as_deref()?;
            meta.get("721")?.get(&self.policy_id)?.get(name).cloned()
        });
        entry
            .or(self.minting_tx_metadata)
            .or(self.token_registry_metadata)
    }
}

#[derive(Deserialize)]
struct KoiosAccount {
    stake_address: String,
    status: String,
    delegated_pool: Option<String>,
    total_balance: String,
    rewards_available: String,
}

#[derive(Deserialize)]
struct KoiosPaymentAddr {
    bech32: String,
}

#[derive(Deserialize)]
struct KoiosTxIo {
    payment_addr: KoiosPaymentAddr,
    tx_hash: String,
    tx_index: u32,
    value: String,
    #[serde(default)]
    asset_list: Vec<KoiosAsset>,
}

impl KoiosTxIo {
    fn into_utxo(self) -> Utxo {
        let amount = amounts_of(&self.value, &self.asset_list);
        Utxo {
            tx_hash: self.tx_hash,
            output_index: self.tx_index,
            address: self.payment_addr.bech32,
            amount,
        }
    }
}

#[derive(Deserialize)]
struct KoiosTx {
    tx_hash: String,
    block_height: Option<u64>,
    tx_timestamp: Option<i64>,
    absolute_slot: Option<u64>,
    fee: String,
    deposit: String,
    tx_size: u64,
    #[serde(default)]
    inputs: Vec<KoiosTxIo>,
    #[serde(default)]
    outputs: Vec<KoiosTxIo>,
}

#[async_trait]
impl Provider for KoiosProvider {
    fn name(&self) -> &'static str {
        "koios"
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn fetch_address_info(
        &self,
        address: &str,
    ) -> Result<Option<AddressInfo>, ProviderError> {
        let body = json!({ "_addresses": [address] });
        let infos: Vec<KoiosAddressInfo> = self.http.post("/address_info", &body).await?;
        let Some(info) = infos.into_iter().next() else {
            return Ok(None);
        };

        let held: Vec<Amount> = info
            .utxo_set
            .iter()
            .flat_map(|u| u.asset_list.iter().flatten().map(KoiosAsset::to_amount))
            .collect();
        let amounts = std::iter::once(Amount::lovelace(info.balance.clone()))
            .chain(sum_amounts(&held)?)
            .collect();

        Ok(Some(AddressInfo {
            address: info.address,
            amounts,
            stake_address: info.stake_address,
        }))
    }

    async fn fetch_address_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
        let body = json!({ "_addresses": [address], "_extended": true });
        let utxos: Vec<KoiosUtxo> = self.http.post("/address_utxos", &body).await?;
        Ok(utxos.into_iter().map(|u| u.into_utxo(address)).collect())
    }

    async fn fetch_asset_metadata(&self, unit: &str) -> Result<Option<Value>, ProviderError> {
        let (policy, name) = unit
            .split_at_checked(POLICY_ID_LENGTH)
            .unwrap_or((unit, ""));
        let body = json!({ "_asset_list": [[policy, name]] });
        let infos: Vec<KoiosAssetInfo> = self.http.post("/asset_info", &body).await?;
        Ok(infos.into_iter().next().and_then(KoiosAssetInfo::metadata))
    }

    async fn fetch_account_info(&self, reward_address: &str) -> Result<AccountInfo, ProviderError> {
        let body = json!({ "_stake_addresses": [reward_address] });
        let accounts: Vec<KoiosAccount> = self.http.post("/account_info", &body).await?;
        Ok(match accounts.into_iter().next() {
            Some(a) => AccountInfo {
                active: a.status == "registered",
                stake_address: a.stake_address,
                pool_id: a.delegated_pool,
                controlled_amount: a.total_balance,
                withdrawable_amount: a.rewards_available,
            },
            None => AccountInfo::unregistered(reward_address),
        })
    }

    async fn fetch_tx_info(&self, hash: &str) -> Result<TxInfo, ProviderError> {
        let tx = self.tx_info(hash).await?;
        let produced: Vec<Amount> = tx
            .outputs
            .iter()
            .flat_map(|o| amounts_of(&o.value, &o.asset_list))
            .collect();
        Ok(TxInfo {
            output_amount: sum_amounts(&produced)?,
            hash: tx.tx_hash,
            block_height: tx.block_height,
            block_time: tx.tx_timestamp,
            slot: tx.absolute_slot,
            fees: tx.fee,
            deposit: tx.deposit,
            size: tx.tx_size,
        })
    }

    async fn fetch_utxos(&self, hash: &str) -> Result<TxUtxos, ProviderError> {
        let tx = self.tx_info(hash).await?;
        Ok(TxUtxos {
            hash: tx.tx_hash,
            inputs: tx.inputs.into_iter().map(KoiosTxIo::into_utxo).collect(),
            outputs: tx.outputs.into_iter().map(KoiosTxIo::into_utxo).collect(),
        })
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError> {
        let params: Vec<ProtocolParameters> = self
            .http
            .get("/epoch_params?order=epoch_no.desc&limit=1")
            .await?;
        params.into_iter().next().ok_or_else(|| {
            ProviderError::decode("epoch_params returned no rows").with_provider("koios")
        })
    }

    async fn submit_tx(&self, tx: &SignedTx) -> Result<TxHash, ProviderError> {
        let body = self.http.post_cbor("/submittx", tx.as_bytes()).await?;
        parse_submitted_hash(&body).map(TxHash)
    }
}
