//! Chain providers and the [`ChainClient`] a wallet session talks to.
//!
//! A [`Provider`] answers chain queries and submits transactions over a
//! hosted API. A [`Ledger`] derives keys and builds and signs transactions.
//! [`ChainClient`] bundles one of each behind `Arc`s so several sessions can
//! share it.
//!
//! # Supported Providers
//!
//! - **Blockfrost**: full capability set, including address transaction listing
//! - **Koios**: queries and submission, no address transaction listing
//! - **Maestro**: queries and submission, no address transaction listing
//!
//! # Example
//!
//! ```rust,ignore
//! use cardano_agent::chain::{self, ChainClient};
//! use cardano_agent::config::{Network, ProviderConfig, ProviderKind};
//!
//! let config = ProviderConfig::new(ProviderKind::Blockfrost, "preprodXYZ", Network::Testnet);
//! let client = ChainClient::connect(&config, ledger)?;
//! ```

mod blockfrost;
mod http;
mod koios;
mod maestro;
#[cfg(any(test, feature = "test-util"))]
mod mock;
mod types;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::info;

pub use blockfrost::{BLOCKFROST_MAINNET_URL, BLOCKFROST_PREPROD_URL, BlockfrostProvider};
pub use koios::{KOIOS_MAINNET_URL, KOIOS_PREPROD_URL, KoiosProvider};
pub use maestro::{MAESTRO_MAINNET_URL, MAESTRO_PREPROD_URL, MaestroProvider};
#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub use mock::MockProvider;
pub use types::{
    AccountInfo, AddressInfo, Amount, ProtocolParameters, SignedTx, TxHash, TxInfo, TxRef, TxUtxos,
    UnsignedTx, Utxo,
};

use crate::config::{Network, ProviderConfig, ProviderKind};
use crate::error::{ProviderError, Result};
use crate::ledger::Ledger;

/// Query and submission backend for one hosted chain API.
///
/// Implement this trait to add a new backend. Optional capabilities are
/// advertised through the `supports_*` methods; the matching fetch method
/// returns a not-supported error by default.
#[async_trait]
pub trait Provider: Send + Sync + fmt::Debug {
    /// Get the provider name (e.g., "blockfrost", "koios").
    fn name(&self) -> &'static str;

    /// Network the provider is connected to.
    fn network(&self) -> Network;

    /// Check if the provider can list the transactions of an address.
    fn supports_address_transactions(&self) -> bool {
        false
    }

    /// Look up an address; `None` when the chain has never seen it.
    async fn fetch_address_info(&self, address: &str)
    -> Result<Option<AddressInfo>, ProviderError>;

    /// Unspent outputs held by an address.
    async fn fetch_address_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError>;

    /// Off-chain or on-chain metadata registered for an asset unit.
    async fn fetch_asset_metadata(&self, unit: &str) -> Result<Option<Value>, ProviderError>;

    /// Registration and delegation state of a reward address.
    async fn fetch_account_info(&self, reward_address: &str) -> Result<AccountInfo, ProviderError>;

    /// Transactions that touched an address.
    ///
    /// Only available when [`supports_address_transactions`](Self::supports_address_transactions)
    /// returns `true`.
    async fn fetch_address_transactions(&self, address: &str) -> Result<Vec<TxRef>, ProviderError> {
        let _ = address;
        Err(ProviderError::not_supported("address transaction listing").with_provider(self.name()))
    }

    /// Chain information about a transaction.
    async fn fetch_tx_info(&self, hash: &str) -> Result<TxInfo, ProviderError>;

    /// Inputs and outputs of a transaction.
    async fn fetch_utxos(&self, hash: &str) -> Result<TxUtxos, ProviderError>;

    /// Current protocol parameters.
    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError>;

    /// Submit a signed transaction, returning its hash.
    async fn submit_tx(&self, tx: &SignedTx) -> Result<TxHash, ProviderError>;
}

/// Create the provider selected by `config`.
///
/// No network request is made; only the configuration is validated and an
/// HTTP client is prepared.
///
/// # Errors
///
/// Returns a configuration error for a blank API key or an unusable HTTP
/// client configuration.
pub fn connect(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    config.validate()?;
    let provider: Arc<dyn Provider> = match config.kind {
        ProviderKind::Blockfrost => Arc::new(BlockfrostProvider::from_config(config)?),
        ProviderKind::Koios => Arc::new(KoiosProvider::from_config(config)?),
        ProviderKind::Maestro => Arc::new(MaestroProvider::from_config(config)?),
    };
    info!(
        provider = provider.name(),
        network = %config.network,
        "chain provider configured"
    );
    Ok(provider)
}

/// A provider and a ledger backend, shareable across wallet sessions.
#[derive(Clone)]
pub struct ChainClient {
    provider: Arc<dyn Provider>,
    ledger: Arc<dyn Ledger>,
}

impl fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainClient")
            .field("provider", &self.provider.name())
            .field("ledger", &self.ledger.name())
            .field("network", &self.provider.network())
            .finish()
    }
}

impl ChainClient {
    /// Combine an existing provider and ledger backend.
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, ledger: Arc<dyn Ledger>) -> Self {
        Self { provider, ledger }
    }

    /// Create the configured provider and pair it with `ledger`.
    ///
    /// # Errors
    ///
    /// See [`connect`].
    pub fn connect(config: &ProviderConfig, ledger: Arc<dyn Ledger>) -> Result<Self> {
        Ok(Self::new(connect(config)?, ledger))
    }

    /// The query/submission backend.
    #[must_use]
    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    /// The key derivation and transaction building backend.
    #[must_use]
    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    /// Network the provider serves.
    #[must_use]
    pub fn network(&self) -> Network {
        self.provider.network()
    }
}

/// Sum amounts per unit, keeping first-seen unit order.
///
/// # Errors
///
/// Returns a decode error when a quantity is not an unsigned integer.
pub fn sum_amounts<'a>(
    amounts: impl IntoIterator<Item = &'a Amount>,
) -> Result<Vec<Amount>, ProviderError> {
    let mut totals: Vec<(String, u128)> = Vec::new();
    for amount in amounts {
        let quantity: u128 = amount.quantity.parse().map_err(|_| {
            ProviderError::decode(format!(
                "invalid quantity '{}' for unit {}",
                amount.quantity, amount.unit
            ))
        })?;
        match totals.iter_mut().find(|(unit, _)| *unit == amount.unit) {
            Some((_, total)) => {
                *total = total.checked_add(quantity).ok_or_else(|| {
                    ProviderError::decode(format!("quantity overflow for unit {}", amount.unit))
                })?;
            }
            None => totals.push((amount.unit.clone(), quantity)),
        }
    }
    Ok(totals
        .into_iter()
        .map(|(unit, total)| Amount::new(unit, total.to_string()))
        .collect())
}

/// Deserialize a quantity that an API may send as a JSON number or string.
pub(crate) fn de_quantity<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockLedger;

    #[test]
    fn test_sum_amounts_keeps_order() {
        let amounts = [
            Amount::lovelace("5"),
            Amount::new("abcd", "1"),
            Amount::lovelace("7"),
            Amount::new("abcd", "2"),
        ];
        let totals = sum_amounts(&amounts).unwrap();
        assert_eq!(
            totals,
            vec![Amount::lovelace("12"), Amount::new("abcd", "3")]
        );
    }

    #[test]
    fn test_sum_amounts_exceeds_u64() {
        let amounts = [
            Amount::lovelace(u64::MAX.to_string()),
            Amount::lovelace(u64::MAX.to_string()),
        ];
        let totals = sum_amounts(&amounts).unwrap();
        assert_eq!(totals[0].quantity, "36893488147419103230");
    }

    #[test]
    fn test_sum_amounts_rejects_garbage() {
        let amounts = [Amount::lovelace("1.5")];
        assert!(sum_amounts(&amounts).is_err());
    }

    #[test]
    fn test_de_quantity_accepts_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Q {
            #[serde(deserialize_with = "de_quantity")]
            q: String,
        }
        let a: Q = serde_json::from_str(r#"{"q": 17}"#).unwrap();
        let b: Q = serde_json::from_str(r#"{"q": "18"}"#).unwrap();
        let c: Q = serde_json::from_str(r#"{"q": -2000000}"#).unwrap();
        assert_eq!(
            (a.q.as_str(), b.q.as_str(), c.q.as_str()),
            ("17", "18", "-2000000")
        );
    }

    #[test]
    fn test_connect_selects_backend() {
        for (kind, name) in [
            (ProviderKind::Blockfrost, "blockfrost"),
            (ProviderKind::Koios, "koios"),
            (ProviderKind::Maestro, "maestro"),
        ] {
            let config = ProviderConfig::new(kind, "key", Network::Mainnet);
            let provider = connect(&config).unwrap();
            assert_eq!(provider.name(), name);
            assert_eq!(provider.network(), Network::Mainnet);
        }
    }

    #[test]
    fn test_only_blockfrost_lists_transactions() {
        let lists = |kind| {
            connect(&ProviderConfig::new(kind, "key", Network::Testnet))
                .unwrap()
                .supports_address_transactions()
        };
        assert!(lists(ProviderKind::Blockfrost));
        assert!(!lists(ProviderKind::Koios));
        assert!(!lists(ProviderKind::Maestro));
    }

    #[test]
    fn test_connect_rejects_blank_key() {
        let config = ProviderConfig::new(ProviderKind::Koios, "", Network::Testnet);
        assert!(connect(&config).is_err());
    }

    #[test]
    fn test_chain_client_debug() {
        let client = ChainClient::new(
            Arc::new(MockProvider::new()),
            Arc::new(MockLedger::default()),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("mock"));
        assert_eq!(client.network(), Network::Testnet);
    }
}
