//! Caller-facing shapes for balances and transaction history.

use futures::future::join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{NATIVE_ASSET_NAME, NATIVE_UNIT, POLICY_ID_LENGTH};
use crate::chain::{Amount, Provider, TxInfo, TxRef, TxUtxos, Utxo};
use crate::error::{Error, Result};

/// One asset held by the wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// On-chain unit.
    pub unit: String,
    /// Decimal quantity in the smallest denomination.
    pub quantity: String,
    /// Policy id; `None` for the native currency.
    pub policy_id: Option<String>,
    /// Human-readable asset name.
    pub asset_name: String,
    /// Registered asset metadata, if any could be fetched.
    pub metadata: Option<Value>,
}

/// Split a unit into policy id and decoded asset name.
///
/// The native unit has no policy and is named after the currency. Other
/// units carry the policy id in their first 56 characters; the remainder is
/// hex-decoded as UTF-8 (lossy), falling back to the raw suffix when it is
/// not valid hex.
#[must_use]
pub fn split_unit(unit: &str) -> (Option<String>, String) {
    if unit == NATIVE_UNIT {
        return (None, NATIVE_ASSET_NAME.to_owned());
    }
    if unit.len() <= POLICY_ID_LENGTH || !unit.is_char_boundary(POLICY_ID_LENGTH) {
        return (Some(unit.to_owned()), String::new());
    }
    let (policy, name_hex) = unit.split_at(POLICY_ID_LENGTH);
    let name = hex::decode(name_hex).map_or_else(
        |_| name_hex.to_owned(),
        |bytes| String::from_utf8_lossy(&bytes).into_owned(),
    );
    (Some(policy.to_owned()), name)
}

/// Map raw amounts to [`AssetRecord`]s, fetching metadata for non-native
/// units concurrently.
///
/// A failed metadata lookup leaves that record's metadata empty and does not
/// affect the others.
pub async fn normalize_balance(provider: &dyn Provider, raw: &[Amount]) -> Vec<AssetRecord> {
    let lookups = raw.iter().map(|amount| async move {
        let (policy_id, asset_name) = split_unit(&amount.unit);
        let metadata = if policy_id.is_none() {
            None
        } else {
            match provider.fetch_asset_metadata(&amount.unit).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(unit = %amount.unit, error = %e, "asset metadata lookup failed");
                    None
                }
            }
        };
        AssetRecord {
            unit: amount.unit.clone(),
            quantity: amount.quantity.clone(),
            policy_id,
            asset_name,
            metadata,
        }
    });
    join_all(lookups).await
}

/// Transactions enriched at once; each needs two provider requests.
pub const HISTORY_CONCURRENCY: usize = 8;

/// A transaction merged with the outputs it consumed and produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Transaction hash.
    pub hash: String,
    /// Block height.
    pub block_height: Option<u64>,
    /// Unix timestamp of the block.
    pub block_time: Option<i64>,
    /// Absolute slot.
    pub slot: Option<u64>,
    /// Fee in lovelace.
    pub fees: String,
    /// Deposit in lovelace.
    pub deposit: String,
    /// Size in bytes.
    pub size: u64,
    /// Total produced amounts.
    pub output_amount: Vec<Amount>,
    /// Consumed outputs.
    pub inputs: Vec<Utxo>,
    /// Produced outputs.
    pub outputs: Vec<Utxo>,
}

impl TransactionRecord {
    /// Merge transaction info with its inputs and outputs.
    #[must_use]
    pub fn new(info: TxInfo, utxos: TxUtxos) -> Self {
        Self {
            hash: info.hash,
            block_height: info.block_height,
            block_time: info.block_time,
            slot: info.slot,
            fees: info.fees,
            deposit: info.deposit,
            size: info.size,
            output_amount: info.output_amount,
            inputs: utxos.inputs,
            outputs: utxos.outputs,
        }
    }
}

/// Fetch detail and UTXOs for each listed transaction, keeping listing order.
///
/// At most [`HISTORY_CONCURRENCY`] transactions are looked up at a time.
///
/// # Errors
///
/// Returns a provider error for the first failed lookup.
pub async fn enrich_transactions(
    provider: &dyn Provider,
    txs: &[TxRef],
) -> Result<Vec<TransactionRecord>> {
    let fut: futures::future::BoxFuture<'_, Result<Vec<TransactionRecord>>> = Box::pin(
        stream::iter(txs)
            .map(|tx| async move {
                let (info, utxos) = futures::try_join!(
                    provider.fetch_tx_info(&tx.tx_hash),
                    provider.fetch_utxos(&tx.tx_hash)
                )
                .map_err(|e| Error::provider(format!("fetch transaction {}", tx.tx_hash), e))?;
                Ok::<_, Error>(TransactionRecord::new(info, utxos))
            })
            .buffered(HISTORY_CONCURRENCY)
            .try_collect(),
    );
    fut.await
}

/// Transaction history of `address`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedOperation`] when the provider cannot list
/// address transactions, or a provider error when a lookup fails.
pub async fn normalize_history(
    provider: &dyn Provider,
    address: &str,
) -> Result<Vec<TransactionRecord>> {
    if !provider.supports_address_transactions() {
        return Err(Error::UnsupportedOperation {
            operation: "transaction history",
            provider: provider.name(),
        });
    }
    let txs = provider
        .fetch_address_transactions(address)
        .await
        .map_err(|e| Error::provider(format!("list transactions of {address}"), e))?;
    if txs.is_empty() {
        return Ok(Vec::new());
    }
    debug!(address, count = txs.len(), "enriching transaction history");
    enrich_transactions(provider, &txs).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::chain::MockProvider;

    const POLICY: &str = "b0d07d45fe9514f80213f4020e5a61241458be626841cde717cb38a7";

    fn tx(hash: &str) -> (TxInfo, TxUtxos) {
        let info = TxInfo {
            hash: hash.into(),
            block_height: Some(10),
            block_time: Some(1_700_000_000),
            slot: Some(99),
            fees: "170000".into(),
            deposit: "0".into(),
            size: 250,
            output_amount: vec![Amount::lovelace("1000000")],
        };
        let utxos = TxUtxos {
            hash: hash.into(),
            inputs: vec![],
            outputs: vec![Utxo {
                tx_hash: hash.into(),
                output_index: 0,
                address: "addr_test1x".into(),
                amount: vec![Amount::lovelace("1000000")],
            }],
        };
        (info, utxos)
    }

    #[test]
    fn test_split_unit() {
        assert_eq!(split_unit("lovelace"), (None, "ADA".to_owned()));

        let unit = format!("{POLICY}4e4654");
        assert_eq!(
            split_unit(&unit),
            (Some(POLICY.to_owned()), "NFT".to_owned())
        );

        assert_eq!(split_unit(POLICY), (Some(POLICY.to_owned()), String::new()));

        let odd = format!("{POLICY}xyz");
        assert_eq!(
            split_unit(&odd),
            (Some(POLICY.to_owned()), "xyz".to_owned())
        );
    }

    #[tokio::test]
    async fn test_normalize_balance_empty() {
        let provider = MockProvider::new();
        assert!(normalize_balance(&provider, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_normalize_balance_native_and_assets() {
        let unit = format!("{POLICY}4e4654");
        let provider = MockProvider::new().with_metadata(&unit, json!({"name": "NFT"}));
        let records = normalize_balance(
            &provider,
            &[Amount::lovelace("5000000"), Amount::new(&unit, "1")],
        )
        .await;

        assert_eq!(records[0].policy_id, None);
        assert_eq!(records[0].asset_name, "ADA");
        assert_eq!(records[0].metadata, None);
        assert_eq!(records[1].policy_id.as_deref(), Some(POLICY));
        assert_eq!(records[1].asset_name, "NFT");
        assert_eq!(records[1].metadata, Some(json!({"name": "NFT"})));
    }

    #[tokio::test]
    async fn test_metadata_failure_is_isolated() {
        let bad = format!("{POLICY}626164");
        let good = format!("{POLICY}676f6f64");
        let provider = MockProvider::new()
            .with_failing_metadata(&bad)
            .with_metadata(&good, json!({"name": "good"}));

        let records = normalize_balance(
            &provider,
            &[Amount::new(&bad, "1"), Amount::new(&good, "2")],
        )
        .await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].metadata, None);
        assert_eq!(records[0].asset_name, "bad");
        assert_eq!(records[1].metadata, Some(json!({"name": "good"})));
    }

    #[tokio::test]
    async fn test_history_empty_listing_skips_fetchers() {
        let provider = MockProvider::new().with_transaction_listing();
        let history = normalize_history(&provider, "addr_test1x").await.unwrap();
        assert!(history.is_empty());
        assert_eq!(provider.tx_info_calls(), 0);
        assert_eq!(provider.utxo_calls(), 0);
    }

    #[tokio::test]
    async fn test_history_requires_listing_capability() {
        let provider = MockProvider::new();
        let err = normalize_history(&provider, "addr_test1x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedOperation {
                provider: "mock",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_history_merges_in_listing_order() {
        let (info_a, utxos_a) = tx("aa");
        let (info_b, utxos_b) = tx("bb");
        let provider = MockProvider::new()
            .with_transaction_listing()
            .with_address_transactions(
                "addr_test1x",
                vec![
                    TxRef {
                        tx_hash: "bb".into(),
                        block_height: Some(11),
                        block_time: None,
                    },
                    TxRef {
                        tx_hash: "aa".into(),
                        block_height: Some(10),
                        block_time: None,
                    },
                ],
            )
            .with_transaction(info_a, utxos_a)
            .with_transaction(info_b, utxos_b);

        let history = normalize_history(&provider, "addr_test1x").await.unwrap();
        let hashes: Vec<_> = history.iter().map(|r| r.hash.as_str()).collect();
        assert_eq!(hashes, ["bb", "aa"]);
        assert_eq!(history[0].outputs.len(), 1);
        assert_eq!(provider.tx_info_calls(), 2);
    }

    #[tokio::test]
    async fn test_history_lookups_are_bounded() {
        let count = HISTORY_CONCURRENCY * 3;
        let mut provider = MockProvider::new().with_transaction_listing();
        let mut refs = Vec::with_capacity(count);
        for i in 0..count {
            let hash = format!("{i:064x}");
            let (info, utxos) = tx(&hash);
            provider = provider.with_transaction(info, utxos);
            refs.push(TxRef {
                tx_hash: hash,
                block_height: None,
                block_time: None,
            });
        }
        let provider = provider.with_address_transactions("addr_test1x", refs);

        let history = normalize_history(&provider, "addr_test1x").await.unwrap();
        assert_eq!(history.len(), count);
        assert_eq!(history[count - 1].hash, format!("{:064x}", count - 1));
        assert!(provider.peak_tx_info_concurrency() <= HISTORY_CONCURRENCY);
        assert!(provider.peak_tx_info_concurrency() > 1);
    }

    #[tokio::test]
    async fn test_history_detail_failure_surfaces() {
        let provider = MockProvider::new()
            .with_transaction_listing()
            .with_address_transactions(
                "addr_test1x",
                vec![TxRef {
                    tx_hash: "missing".into(),
                    block_height: None,
                    block_time: None,
                }],
            );
        let err = normalize_history(&provider, "addr_test1x")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
