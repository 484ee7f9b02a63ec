//! In-memory provider for tests.
//!
//! Responses are configured up front with builder methods; every call is
//! answered from memory and recorded so tests can assert on what was asked.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    AccountInfo, AddressInfo, Amount, ProtocolParameters, Provider, SignedTx, TxHash, TxInfo,
    TxRef, TxUtxos, Utxo,
};
use crate::config::Network;
use crate::error::ProviderError;

/// A [`Provider`] that answers from configured fixtures.
#[derive(Debug, Default)]
pub struct MockProvider {
    network: Network,
    lists_transactions: bool,
    addresses: HashMap<String, AddressInfo>,
    utxos: HashMap<String, Vec<Utxo>>,
    metadata: HashMap<String, Value>,
    failing_metadata: HashSet<String>,
    accounts: HashMap<String, AccountInfo>,
    address_transactions: HashMap<String, Vec<TxRef>>,
    tx_infos: HashMap<String, TxInfo>,
    tx_utxos: HashMap<String, TxUtxos>,
    submit_error: Option<ProviderError>,
    submitted: Mutex<Vec<SignedTx>>,
    account_calls: AtomicUsize,
    tx_info_calls: AtomicUsize,
    utxo_calls: AtomicUsize,
    tx_info_in_flight: AtomicUsize,
    tx_info_peak: AtomicUsize,
}

impl MockProvider {
    /// Create an empty testnet provider without address transaction listing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a different network.
    #[must_use]
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Advertise address transaction listing.
    #[must_use]
    pub const fn with_transaction_listing(mut self) -> Self {
        self.lists_transactions = true;
        self
    }

    /// Mark an address as seen on chain, holding `amounts`.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>, amounts: Vec<Amount>) -> Self {
        let address = address.into();
        self.addresses.insert(
            address.clone(),
            AddressInfo {
                address,
                amounts,
                stake_address: None,
            },
        );
        self
    }

    /// Set the UTXOs held by an address.
    #[must_use]
    pub fn with_utxos(mut self, address: impl Into<String>, utxos: Vec<Utxo>) -> Self {
        self.utxos.insert(address.into(), utxos);
        self
    }

    /// Register metadata for an asset unit.
    #[must_use]
    pub fn with_metadata(mut self, unit: impl Into<String>, metadata: Value) -> Self {
        self.metadata.insert(unit.into(), metadata);
        self
    }

    /// Make metadata lookups for `unit` fail.
    #[must_use]
    pub fn with_failing_metadata(mut self, unit: impl Into<String>) -> Self {
        self.failing_metadata.insert(unit.into());
        self
    }

    /// Set the account state of a reward address.
    #[must_use]
    pub fn with_account(mut self, account: AccountInfo) -> Self {
        self.accounts.insert(account.stake_address.clone(), account);
        self
    }

    /// Set the transactions listed for an address.
    #[must_use]
    pub fn with_address_transactions(
        mut self,
        address: impl Into<String>,
        txs: Vec<TxRef>,
    ) -> Self {
        self.address_transactions.insert(address.into(), txs);
        self
    }

    /// Add detail and inputs/outputs for one transaction.
    #[must_use]
    pub fn with_transaction(mut self, info: TxInfo, utxos: TxUtxos) -> Self {
        self.tx_utxos.insert(info.hash.clone(), utxos);
        self.tx_infos.insert(info.hash.clone(), info);
        self
    }

    /// Make every submission fail with `error`.
    #[must_use]
    pub fn with_submit_error(mut self, error: ProviderError) -> Self {
        self.submit_error = Some(error);
        self
    }

    /// Transactions submitted so far.
    #[must_use]
    pub fn submitted(&self) -> Vec<SignedTx> {
        self.submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of account lookups performed.
    #[must_use]
    pub fn account_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
    }

    /// Number of transaction detail lookups performed.
    #[must_use]
    pub fn tx_info_calls(&self) -> usize {
        self.tx_info_calls.load(Ordering::SeqCst)
    }

    /// Number of transaction UTXO lookups performed.
    #[must_use]
    pub fn utxo_calls(&self) -> usize {
        self.utxo_calls.load(Ordering::SeqCst)
    }

    /// Most transaction detail lookups observed in flight at once.
    #[must_use]
    pub fn peak_tx_info_concurrency(&self) -> usize {
        self.tx_info_peak.load(Ordering::SeqCst)
    }

    fn error(message: String) -> ProviderError {
        ProviderError::not_found(message).with_provider("mock")
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn network(&self) -> Network {
        self.network
    }

    fn supports_address_transactions(&self) -> bool {
        self.lists_transactions
    }

    async fn fetch_address_info(
        &self,
        address: &str,
    ) -> Result<Option<AddressInfo>, ProviderError> {
        Ok(self.addresses.get(address).cloned())
    }

    async fn fetch_address_utxos(&self, address: &str) -> Result<Vec<Utxo>, ProviderError> {
        Ok(self.utxos.get(address).cloned().unwrap_or_default())
    }

    async fn fetch_asset_metadata(&self, unit: &str) -> Result<Option<Value>, ProviderError> {
        if self.failing_metadata.contains(unit) {
            return Err(
                ProviderError::network("metadata service unavailable").with_provider("mock")
            );
        }
        Ok(self.metadata.get(unit).cloned())
    }

    async fn fetch_account_info(&self, reward_address: &str) -> Result<AccountInfo, ProviderError> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .accounts
            .get(reward_address)
            .cloned()
            .unwrap_or_else(|| AccountInfo::unregistered(reward_address)))
    }

    async fn fetch_address_transactions(&self, address: &str) -> Result<Vec<TxRef>, ProviderError> {
        if !self.lists_transactions {
            return Err(
                ProviderError::not_supported("address transaction listing").with_provider("mock")
            );
        }
        Ok(self
            .address_transactions
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_tx_info(&self, hash: &str) -> Result<TxInfo, ProviderError> {
        self.tx_info_calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.tx_info_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx_info_peak.fetch_max(in_flight, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.tx_info_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.tx_infos
            .get(hash)
            .cloned()
            .ok_or_else(|| Self::error(format!("transaction {hash} not found")))
    }

    async fn fetch_utxos(&self, hash: &str) -> Result<TxUtxos, ProviderError> {
        self.utxo_calls.fetch_add(1, Ordering::SeqCst);
        self.tx_utxos
            .get(hash)
            .cloned()
            .ok_or_else(|| Self::error(format!("utxos of {hash} not found")))
    }

    async fn fetch_protocol_parameters(&self) -> Result<ProtocolParameters, ProviderError> {
        Ok(ProtocolParameters {
            min_fee_a: 44,
            min_fee_b: 155_381,
            max_tx_size: 16_384,
            key_deposit: "2000000".into(),
            pool_deposit: "500000000".into(),
            coins_per_utxo_size: "4310".into(),
        })
    }

    async fn submit_tx(&self, tx: &SignedTx) -> Result<TxHash, ProviderError> {
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        let mut submitted = self
            .submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        submitted.push(tx.clone());
        Ok(TxHash(format!("{:064x}", submitted.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_address_is_unseen() {
        let provider = MockProvider::new().with_address("addr_test1a", vec![Amount::lovelace("1")]);
        assert!(
            provider
                .fetch_address_info("addr_test1a")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            provider
                .fetch_address_info("addr_test1b")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_listing_requires_capability() {
        let provider = MockProvider::new();
        assert!(
            provider
                .fetch_address_transactions("addr_test1a")
                .await
                .is_err()
        );

        let provider = MockProvider::new().with_transaction_listing();
        assert!(
            provider
                .fetch_address_transactions("addr_test1a")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_submit_records_transactions() {
        let provider = MockProvider::new();
        let hash = provider
            .submit_tx(&SignedTx::new(vec![1, 2]))
            .await
            .unwrap();
        assert_eq!(hash.as_str().len(), 64);
        assert_eq!(provider.submitted(), vec![SignedTx::new(vec![1, 2])]);
    }
}
