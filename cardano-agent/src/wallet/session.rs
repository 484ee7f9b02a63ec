//! Wallet session: credential, addresses and the signing handle.

use std::fmt;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::info;

use super::intent::{MintRequest, TransactionIntent};
use super::normalize::{AssetRecord, TransactionRecord, normalize_balance, normalize_history};
use super::orchestrator::TransactionOrchestrator;
use crate::chain::{
    AddressInfo, ChainClient, Provider, SignedTx, TxHash, UnsignedTx, Utxo, sum_amounts,
};
use crate::config::{
    HttpClientConfig, Network, ProviderConfig, ProviderKind, RetryConfig, WalletConfig,
};
use crate::error::{Error, LedgerError, ProviderError, Result};
use crate::key::{ImportMaterial, KeyMaterial};
use crate::ledger::{Account, Ledger, TxSigner};
use crate::tool::BoxedTool;

/// A wallet bound to one credential, one chain client and one network.
///
/// Identity is fixed at construction. The signing handle is created then and
/// never leaves the session; only addresses, signed bytes and transaction
/// hashes do.
///
/// Transaction methods must not be called concurrently on the same session:
/// two in-flight intents would select the same inputs.
pub struct WalletSession {
    client: ChainClient,
    network: Network,
    key: KeyMaterial,
    account: Account,
    signer: Box<dyn TxSigner>,
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("provider", &self.client.provider().name())
            .field("ledger", &self.client.ledger().name())
            .field("network", &self.network)
            .field("key", &self.key)
            .field("addresses", &self.account.addresses.len())
            .finish_non_exhaustive()
    }
}

impl WalletSession {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> WalletSessionBuilder {
        WalletSessionBuilder::default()
    }

    /// Create a session from a provider name, API key and optional network
    /// and key material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a blank API key, an unknown
    /// provider, or unusable key material. No network request is made.
    pub fn new(
        provider: &str,
        api_key: &str,
        network: Option<Network>,
        import: Option<ImportMaterial>,
        ledger: Arc<dyn Ledger>,
    ) -> Result<Self> {
        let mut builder = Self::builder()
            .provider(provider)
            .api_key(api_key)
            .ledger(ledger);
        if let Some(network) = network {
            builder = builder.network(network);
        }
        if let Some(import) = import {
            builder = builder.import(import);
        }
        builder.build()
    }

    /// Create a session from a [`WalletConfig`].
    ///
    /// # Errors
    ///
    /// See [`WalletSession::new`].
    pub fn from_config(config: WalletConfig, ledger: Arc<dyn Ledger>) -> Result<Self> {
        let client = ChainClient::connect(&config.provider, ledger)?;
        Self::open(client, config.import)
    }

    /// Create a session on an existing, possibly shared, chain client.
    ///
    /// The session uses the client's network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for unusable key material.
    pub fn with_client(client: ChainClient, import: Option<ImportMaterial>) -> Result<Self> {
        Self::open(client, import)
    }

    fn open(client: ChainClient, import: Option<ImportMaterial>) -> Result<Self> {
        let key = match import {
            Some(import) => KeyMaterial::resolve(Some(import))?,
            None => client
                .ledger()
                .generate_mnemonic()
                .map_err(|e| Error::configuration(format!("mnemonic generation failed: {e}")))?,
        };
        let network = client.network();
        let derive_failed =
            |e: LedgerError| Error::configuration(format!("key derivation failed: {e}"));
        let account = client
            .ledger()
            .derive_account(&key, network)
            .map_err(derive_failed)?;
        let signer = client
            .ledger()
            .signer(&key, network)
            .map_err(derive_failed)?;

        info!(
            provider = client.provider().name(),
            ledger = client.ledger().name(),
            %network,
            key = key.kind(),
            addresses = account.addresses.len(),
            "wallet session initialized"
        );

        Ok(Self {
            client,
            network,
            key,
            account,
            signer,
        })
    }

    /// Network the session is bound to.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    /// The chain client the session uses.
    #[must_use]
    pub const fn client(&self) -> &ChainClient {
        &self.client
    }

    pub(crate) fn provider(&self) -> &dyn Provider {
        self.client.provider()
    }

    /// The recovery phrase, if the session was created from one.
    #[must_use]
    pub fn get_mnemonic(&self) -> Option<&[String]> {
        self.key.mnemonic()
    }

    /// The root private key, if the session was created from one.
    #[must_use]
    pub fn get_private_key(&self) -> Option<&str> {
        self.key.root_key()
    }

    /// Reward (stake) address.
    #[must_use]
    pub fn get_reward_address(&self) -> &str {
        &self.account.reward_address
    }

    /// Every derived payment address, in derivation order.
    #[must_use]
    pub fn addresses(&self) -> &[String] {
        &self.account.addresses
    }

    async fn address_infos(&self) -> Result<Vec<Option<AddressInfo>>> {
        let provider = self.provider();
        try_join_all(
            self.account
                .addresses
                .iter()
                .map(|a| provider.fetch_address_info(a)),
        )
        .await
        .map_err(|e| Error::provider("look up wallet addresses", e))
    }

    async fn partition_addresses(&self) -> Result<(Vec<String>, Vec<String>)> {
        let infos = self.address_infos().await?;
        let mut used = Vec::new();
        let mut unused = Vec::new();
        for (address, info) in self.account.addresses.iter().zip(infos) {
            if info.is_some() {
                used.push(address.clone());
            } else {
                unused.push(address.clone());
            }
        }
        Ok((used, unused))
    }

    /// Addresses the chain has seen.
    ///
    /// # Errors
    ///
    /// Returns a provider error when a lookup fails.
    pub async fn get_used_addresses(&self) -> Result<Vec<String>> {
        Ok(self.partition_addresses().await?.0)
    }

    /// Addresses the chain has not seen yet.
    ///
    /// # Errors
    ///
    /// Returns a provider error when a lookup fails.
    pub async fn get_unused_addresses(&self) -> Result<Vec<String>> {
        Ok(self.partition_addresses().await?.1)
    }

    /// The wallet's receiving address: the first used address, or the first
    /// unused one for a wallet without history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAddress`] when the account has no addresses, or a
    /// provider error when a lookup fails.
    pub async fn get_address(&self) -> Result<String> {
        let (used, unused) = self.partition_addresses().await?;
        used.into_iter()
            .chain(unused)
            .next()
            .ok_or(Error::NoAddress)
    }

    /// Spendable outputs across all wallet addresses.
    ///
    /// # Errors
    ///
    /// Returns a provider error when a lookup fails.
    pub async fn get_utxos(&self) -> Result<Vec<Utxo>> {
        self.fetch_utxos()
            .await
            .map_err(|e| Error::provider("fetch wallet utxos", e))
    }

    pub(crate) async fn fetch_utxos(&self) -> Result<Vec<Utxo>, ProviderError> {
        let provider = self.provider();
        let per_address = try_join_all(
            self.account
                .addresses
                .iter()
                .map(|a| provider.fetch_address_utxos(a)),
        )
        .await?;
        Ok(per_address.into_iter().flatten().collect())
    }

    /// Assets held across the used addresses, with decoded names and metadata.
    ///
    /// # Errors
    ///
    /// Returns a provider error when an address lookup fails. Metadata
    /// failures only blank the affected record's metadata.
    pub async fn get_balance(&self) -> Result<Vec<AssetRecord>> {
        let infos = self.address_infos().await?;
        let raw = sum_amounts(infos.iter().flatten().flat_map(|info| &info.amounts))
            .map_err(|e| Error::provider("aggregate wallet balance", e))?;
        Ok(normalize_balance(self.provider(), &raw).await)
    }

    /// Transaction history of the wallet address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] when the provider cannot list
    /// address transactions.
    pub async fn get_transaction_history(&self) -> Result<Vec<TransactionRecord>> {
        let provider = self.provider();
        if !provider.supports_address_transactions() {
            return Err(Error::UnsupportedOperation {
                operation: "transaction history",
                provider: provider.name(),
            });
        }
        let address = self.get_address().await?;
        normalize_history(provider, &address).await
    }

    pub(crate) fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx, LedgerError> {
        self.signer.sign(tx)
    }

    pub(crate) async fn submit(&self, tx: &SignedTx) -> Result<TxHash, ProviderError> {
        self.provider().submit_tx(tx).await
    }

    /// Sign an unsigned transaction and submit it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] or [`Error::Submission`] wrapping the cause.
    pub async fn sign_and_submit(&self, tx: &UnsignedTx) -> Result<TxHash> {
        let signed = self
            .sign(tx)
            .map_err(|e| Error::signing("transaction", e))?;
        let hash = self
            .submit(&signed)
            .await
            .map_err(|e| Error::submission("transaction", e))?;
        info!(tx_hash = %hash, bytes = signed.as_bytes().len(), "transaction submitted");
        Ok(hash)
    }

    /// Build, sign and submit a transaction intent.
    ///
    /// # Errors
    ///
    /// Returns the error of the first phase that failed.
    pub async fn execute(&self, intent: &TransactionIntent) -> Result<TxHash> {
        TransactionOrchestrator::new(self).execute(intent).await
    }

    /// Send lovelace to an address.
    ///
    /// # Errors
    ///
    /// See [`WalletSession::execute`].
    pub async fn send_value(
        &self,
        to: impl Into<String>,
        lovelace: impl Into<String>,
    ) -> Result<TxHash> {
        self.execute(&TransactionIntent::SendValue {
            to: to.into(),
            lovelace: lovelace.into(),
        })
        .await
    }

    /// Send a native asset to an address.
    ///
    /// # Errors
    ///
    /// See [`WalletSession::execute`].
    pub async fn send_asset(
        &self,
        to: impl Into<String>,
        unit: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Result<TxHash> {
        self.execute(&TransactionIntent::SendAsset {
            to: to.into(),
            unit: unit.into(),
            quantity: quantity.into(),
        })
        .await
    }

    /// Mint an asset under the wallet's forge script.
    ///
    /// # Errors
    ///
    /// See [`WalletSession::execute`].
    pub async fn mint_asset(&self, request: MintRequest) -> Result<TxHash> {
        self.execute(&TransactionIntent::MintAsset(request)).await
    }

    /// Burn an asset minted under the wallet's forge script.
    ///
    /// # Errors
    ///
    /// See [`WalletSession::execute`].
    pub async fn burn_asset(
        &self,
        unit: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Result<TxHash> {
        self.execute(&TransactionIntent::BurnAsset {
            unit: unit.into(),
            quantity: quantity.into(),
        })
        .await
    }

    /// Register the stake credential if needed and delegate to a pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStakeAddress`] when the reward address does
    /// not belong to the session network, otherwise see
    /// [`WalletSession::execute`].
    pub async fn register_and_stake(&self, pool_id: impl Into<String>) -> Result<TxHash> {
        self.execute(&TransactionIntent::RegisterAndStake {
            pool_id: pool_id.into(),
        })
        .await
    }

    /// Convert into agent tools. Key export is not included.
    #[must_use]
    pub fn tools(self) -> Vec<BoxedTool> {
        super::tools::session_tools(Arc::new(self), false)
    }

    /// Convert into agent tools, including one that reveals the credential.
    #[must_use]
    pub fn tools_with_key_export(self) -> Vec<BoxedTool> {
        super::tools::session_tools(Arc::new(self), true)
    }
}

/// Builder for [`WalletSession`].
#[derive(Default)]
pub struct WalletSessionBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    network: Option<Network>,
    base_url: Option<String>,
    import: Option<ImportMaterial>,
    ledger: Option<Arc<dyn Ledger>>,
    client: Option<ChainClient>,
    http: Option<HttpClientConfig>,
    retry: Option<RetryConfig>,
}

impl fmt::Debug for WalletSessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSessionBuilder")
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("network", &self.network)
            .field("base_url", &self.base_url)
            .field("import", &self.import)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl WalletSessionBuilder {
    /// Provider name: `blockfrost`, `koios` or `maestro`.
    #[must_use]
    pub fn provider(mut self, kind: impl Into<String>) -> Self {
        self.provider = Some(kind.into());
        self
    }

    /// Provider API key or project id.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Network; testnet when unset.
    #[must_use]
    pub const fn network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    /// Override the provider base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Import a recovery phrase.
    #[must_use]
    pub fn mnemonic<S: AsRef<str>>(mut self, words: &[S]) -> Self {
        self.import = Some(ImportMaterial::Mnemonic(
            words.iter().map(|w| w.as_ref().to_owned()).collect(),
        ));
        self
    }

    /// Import a root private key.
    #[must_use]
    pub fn root_key(mut self, key: impl Into<String>) -> Self {
        self.import = Some(ImportMaterial::RootKey(key.into()));
        self
    }

    /// Import key material of either kind.
    #[must_use]
    pub fn import(mut self, import: ImportMaterial) -> Self {
        self.import = Some(import);
        self
    }

    /// Ledger backend used for derivation, building and signing.
    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn Ledger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Use an existing chain client instead of creating one.
    ///
    /// Provider, API key, network, base URL, HTTP, retry and ledger settings
    /// are ignored when a client is supplied.
    #[must_use]
    pub fn client(mut self, client: ChainClient) -> Self {
        self.client = Some(client);
        self
    }

    /// HTTP client settings.
    #[must_use]
    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.http = Some(http);
        self
    }

    /// Retry policy for provider requests.
    #[must_use]
    pub const fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Build the session.
    ///
    /// Checks run in order: API key, provider kind, ledger. Nothing touches
    /// the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on the first failed check or for
    /// unusable key material.
    pub fn build(self) -> Result<WalletSession> {
        let client = match self.client {
            Some(client) => client,
            None => {
                let api_key = self
                    .api_key
                    .filter(|k| !k.trim().is_empty())
                    .ok_or_else(|| Error::configuration("api key must not be empty"))?;
                let kind: ProviderKind = self
                    .provider
                    .as_deref()
                    .ok_or_else(|| Error::configuration("provider kind is required"))?
                    .parse()?;
                let ledger = self
                    .ledger
                    .ok_or_else(|| Error::configuration("a ledger backend is required"))?;

                let mut config =
                    ProviderConfig::new(kind, api_key, self.network.unwrap_or_default());
                config.base_url = self.base_url;
                if let Some(http) = self.http {
                    config = config.http(http);
                }
                if let Some(retry) = self.retry {
                    config = config.retry(retry);
                }
                ChainClient::connect(&config, ledger)?
            }
        };
        WalletSession::open(client, self.import)
    }
}
