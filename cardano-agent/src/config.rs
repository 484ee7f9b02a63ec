//! Configuration types for wallet sessions and chain providers.
//!
//! This module contains the network selector, provider selection, HTTP
//! client and retry settings, and environment-based loading.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CARDANO_PROVIDER` | Provider kind (`blockfrost`, `koios`, `maestro`) | `blockfrost` |
//! | `CARDANO_API_KEY` | Provider API key / project id | required |
//! | `CARDANO_NETWORK` | `testnet` or `mainnet` | `testnet` |
//! | `CARDANO_PROVIDER_URL` | Base URL override | provider default |
//! | `CARDANO_MNEMONIC` | Space separated recovery phrase to import | generated |
//! | `CARDANO_ROOT_KEY` | Root private key to import | unset |

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::key::ImportMaterial;

/// Cardano network a session is bound to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Pre-production test network.
    #[default]
    Testnet,
    /// Cardano mainnet.
    Mainnet,
}

impl Network {
    /// Get the network name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Testnet => "testnet",
            Self::Mainnet => "mainnet",
        }
    }

    /// Human-readable prefix of payment addresses.
    #[must_use]
    pub const fn address_prefix(self) -> &'static str {
        match self {
            Self::Testnet => "addr_test1",
            Self::Mainnet => "addr1",
        }
    }

    /// Human-readable prefix of reward (stake) addresses.
    #[must_use]
    pub const fn stake_prefix(self) -> &'static str {
        match self {
            Self::Testnet => "stake_test1",
            Self::Mainnet => "stake1",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "preprod" => Ok(Self::Testnet),
            "mainnet" => Ok(Self::Mainnet),
            other => Err(Error::configuration(format!("unknown network '{other}'"))),
        }
    }
}

/// Chain provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Blockfrost REST API.
    Blockfrost,
    /// Koios REST API.
    Koios,
    /// Maestro REST API.
    Maestro,
}

impl ProviderKind {
    /// Get the provider name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blockfrost => "blockfrost",
            Self::Koios => "koios",
            Self::Maestro => "maestro",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blockfrost" => Ok(Self::Blockfrost),
            "koios" => Ok(Self::Koios),
            "maestro" => Ok(Self::Maestro),
            other => Err(Error::configuration(format!(
                "unknown provider kind '{other}'"
            ))),
        }
    }
}

/// Shared HTTP client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// User agent string.
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Some(30),
            user_agent: Some(concat!("cardano-agent/", env!("CARGO_PKG_VERSION")).to_owned()),
        }
    }
}

impl HttpClientConfig {
    /// Build a reqwest client with this configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the client cannot be built.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        builder
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))
    }
}

/// Configuration for retrying failed provider requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to retry delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Calculate delay for a given retry number (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = if self.jitter {
            // Up to 25% jitter
            base_delay + base_delay * 0.25 * fastrand::f64()
        } else {
            base_delay
        };
        Duration::from_millis(delay_ms as u64)
    }
}

/// Everything needed to connect to a chain provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider backend.
    pub kind: ProviderKind,
    /// API key or project id.
    pub api_key: String,
    /// Network the provider serves.
    #[serde(default)]
    pub network: Network,
    /// Base URL override (self-hosted instances, tests).
    #[serde(default)]
    pub base_url: Option<String>,
    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpClientConfig,
    /// Retry policy for provider requests.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("network", &self.network)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Create a provider configuration with default HTTP and retry settings.
    #[must_use]
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, network: Network) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            network,
            base_url: None,
            http: HttpClientConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Override the provider base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the HTTP client settings.
    #[must_use]
    pub fn http(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    /// Validate the configuration without touching the network.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is blank.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::configuration("api key must not be empty"));
        }
        Ok(())
    }
}

/// Full wallet configuration: provider settings plus optional key import.
/// Deserialize only.
#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Provider connection settings.
    pub provider: ProviderConfig,
    /// Key material to import; a fresh mnemonic is generated when absent.
    #[serde(default)]
    pub import: Option<ImportMaterial>,
}

impl WalletConfig {
    /// Load configuration from `CARDANO_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a variable is missing or invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let kind =
            lookup("CARDANO_PROVIDER").map_or(Ok(ProviderKind::Blockfrost), |v| v.parse())?;
        let api_key = lookup("CARDANO_API_KEY")
            .ok_or_else(|| Error::configuration("CARDANO_API_KEY is not set"))?;
        let network = lookup("CARDANO_NETWORK").map_or(Ok(Network::default()), |v| v.parse())?;

        let mut provider = ProviderConfig::new(kind, api_key, network);
        provider.base_url = lookup("CARDANO_PROVIDER_URL");
        provider.validate()?;

        let import = match (lookup("CARDANO_MNEMONIC"), lookup("CARDANO_ROOT_KEY")) {
            (Some(_), Some(_)) => {
                return Err(Error::configuration(
                    "CARDANO_MNEMONIC and CARDANO_ROOT_KEY are mutually exclusive",
                ));
            }
            (Some(phrase), None) => Some(ImportMaterial::from_phrase(&phrase)),
            (None, Some(key)) => Some(ImportMaterial::RootKey(key)),
            (None, None) => None,
        };

        Ok(Self { provider, import })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_wallet_config_deserializes() {
        let config: WalletConfig = serde_json::from_value(serde_json::json!({
            "provider": {
                "kind": "maestro",
                "api_key": "key",
                "network": "mainnet",
                "retry": { "max_attempts": 1 }
            },
            "import": { "mnemonic": ["a", "b", "c"] }
        }))
        .unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Maestro);
        assert_eq!(config.provider.network, Network::Mainnet);
        assert_eq!(config.provider.retry.max_attempts, 1);
        assert_eq!(config.provider.http.timeout_secs, Some(30));
        assert!(matches!(config.import, Some(ImportMaterial::Mnemonic(ref w)) if w.len() == 3));
        assert!(!format!("{config:?}").contains("\"key\""));

        let config: WalletConfig = serde_json::from_value(serde_json::json!({
            "provider": { "kind": "koios", "api_key": "key" },
            "import": { "root_key": "xprv1abc" }
        }))
        .unwrap();
        assert_eq!(config.provider.network, Network::Testnet);
        assert!(matches!(config.import, Some(ImportMaterial::RootKey(ref k)) if k == "xprv1abc"));

        let config: WalletConfig = serde_json::from_value(serde_json::json!({
            "provider": { "kind": "blockfrost", "api_key": "key" }
        }))
        .unwrap();
        assert!(config.import.is_none());
    }

    #[test]
    fn test_network_prefixes() {
        assert_eq!(Network::default(), Network::Testnet);
        assert_eq!(Network::Testnet.stake_prefix(), "stake_test1");
        assert_eq!(Network::Mainnet.stake_prefix(), "stake1");
        assert_eq!(Network::Mainnet.address_prefix(), "addr1");
        assert_eq!("Mainnet".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!(
            "blockfrost".parse::<ProviderKind>().unwrap(),
            ProviderKind::Blockfrost
        );
        assert_eq!(
            "KOIOS".parse::<ProviderKind>().unwrap(),
            ProviderKind::Koios
        );
        let err = "ogmios".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("ogmios"));
    }

    #[test]
    fn test_retry_config_delay_without_jitter() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0).as_millis(), 1000);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 2000);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 4000);
    }

    #[test]
    fn test_retry_jitter_is_bounded() {
        let config = RetryConfig {
            initial_delay_ms: 1000,
            ..RetryConfig::default()
        };
        let delay = config.delay_for_attempt(0).as_millis();
        assert!((1000..=1250).contains(&delay));
    }

    #[test]
    fn test_provider_config_validate() {
        let config = ProviderConfig::new(ProviderKind::Koios, "  ", Network::Testnet);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
        let config = ProviderConfig::new(ProviderKind::Koios, "key", Network::Testnet);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig::new(ProviderKind::Maestro, "secret-key", Network::Mainnet);
        assert!(!format!("{config:?}").contains("secret-key"));
    }

    #[test]
    fn test_wallet_config_from_env_defaults() {
        let config =
            WalletConfig::from_lookup(lookup(&[("CARDANO_API_KEY", "preprodABC")])).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Blockfrost);
        assert_eq!(config.provider.network, Network::Testnet);
        assert!(config.import.is_none());
    }

    #[test]
    fn test_wallet_config_from_env_mnemonic() {
        let config = WalletConfig::from_lookup(lookup(&[
            ("CARDANO_API_KEY", "k"),
            ("CARDANO_PROVIDER", "maestro"),
            ("CARDANO_NETWORK", "mainnet"),
            ("CARDANO_MNEMONIC", "one two  three"),
        ]))
        .unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Maestro);
        assert_eq!(config.provider.network, Network::Mainnet);
        assert!(matches!(
            config.import,
            Some(ImportMaterial::Mnemonic(ref words)) if words.len() == 3
        ));
    }

    #[test]
    fn test_wallet_config_from_env_errors() {
        assert!(WalletConfig::from_lookup(lookup(&[])).is_err());
        assert!(
            WalletConfig::from_lookup(lookup(&[
                ("CARDANO_API_KEY", "k"),
                ("CARDANO_MNEMONIC", "a b"),
                ("CARDANO_ROOT_KEY", "xprv1"),
            ]))
            .is_err()
        );
        assert!(
            WalletConfig::from_lookup(lookup(&[
                ("CARDANO_API_KEY", "k"),
                ("CARDANO_PROVIDER", "nope"),
            ]))
            .is_err()
        );
    }
}
