//! Wallet sessions and transaction orchestration.
//!
//! A [`WalletSession`] binds a credential to a [`ChainClient`](crate::chain::ChainClient)
//! and a [`Network`](crate::config::Network). It answers identity and balance
//! queries and is the only holder of the signing handle. Transactions are
//! described as a [`TransactionIntent`] and driven through build, sign and
//! submit by the [`TransactionOrchestrator`].
//!
//! The session needs a [`Ledger`](crate::ledger::Ledger) that derives real
//! Cardano addresses and encodes CBOR transactions. This crate does not ship
//! one; `MockLedger` (feature `test-util`) only produces placeholder bytes
//! and must never be paired with a live provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cardano_agent::ledger::Ledger;
//! use cardano_agent::wallet::WalletSession;
//!
//! // Your production ledger backend.
//! let ledger: Arc<dyn Ledger> = Arc::new(MyLedger::new());
//!
//! let session = WalletSession::builder()
//!     .provider("blockfrost")
//!     .api_key("preprodXYZ")
//!     .ledger(ledger)
//!     .build()?;
//!
//! let address = session.get_address().await?;
//! let hash = session.send_value("addr_test1...", "2000000").await?;
//!
//! // Expose the wallet to an agent.
//! let tools = session.tools();
//! ```

mod intent;
mod normalize;
mod orchestrator;
mod session;
pub mod tools;

pub use intent::{AssetMetadata, Description, MetadataLabel, MintRequest, TransactionIntent};
pub use normalize::{
    AssetRecord, HISTORY_CONCURRENCY, TransactionRecord, enrich_transactions, normalize_balance,
    normalize_history, split_unit,
};
pub use orchestrator::TransactionOrchestrator;
pub use session::{WalletSession, WalletSessionBuilder};

/// Unit string of the native currency.
pub const NATIVE_UNIT: &str = "lovelace";

/// Display name of the native currency.
pub const NATIVE_ASSET_NAME: &str = "ADA";

/// Length of a hex policy id; the prefix of every non-native unit.
pub const POLICY_ID_LENGTH: usize = 56;
