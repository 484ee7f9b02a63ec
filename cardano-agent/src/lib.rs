#![cfg_attr(docsrs, feature(doc_cfg))]
//! Cardano wallet sessions for AI agents.
//!
//! A [`WalletSession`](wallet::WalletSession) holds one credential and talks
//! to the chain through a hosted [`Provider`](chain::Provider) (Blockfrost,
//! Koios or Maestro). Payments, native asset mints and burns, and stake
//! delegation are expressed as a [`TransactionIntent`](wallet::TransactionIntent)
//! and driven through build, sign and submit. Every operation is also
//! available as a [`DynTool`](tool::DynTool) for agent frameworks.
//!
//! Transaction building and key derivation sit behind the
//! [`Ledger`](ledger::Ledger) trait. The crate ships no production ledger:
//! callers supply one that derives Cardano addresses and encodes CBOR
//! transactions. The in-memory `MockProvider` and `MockLedger` doubles are
//! available behind the `test-util` feature.

pub mod chain;
pub mod config;
pub mod error;
pub mod key;
pub mod ledger;
pub mod prelude;
pub mod tool;
pub mod units;
pub mod wallet;

pub use error::{Error, LedgerError, ProviderError, Result, ToolError};
