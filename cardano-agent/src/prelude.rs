//! Commonly used types, re-exported for `use cardano_agent::prelude::*`.

pub use crate::chain::{Amount, ChainClient, Provider, TxHash, Utxo};
pub use crate::config::{Network, ProviderConfig, ProviderKind, WalletConfig};
pub use crate::error::{Error, Result, ToolError};
pub use crate::key::ImportMaterial;
pub use crate::ledger::{Ledger, TxPlan};
pub use crate::tool::{BoxedTool, DynTool, ToolDefinition, call_tool};
pub use crate::wallet::{
    AssetMetadata, AssetRecord, MintRequest, TransactionIntent, TransactionRecord, WalletSession,
};
