//! Provider-neutral chain data returned by [`Provider`](super::Provider)s.
//!
//! Every quantity is a decimal string in the smallest on-chain unit.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A quantity of one asset unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// `lovelace` or policy id concatenated with the hex asset name.
    pub unit: String,
    /// Decimal quantity.
    pub quantity: String,
}

impl Amount {
    /// Create an amount.
    #[must_use]
    pub fn new(unit: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            quantity: quantity.into(),
        }
    }

    /// Create a lovelace amount.
    #[must_use]
    pub fn lovelace(quantity: impl Into<String>) -> Self {
        Self::new(crate::wallet::NATIVE_UNIT, quantity)
    }
}

/// Summary of an address the provider has observed on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressInfo {
    /// Bech32 address.
    pub address: String,
    /// Assets currently held.
    pub amounts: Vec<Amount>,
    /// Associated reward address, if any.
    pub stake_address: Option<String>,
}

/// An unspent (or, in history, consumed) transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Hash of the transaction that produced the output.
    pub tx_hash: String,
    /// Index of the output in that transaction.
    pub output_index: u32,
    /// Address holding the output.
    pub address: String,
    /// Assets carried by the output.
    pub amount: Vec<Amount>,
}

/// A reference to a transaction that touched an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRef {
    /// Transaction hash.
    pub tx_hash: String,
    /// Block height the transaction landed in.
    pub block_height: Option<u64>,
    /// Unix timestamp of that block.
    pub block_time: Option<i64>,
}

/// Chain-level information about one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInfo {
    /// Transaction hash.
    pub hash: String,
    /// Block height.
    pub block_height: Option<u64>,
    /// Unix timestamp of the block.
    pub block_time: Option<i64>,
    /// Absolute slot.
    pub slot: Option<u64>,
    /// Fee paid, in lovelace.
    pub fees: String,
    /// Deposit paid (or reclaimed when negative), in lovelace.
    pub deposit: String,
    /// Serialized size in bytes.
    pub size: u64,
    /// Total produced amounts.
    pub output_amount: Vec<Amount>,
}

/// Inputs consumed and outputs produced by one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxUtxos {
    /// Transaction hash.
    pub hash: String,
    /// Consumed outputs.
    pub inputs: Vec<Utxo>,
    /// Produced outputs.
    pub outputs: Vec<Utxo>,
}

/// Registration and delegation state of a reward address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Reward address.
    pub stake_address: String,
    /// Whether the stake credential is registered.
    pub active: bool,
    /// Pool the account delegates to.
    pub pool_id: Option<String>,
    /// Lovelace controlled by the account.
    pub controlled_amount: String,
    /// Rewards available for withdrawal.
    pub withdrawable_amount: String,
}

impl AccountInfo {
    /// An account the chain has never seen.
    #[must_use]
    pub fn unregistered(stake_address: impl Into<String>) -> Self {
        Self {
            stake_address: stake_address.into(),
            active: false,
            pool_id: None,
            controlled_amount: "0".into(),
            withdrawable_amount: "0".into(),
        }
    }
}

/// Protocol parameters the ledger backend needs for fee and deposit math.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Linear fee coefficient (lovelace per byte).
    pub min_fee_a: u64,
    /// Constant fee (lovelace).
    pub min_fee_b: u64,
    /// Maximum transaction size in bytes.
    pub max_tx_size: u64,
    /// Stake credential registration deposit, in lovelace.
    pub key_deposit: String,
    /// Pool registration deposit, in lovelace.
    pub pool_deposit: String,
    /// Lovelace per UTXO byte.
    pub coins_per_utxo_size: String,
}

/// Hex-encoded transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl TxHash {
    /// Borrow the hash string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! tx_bytes {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Wrap raw CBOR bytes.
            #[must_use]
            pub const fn new(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }

            /// Decode from a hex string.
            ///
            /// # Errors
            ///
            /// Returns [`LedgerError::Malformed`] for invalid hex.
            pub fn from_hex(s: &str) -> Result<Self, LedgerError> {
                hex::decode(s.trim())
                    .map(Self)
                    .map_err(|e| LedgerError::Malformed(format!("invalid hex: {e}")))
            }

            /// Hex encoding of the bytes.
            #[must_use]
            pub fn to_hex(&self) -> String {
                hex::encode(&self.0)
            }

            /// Borrow the raw bytes.
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({} bytes)", stringify!($name), self.0.len())
            }
        }
    };
}

tx_bytes!(
    /// CBOR bytes of a transaction that still lacks witnesses.
    UnsignedTx
);
tx_bytes!(
    /// CBOR bytes of a fully witnessed transaction, ready for submission.
    SignedTx
);
