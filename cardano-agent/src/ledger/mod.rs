//! Ledger backend seam: key derivation, forge scripts, transaction building
//! and signing.
//!
//! The wallet never encodes transactions itself. It describes what a
//! transaction must do as a [`TxPlan`] and hands it, together with the
//! wallet's UTXOs and the current protocol parameters, to a [`Ledger`]
//! implementation that performs coin selection, fee calculation and CBOR
//! encoding.

#[cfg(any(test, feature = "test-util"))]
mod mock;
mod plan;

use std::fmt;

use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-util"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub use mock::MockLedger;
pub use plan::{TxInstruction, TxPlan, TxPlanBuilder};

use crate::chain::{ProtocolParameters, SignedTx, UnsignedTx, Utxo};
use crate::config::Network;
use crate::error::LedgerError;
use crate::key::KeyMaterial;

/// Addresses derived from a wallet credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Payment addresses in derivation order.
    pub addresses: Vec<String>,
    /// Reward (stake) address.
    pub reward_address: String,
}

/// A single-signature native script that authorizes minting and burning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeScript {
    /// Hex policy id (hash of the script).
    pub policy_id: String,
    /// Hex CBOR of the native script.
    pub script_cbor: String,
}

/// Wallet state a ledger needs to turn a [`TxPlan`] into a transaction.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    /// Network the transaction targets.
    pub network: Network,
    /// Address receiving leftover input value.
    pub change_address: &'a str,
    /// Spendable outputs of the wallet.
    pub utxos: &'a [Utxo],
    /// Current protocol parameters.
    pub protocol: &'a ProtocolParameters,
}

/// Adds witnesses to unsigned transactions.
///
/// Created once per wallet session and never handed out.
pub trait TxSigner: Send + Sync {
    /// Sign a transaction with the wallet's payment and stake keys.
    ///
    /// # Errors
    ///
    /// Returns a signing error when the bytes are not a transaction the
    /// signer can witness.
    fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx, LedgerError>;
}

/// Key derivation and transaction construction backend.
pub trait Ledger: Send + Sync + fmt::Debug {
    /// Backend name, for logs.
    fn name(&self) -> &'static str;

    /// Generate a fresh recovery phrase.
    ///
    /// # Errors
    ///
    /// Returns a derivation error when entropy is unavailable.
    fn generate_mnemonic(&self) -> Result<KeyMaterial, LedgerError> {
        KeyMaterial::generate().map_err(|e| LedgerError::derivation(e.to_string()))
    }

    /// Derive the payment and reward addresses of a credential.
    ///
    /// # Errors
    ///
    /// Returns a derivation error for unusable key material.
    fn derive_account(&self, key: &KeyMaterial, network: Network) -> Result<Account, LedgerError>;

    /// Create the signing handle for a credential.
    ///
    /// # Errors
    ///
    /// Returns a derivation error for unusable key material.
    fn signer(&self, key: &KeyMaterial, network: Network)
    -> Result<Box<dyn TxSigner>, LedgerError>;

    /// The forge script whose single signer is the key behind `address`.
    ///
    /// # Errors
    ///
    /// Returns a derivation error when `address` has no key hash.
    fn forge_script(&self, address: &str) -> Result<ForgeScript, LedgerError>;

    /// Select inputs, balance, and encode a transaction.
    ///
    /// # Errors
    ///
    /// Returns a build error when the plan cannot be satisfied.
    fn build(&self, plan: &TxPlan, context: &BuildContext<'_>) -> Result<UnsignedTx, LedgerError>;
}
