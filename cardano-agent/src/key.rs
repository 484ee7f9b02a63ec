//! Wallet key material.
//!
//! A session is backed by exactly one credential: a BIP39 recovery phrase or
//! an encoded root private key. Both are zeroized on drop and never printed
//! by `Debug`.

use std::fmt;

use serde::Deserialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Word counts accepted for imported and generated recovery phrases.
pub const MNEMONIC_WORD_COUNTS: [usize; 2] = [12, 24];

/// Word count of freshly generated recovery phrases.
pub const GENERATED_WORD_COUNT: usize = 24;

/// Caller-supplied material to import into a new session.
///
/// Deserializes from `{"mnemonic": [words...]}` or `{"root_key": "..."}`.
/// Never serialized.
#[derive(Clone, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMaterial {
    /// Ordered recovery phrase words.
    Mnemonic(Vec<String>),
    /// Encoded root private key (e.g. `xprv1...`).
    RootKey(String),
}

impl ImportMaterial {
    /// Split a whitespace separated phrase into mnemonic words.
    #[must_use]
    pub fn from_phrase(phrase: &str) -> Self {
        Self::Mnemonic(phrase.split_whitespace().map(str::to_owned).collect())
    }
}

impl From<Vec<String>> for ImportMaterial {
    fn from(words: Vec<String>) -> Self {
        Self::Mnemonic(words)
    }
}

impl From<&[&str]> for ImportMaterial {
    fn from(words: &[&str]) -> Self {
        Self::Mnemonic(words.iter().map(|w| (*w).to_owned()).collect())
    }
}

impl From<String> for ImportMaterial {
    fn from(key: String) -> Self {
        Self::RootKey(key)
    }
}

impl From<&str> for ImportMaterial {
    fn from(key: &str) -> Self {
        Self::RootKey(key.to_owned())
    }
}

impl fmt::Debug for ImportMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mnemonic(words) => write!(f, "Mnemonic([REDACTED; {} words])", words.len()),
            Self::RootKey(_) => f.write_str("RootKey([REDACTED])"),
        }
    }
}

/// The credential a wallet session signs with.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum KeyMaterial {
    /// BIP39 recovery phrase, 12 or 24 words.
    Mnemonic(Vec<String>),
    /// Encoded root private key.
    RootKey(String),
}

impl KeyMaterial {
    /// Validate a recovery phrase and wrap it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a word count other than 12 or 24,
    /// or for blank words.
    pub fn from_words(words: Vec<String>) -> Result<Self> {
        if !MNEMONIC_WORD_COUNTS.contains(&words.len()) {
            return Err(Error::configuration(format!(
                "mnemonic must have 12 or 24 words, got {}",
                words.len()
            )));
        }
        if words.iter().any(|w| w.trim().is_empty()) {
            return Err(Error::configuration("mnemonic contains an empty word"));
        }
        Ok(Self::Mnemonic(words))
    }

    /// Validate an encoded root key and wrap it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a blank key.
    pub fn from_root_key(key: String) -> Result<Self> {
        if key.trim().is_empty() {
            return Err(Error::configuration("root key must not be empty"));
        }
        Ok(Self::RootKey(key))
    }

    /// Generate a fresh recovery phrase using kobe's BIP39 entropy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if entropy generation fails.
    pub fn generate() -> Result<Self> {
        let wallet = kobe::Wallet::generate(GENERATED_WORD_COUNT, None)
            .map_err(|e| Error::configuration(format!("mnemonic generation failed: {e}")))?;
        let words = wallet
            .mnemonic()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        Self::from_words(words)
    }

    /// Resolve optional import material; absent material yields a fresh phrase.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the material is invalid.
    pub fn resolve(import: Option<ImportMaterial>) -> Result<Self> {
        match import.as_ref() {
            Some(ImportMaterial::Mnemonic(words)) => Self::from_words(words.clone()),
            Some(ImportMaterial::RootKey(key)) => Self::from_root_key(key.clone()),
            None => Self::generate(),
        }
    }

    /// The recovery phrase words, if this is a mnemonic credential.
    #[must_use]
    pub fn mnemonic(&self) -> Option<&[String]> {
        match self {
            Self::Mnemonic(words) => Some(words),
            Self::RootKey(_) => None,
        }
    }

    /// The encoded root key, if this is a root-key credential.
    #[must_use]
    pub fn root_key(&self) -> Option<&str> {
        match self {
            Self::Mnemonic(_) => None,
            Self::RootKey(key) => Some(key),
        }
    }

    /// Short label of the variant, safe to log.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Mnemonic(_) => "mnemonic",
            Self::RootKey(_) => "root_key",
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mnemonic(words) => write!(f, "Mnemonic([REDACTED; {} words])", words.len()),
            Self::RootKey(_) => f.write_str("RootKey([REDACTED])"),
        }
    }
}
