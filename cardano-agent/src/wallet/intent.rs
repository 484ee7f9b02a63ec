//! Transaction intents and mint metadata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Maximum byte length of a metadata string.
const METADATA_STRING_LIMIT: usize = 64;

/// Metadata standard a minted asset is labelled with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataLabel {
    /// CIP-25 non-fungible token (label 721).
    #[default]
    #[serde(rename = "721")]
    Nft,
    /// Fungible token (label 20).
    #[serde(rename = "20")]
    Fungible,
}

impl MetadataLabel {
    /// Numeric transaction metadata label.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        match self {
            Self::Nft => 721,
            Self::Fungible => 20,
        }
    }
}

impl FromStr for MetadataLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "721" => Ok(Self::Nft),
            "20" => Ok(Self::Fungible),
            other => Err(Error::configuration(format!(
                "unsupported metadata label '{other}', expected 721 or 20"
            ))),
        }
    }
}

/// Asset description: one string or several lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Description {
    /// Single string.
    Text(String),
    /// Sequence of strings.
    Lines(Vec<String>),
}

impl Description {
    /// Metadata value, splitting strings longer than the ledger limit.
    #[must_use]
    pub fn to_metadata(&self) -> Value {
        match self {
            Self::Text(text) => metadata_string(text),
            Self::Lines(lines) => Value::Array(
                lines
                    .iter()
                    .flat_map(|l| chunk(l))
                    .map(Value::String)
                    .collect(),
            ),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Lines(lines) => lines.iter().all(|l| l.trim().is_empty()),
        }
    }
}

impl From<&str> for Description {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Description {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for Description {
    fn from(lines: Vec<String>) -> Self {
        Self::Lines(lines)
    }
}

/// Split `s` into pieces of at most 64 bytes on char boundaries.
fn chunk(s: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        if current.len() + c.len_utf8() > METADATA_STRING_LIMIT {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn metadata_string(s: &str) -> Value {
    if s.len() <= METADATA_STRING_LIMIT {
        Value::String(s.to_owned())
    } else {
        Value::Array(chunk(s).into_iter().map(Value::String).collect())
    }
}

/// Descriptive metadata attached to a mint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Display name.
    pub name: String,
    /// Image URI.
    pub image: String,
    /// MIME type of the image.
    #[serde(rename = "mediaType")]
    pub media_type: String,
    /// Description text.
    pub description: Description,
    /// Additional attributes copied into the metadata verbatim.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl AssetMetadata {
    /// Create metadata with the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        image: impl Into<String>,
        media_type: impl Into<String>,
        description: impl Into<Description>,
    ) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            media_type: media_type.into(),
            description: description.into(),
            extra: Map::new(),
        }
    }

    /// Add an extra attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Check that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first blank field.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("name", self.name.trim().is_empty()),
            ("image", self.image.trim().is_empty()),
            ("mediaType", self.media_type.trim().is_empty()),
            ("description", self.description.is_blank()),
        ]
        .into_iter()
        .find_map(|(field, blank)| blank.then_some(field));
        match missing {
            Some(field) => Err(Error::configuration(format!(
                "asset metadata field '{field}' is required"
            ))),
            None => Ok(()),
        }
    }

    /// The metadata entry of one asset, with long strings split.
    #[must_use]
    pub fn to_metadata(&self) -> Value {
        let mut entry = self.extra.clone();
        entry.insert("name".into(), metadata_string(&self.name));
        entry.insert("image".into(), metadata_string(&self.image));
        entry.insert("mediaType".into(), Value::String(self.media_type.clone()));
        entry.insert("description".into(), self.description.to_metadata());
        Value::Object(entry)
    }
}

/// Parameters of a mint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintRequest {
    /// Asset name as text; hex-encoded on chain.
    pub asset_name: String,
    /// Amount to mint.
    #[serde(default = "default_quantity")]
    pub quantity: String,
    /// Metadata standard.
    #[serde(default)]
    pub label: MetadataLabel,
    /// Descriptive metadata.
    pub metadata: AssetMetadata,
    /// Recipient of the minted tokens; the wallet itself when absent.
    #[serde(default)]
    pub recipient: Option<String>,
}

fn default_quantity() -> String {
    "1".into()
}

impl MintRequest {
    /// Mint one NFT named `asset_name` to the wallet.
    #[must_use]
    pub fn new(asset_name: impl Into<String>, metadata: AssetMetadata) -> Self {
        Self {
            asset_name: asset_name.into(),
            quantity: default_quantity(),
            label: MetadataLabel::default(),
            metadata,
            recipient: None,
        }
    }

    /// Set the quantity.
    #[must_use]
    pub fn quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = quantity.into();
        self
    }

    /// Set the metadata label.
    #[must_use]
    pub const fn label(mut self, label: MetadataLabel) -> Self {
        self.label = label;
        self
    }

    /// Send the minted tokens to another address.
    #[must_use]
    pub fn recipient(mut self, address: impl Into<String>) -> Self {
        self.recipient = Some(address.into());
        self
    }
}

/// A transaction the wallet should perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransactionIntent {
    /// Send lovelace.
    SendValue {
        /// Recipient address.
        to: String,
        /// Amount in lovelace.
        lovelace: String,
    },
    /// Send a native asset.
    SendAsset {
        /// Recipient address.
        to: String,
        /// Asset unit.
        unit: String,
        /// Amount of the asset.
        quantity: String,
    },
    /// Mint under the wallet's forge script.
    MintAsset(MintRequest),
    /// Burn under the wallet's forge script.
    BurnAsset {
        /// Asset unit.
        unit: String,
        /// Amount to destroy.
        quantity: String,
    },
    /// Register the stake credential if needed and delegate.
    RegisterAndStake {
        /// Pool to delegate to.
        pool_id: String,
    },
}

impl TransactionIntent {
    /// Short operation name, used in spans and tool names.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::SendValue { .. } => "send_value",
            Self::SendAsset { .. } => "send_asset",
            Self::MintAsset(_) => "mint_asset",
            Self::BurnAsset { .. } => "burn_asset",
            Self::RegisterAndStake { .. } => "register_and_stake",
        }
    }
}

impl fmt::Display for TransactionIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendValue { to, lovelace } => {
                write!(f, "send_value of {lovelace} lovelace to {to}")
            }
            Self::SendAsset { to, unit, quantity } => {
                write!(f, "send_asset of {quantity} {unit} to {to}")
            }
            Self::MintAsset(req) => {
                write!(f, "mint_asset of {} '{}'", req.quantity, req.asset_name)
            }
            Self::BurnAsset { unit, quantity } => write!(f, "burn_asset of {quantity} {unit}"),
            Self::RegisterAndStake { pool_id } => write!(f, "register_and_stake to pool {pool_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_chunk_respects_limit_and_char_boundaries() {
        let long = "é".repeat(40);
        let chunks = chunk(&long);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() <= METADATA_STRING_LIMIT));
        assert_eq!(chunks.concat(), long);
    }

    #[test]
    fn test_description_to_metadata() {
        assert_eq!(Description::from("short").to_metadata(), json!("short"));

        let long = "a".repeat(130);
        let value = Description::from(long.as_str()).to_metadata();
        let parts = value.as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].as_str().unwrap().len(), 64);

        let lines = Description::Lines(vec!["one".into(), "two".into()]);
        assert_eq!(lines.to_metadata(), json!(["one", "two"]));
    }

    #[test]
    fn test_description_deserializes_either_shape() {
        let text: Description = serde_json::from_value(json!("hi")).unwrap();
        let lines: Description = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(text, Description::Text("hi".into()));
        assert_eq!(lines, Description::Lines(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_metadata_validate() {
        let meta = AssetMetadata::new("Token", "ipfs://Qm", "image/png", "desc");
        assert!(meta.validate().is_ok());

        let meta = AssetMetadata::new("Token", "", "image/png", "desc");
        let err = meta.validate().unwrap_err();
        assert!(err.to_string().contains("image"));
    }

    #[test]
    fn test_metadata_entry_shape() {
        let meta = AssetMetadata::new("Token", "ipfs://Qm", "image/png", "desc")
            .attribute("artist", json!("me"));
        assert_eq!(
            meta.to_metadata(),
            json!({
                "name": "Token",
                "image": "ipfs://Qm",
                "mediaType": "image/png",
                "description": "desc",
                "artist": "me"
            })
        );
    }

    #[test]
    fn test_mint_request_defaults() {
        let req = MintRequest::new("Token", AssetMetadata::new("T", "i", "m", "d"));
        assert_eq!(req.quantity, "1");
        assert_eq!(req.label, MetadataLabel::Nft);
        assert_eq!(req.label.as_u64(), 721);
        assert_eq!(
            "20".parse::<MetadataLabel>().unwrap(),
            MetadataLabel::Fungible
        );
        assert!("42".parse::<MetadataLabel>().is_err());
    }

    #[test]
    fn test_intent_context() {
        let intent = TransactionIntent::BurnAsset {
            unit: "abc".into(),
            quantity: "2".into(),
        };
        assert_eq!(intent.operation(), "burn_asset");
        assert_eq!(intent.to_string(), "burn_asset of 2 abc");
    }
}
