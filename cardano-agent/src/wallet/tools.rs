//! `DynTool` implementations for wallet operations.
//!
//! Each tool wraps an `Arc<WalletSession>` and exposes one wallet capability
//! to the agent via the [`DynTool`] interface. Tools parse and validate their
//! arguments; business failures come back as [`ToolError::Wallet`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::intent::{AssetMetadata, Description, MetadataLabel, MintRequest};
use super::session::WalletSession;
use crate::error::ToolError;
use crate::tool::{BoxedTool, DynTool, ToolDefinition};
use crate::units::{ada_from_lovelace, lovelace_from_ada};

/// Build the tool set for a session.
pub(crate) fn session_tools(wallet: Arc<WalletSession>, key_export: bool) -> Vec<BoxedTool> {
    let mut tools: Vec<BoxedTool> = vec![
        Box::new(GetWalletAddressTool::new(Arc::clone(&wallet))),
        Box::new(GetBalanceTool::new(Arc::clone(&wallet))),
        Box::new(GetTransactionHistoryTool::new(Arc::clone(&wallet))),
        Box::new(SendAdaTool::new(Arc::clone(&wallet))),
        Box::new(SendAssetTool::new(Arc::clone(&wallet))),
        Box::new(MintAssetTool::new(Arc::clone(&wallet))),
        Box::new(BurnAssetTool::new(Arc::clone(&wallet))),
        Box::new(DelegateStakeTool::new(Arc::clone(&wallet))),
    ];
    if key_export {
        tools.push(Box::new(ExportKeysTool::new(wallet)));
    }
    tools
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::invalid_args(format!("missing required field '{field}'")))
}

fn optional_str<'a>(args: &'a Value, field: &str) -> Option<&'a str> {
    args.get(field).and_then(Value::as_str)
}

fn tx_result(hash: &crate::chain::TxHash) -> Value {
    json!({ "tx_hash": hash.as_str() })
}

/// Returns the wallet's receiving address.
#[derive(Debug)]
pub struct GetWalletAddressTool {
    wallet: Arc<WalletSession>,
}

impl GetWalletAddressTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for GetWalletAddressTool {
    fn name(&self) -> &str {
        "get_wallet_address"
    }

    fn description(&self) -> String {
        "Get the agent's own Cardano receiving address".into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {},
            "required": []
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(Value::String(self.wallet.get_address().await?))
    }
}

/// Lists the assets held by the wallet.
#[derive(Debug)]
pub struct GetBalanceTool {
    wallet: Arc<WalletSession>,
}

impl GetBalanceTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for GetBalanceTool {
    fn name(&self) -> &str {
        "get_balance"
    }

    fn description(&self) -> String {
        "Get every asset the wallet holds. Quantities are strings in the smallest unit \
         (1 ADA = 1000000 lovelace); native tokens include policy id, name and metadata."
            .into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {},
            "required": []
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, _args: Value) -> Result<Value, ToolError> {
        let balance = self.wallet.get_balance().await?;
        Ok(serde_json::to_value(balance)?)
    }
}

/// Lists past transactions of the wallet address.
#[derive(Debug)]
pub struct GetTransactionHistoryTool {
    wallet: Arc<WalletSession>,
}

impl GetTransactionHistoryTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for GetTransactionHistoryTool {
    fn name(&self) -> &str {
        "get_transaction_history"
    }

    fn description(&self) -> String {
        "Get the wallet's transaction history with inputs and outputs. \
         Not every chain provider supports this."
            .into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {},
            "required": []
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, _args: Value) -> Result<Value, ToolError> {
        let history = self.wallet.get_transaction_history().await?;
        Ok(serde_json::to_value(history)?)
    }
}

/// Sends ADA to an address.
#[derive(Debug)]
pub struct SendAdaTool {
    wallet: Arc<WalletSession>,
}

impl SendAdaTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for SendAdaTool {
    fn name(&self) -> &str {
        "send_ada"
    }

    fn description(&self) -> String {
        "Send ADA to a Cardano address. Change returns to the wallet. \
         Returns the transaction hash."
            .into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "The recipient Cardano address (bech32, addr1... or addr_test1...)"
                },
                "amount": {
                    "type": "string",
                    "description": "The amount in ADA as a decimal string, up to 6 decimal places (e.g. \"2.5\")"
                }
            },
            "required": ["to", "amount"]
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        let to = required_str(&args, "to")?;
        let amount = required_str(&args, "amount")?;
        let lovelace = lovelace_from_ada(amount)
            .map_err(|e| ToolError::invalid_args(format!("invalid amount: {e}")))?;

        let hash = self.wallet.send_value(to, lovelace.to_string()).await?;
        Ok(json!({
            "tx_hash": hash.as_str(),
            "amount": ada_from_lovelace(lovelace),
            "lovelace": lovelace.to_string(),
        }))
    }
}

/// Sends a native asset to an address.
#[derive(Debug)]
pub struct SendAssetTool {
    wallet: Arc<WalletSession>,
}

impl SendAssetTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for SendAssetTool {
    fn name(&self) -> &str {
        "send_asset"
    }

    fn description(&self) -> String {
        "Send a native token to a Cardano address. Returns the transaction hash.".into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {
                "to": {
                    "type": "string",
                    "description": "The recipient Cardano address"
                },
                "unit": {
                    "type": "string",
                    "description": "The asset unit: policy id followed by the hex asset name"
                },
                "quantity": {
                    "type": "string",
                    "description": "The quantity to send as an integer string"
                }
            },
            "required": ["to", "unit", "quantity"]
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        let to = required_str(&args, "to")?;
        let unit = required_str(&args, "unit")?;
        let quantity = required_str(&args, "quantity")?;

        let hash = self.wallet.send_asset(to, unit, quantity).await?;
        Ok(tx_result(&hash))
    }
}

/// Mints a token under the wallet's policy.
#[derive(Debug)]
pub struct MintAssetTool {
    wallet: Arc<WalletSession>,
}

impl MintAssetTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }

    fn parse_request(args: &Value) -> Result<MintRequest, ToolError> {
        let description = match args.get("description") {
            Some(Value::String(text)) => Description::Text(text.clone()),
            Some(Value::Array(lines)) => Description::Lines(
                lines
                    .iter()
                    .map(|l| {
                        l.as_str().map(str::to_owned).ok_or_else(|| {
                            ToolError::invalid_args("description lines must be strings")
                        })
                    })
                    .collect::<Result<_, _>>()?,
            ),
            _ => {
                return Err(ToolError::invalid_args(
                    "missing required field 'description'",
                ));
            }
        };
        let metadata = AssetMetadata::new(
            required_str(args, "name")?,
            required_str(args, "image")?,
            required_str(args, "media_type")?,
            description,
        );

        let mut request = MintRequest::new(required_str(args, "asset_name")?, metadata);
        if let Some(quantity) = optional_str(args, "quantity") {
            request = request.quantity(quantity);
        }
        if let Some(label) = args.get("label") {
            let label = label
                .as_str()
                .map(str::to_owned)
                .or_else(|| label.as_u64().map(|n| n.to_string()))
                .unwrap_or_default();
            let label: MetadataLabel = label
                .parse()
                .map_err(|e| ToolError::invalid_args(format!("{e}")))?;
            request = request.label(label);
        }
        if let Some(recipient) = optional_str(args, "recipient") {
            request = request.recipient(recipient);
        }
        Ok(request)
    }
}

#[async_trait]
impl DynTool for MintAssetTool {
    fn name(&self) -> &str {
        "mint_asset"
    }

    fn description(&self) -> String {
        "Mint a token under the wallet's own minting policy and attach metadata. \
         Defaults to a single NFT (label 721) sent to the wallet. Returns the transaction hash."
            .into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {
                "asset_name": {
                    "type": "string",
                    "description": "On-chain asset name as plain text"
                },
                "name": {
                    "type": "string",
                    "description": "Display name stored in the metadata"
                },
                "image": {
                    "type": "string",
                    "description": "Image URI (e.g. ipfs://...)"
                },
                "media_type": {
                    "type": "string",
                    "description": "MIME type of the image (e.g. image/png)"
                },
                "description": {
                    "description": "Description text, or a list of lines for long descriptions",
                    "oneOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ]
                },
                "quantity": {
                    "type": "string",
                    "description": "Amount to mint as an integer string (default \"1\")"
                },
                "label": {
                    "type": "string",
                    "enum": ["721", "20"],
                    "description": "Metadata label: 721 for NFTs (default), 20 for fungible tokens"
                },
                "recipient": {
                    "type": "string",
                    "description": "Address receiving the minted tokens (default: the wallet)"
                }
            },
            "required": ["asset_name", "name", "image", "media_type", "description"]
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        let request = Self::parse_request(&args)?;
        let hash = self.wallet.mint_asset(request).await?;
        Ok(tx_result(&hash))
    }
}

/// Burns a token minted under the wallet's policy.
#[derive(Debug)]
pub struct BurnAssetTool {
    wallet: Arc<WalletSession>,
}

impl BurnAssetTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for BurnAssetTool {
    fn name(&self) -> &str {
        "burn_asset"
    }

    fn description(&self) -> String {
        "Burn tokens that were minted under the wallet's own policy. \
         Returns the transaction hash."
            .into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {
                "unit": {
                    "type": "string",
                    "description": "The asset unit: policy id followed by the hex asset name"
                },
                "quantity": {
                    "type": "string",
                    "description": "The quantity to burn as an integer string"
                }
            },
            "required": ["unit", "quantity"]
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        let unit = required_str(&args, "unit")?;
        let quantity = required_str(&args, "quantity")?;

        let hash = self.wallet.burn_asset(unit, quantity).await?;
        Ok(tx_result(&hash))
    }
}

/// Registers the stake key when needed and delegates to a pool.
#[derive(Debug)]
pub struct DelegateStakeTool {
    wallet: Arc<WalletSession>,
}

impl DelegateStakeTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for DelegateStakeTool {
    fn name(&self) -> &str {
        "delegate_stake"
    }

    fn description(&self) -> String {
        "Delegate the wallet's stake to a pool, registering the stake key first \
         if it is not registered yet. Returns the transaction hash."
            .into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {
                "pool_id": {
                    "type": "string",
                    "description": "The stake pool id (bech32 pool1... or hex)"
                }
            },
            "required": ["pool_id"]
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, args: Value) -> Result<Value, ToolError> {
        let pool_id = required_str(&args, "pool_id")?;
        let hash = self.wallet.register_and_stake(pool_id).await?;
        Ok(tx_result(&hash))
    }
}

/// Reveals the wallet credential. Only included on explicit request.
#[derive(Debug)]
pub struct ExportKeysTool {
    wallet: Arc<WalletSession>,
}

impl ExportKeysTool {
    pub const fn new(wallet: Arc<WalletSession>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl DynTool for ExportKeysTool {
    fn name(&self) -> &str {
        "export_keys"
    }

    fn description(&self) -> String {
        "Reveal the wallet's recovery phrase or root private key. \
         Anyone holding these controls the funds."
            .into()
    }

    fn definition(&self) -> ToolDefinition {
        let params = json!({
            "type": "object",
            "properties": {},
            "required": []
        });
        ToolDefinition::new(self.name(), self.description(), params)
    }

    async fn call_json(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(json!({
            "mnemonic": self.wallet.get_mnemonic().map(|words| words.join(" ")),
            "root_key": self.wallet.get_private_key(),
        }))
    }
}
