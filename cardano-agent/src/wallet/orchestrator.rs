//! Build, sign and submit pipeline for transaction intents.

use serde_json::{Map, Value};
use tracing::{Instrument, debug, info, info_span};

use super::intent::{MintRequest, TransactionIntent};
use super::session::WalletSession;
use crate::chain::{TxHash, UnsignedTx};
use crate::error::{BoxError, Error, Result};
use crate::ledger::{BuildContext, TxPlan};
use crate::units::parse_quantity;

/// Drives one [`TransactionIntent`] through build, sign and submit.
///
/// Phases run strictly in order and a failed phase stops the pipeline, so at
/// most one of [`Error::Build`], [`Error::Signing`] or [`Error::Submission`]
/// is returned. Nothing is retried here; retries belong to the provider
/// transport.
#[derive(Debug, Clone, Copy)]
pub struct TransactionOrchestrator<'a> {
    session: &'a WalletSession,
}

impl<'a> TransactionOrchestrator<'a> {
    /// Create an orchestrator over a session.
    #[must_use]
    pub const fn new(session: &'a WalletSession) -> Self {
        Self { session }
    }

    /// Build, sign and submit `intent`, returning the transaction hash.
    ///
    /// # Errors
    ///
    /// Returns the error of the first phase that failed, or
    /// [`Error::NoAddress`] / [`Error::InvalidStakeAddress`] before building.
    pub async fn execute(&self, intent: &TransactionIntent) -> Result<TxHash> {
        let span = info_span!(
            "transaction",
            operation = intent.operation(),
            network = %self.session.network()
        );
        async {
            let unsigned = self.build(intent).await?;
            let signed = self
                .session
                .sign(&unsigned)
                .map_err(|e| Error::signing(intent.to_string(), e))?;
            let hash = self
                .session
                .submit(&signed)
                .await
                .map_err(|e| Error::submission(intent.to_string(), e))?;
            info!(tx_hash = %hash, "transaction submitted");
            Ok(hash)
        }
        .instrument(span)
        .await
    }

    /// Build the unsigned transaction for `intent` without signing it.
    ///
    /// Change always returns to the session address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] with the intent as context.
    pub async fn build(&self, intent: &TransactionIntent) -> Result<UnsignedTx> {
        if matches!(intent, TransactionIntent::RegisterAndStake { .. }) {
            self.check_reward_address()?;
        }

        let change_address = self.session.get_address().await.map_err(|e| match e {
            Error::NoAddress => Error::NoAddress,
            other => Error::build(intent.to_string(), other),
        })?;

        let plan = self.plan(intent, &change_address).await?;

        let (utxos, protocol) = futures::try_join!(
            self.session.fetch_utxos(),
            self.session.provider().fetch_protocol_parameters()
        )
        .map_err(|e| Error::build(intent.to_string(), e))?;

        let context = BuildContext {
            network: self.session.network(),
            change_address: &change_address,
            utxos: &utxos,
            protocol: &protocol,
        };
        let unsigned = self
            .session
            .client()
            .ledger()
            .build(&plan, &context)
            .map_err(|e| Error::build(intent.to_string(), e))?;

        debug!(
            instructions = plan.instructions().len(),
            inputs = utxos.len(),
            bytes = unsigned.as_bytes().len(),
            "transaction built"
        );
        Ok(unsigned)
    }

    fn check_reward_address(&self) -> Result<()> {
        let address = self.session.get_reward_address();
        let expected = self.session.network().stake_prefix();
        if address.starts_with(expected) {
            Ok(())
        } else {
            Err(Error::InvalidStakeAddress {
                address: address.to_owned(),
                expected,
            })
        }
    }

    async fn plan(&self, intent: &TransactionIntent, change_address: &str) -> Result<TxPlan> {
        let fail = |e: BoxError| Error::build(intent.to_string(), e);
        let ledger = self.session.client().ledger();

        let plan = match intent {
            TransactionIntent::SendValue { to, lovelace } => TxPlan::builder()
                .send_value(to, amount(intent, lovelace)?)
                .build(),
            TransactionIntent::SendAsset {
                to,
                unit,
                quantity: q,
            } => TxPlan::builder()
                .send_asset(to, unit, amount(intent, q)?)
                .build(),
            TransactionIntent::MintAsset(request) => {
                request.metadata.validate().map_err(|e| fail(e.into()))?;
                let quantity = amount(intent, &request.quantity)?;
                let script = ledger
                    .forge_script(change_address)
                    .map_err(|e| fail(e.into()))?;
                let metadata = mint_metadata(&script.policy_id, request);
                let recipient = request
                    .recipient
                    .clone()
                    .unwrap_or_else(|| change_address.to_owned());
                TxPlan::builder()
                    .mint(
                        script,
                        hex::encode(request.asset_name.as_bytes()),
                        quantity,
                        recipient,
                    )
                    .metadata(request.label.as_u64(), metadata)
                    .build()
            }
            TransactionIntent::BurnAsset { unit, quantity: q } => {
                let quantity = amount(intent, q)?;
                let script = ledger
                    .forge_script(change_address)
                    .map_err(|e| fail(e.into()))?;
                let Some(asset_name) = unit.strip_prefix(script.policy_id.as_str()) else {
                    return Err(fail(
                        format!(
                            "asset {unit} was not minted under the wallet policy {}",
                            script.policy_id
                        )
                        .into(),
                    ));
                };
                let asset_name = asset_name.to_owned();
                TxPlan::builder().burn(script, asset_name, quantity).build()
            }
            TransactionIntent::RegisterAndStake { pool_id } => {
                let reward_address = self.session.get_reward_address();
                let account = self
                    .session
                    .provider()
                    .fetch_account_info(reward_address)
                    .await
                    .map_err(|e| fail(e.into()))?;
                let mut builder = TxPlan::builder();
                if account.active {
                    debug!(reward_address, "stake credential already registered");
                } else {
                    builder = builder.register_stake(reward_address);
                }
                builder.delegate_stake(reward_address, pool_id).build()
            }
        };
        Ok(plan)
    }
}

fn amount(intent: &TransactionIntent, quantity: &str) -> Result<u64> {
    parse_quantity(quantity).map_err(|e| Error::build(intent.to_string(), e))
}

/// CIP-25 style metadata body: `{policy_id: {asset_name: {...}}}`.
fn mint_metadata(policy_id: &str, request: &MintRequest) -> Value {
    let mut assets = Map::new();
    assets.insert(request.asset_name.clone(), request.metadata.to_metadata());
    let mut policies = Map::new();
    policies.insert(policy_id.to_owned(), Value::Object(assets));
    Value::Object(policies)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::chain::{AccountInfo, Amount, ChainClient, MockProvider};
    use crate::config::Network;
    use crate::error::ProviderError;
    use crate::key::ImportMaterial;
    use crate::ledger::{MockLedger, TxInstruction};
    use crate::wallet::{AssetMetadata, MetadataLabel};

    struct Fixture {
        session: WalletSession,
        provider: Arc<MockProvider>,
        ledger: Arc<MockLedger>,
    }

    fn words() -> Vec<String> {
        (0..24).map(|i| format!("word{i}")).collect()
    }

    fn fixture_with(provider: MockProvider, ledger: MockLedger) -> Fixture {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("cardano_agent=debug"))
            .with_test_writer()
            .try_init();

        let provider = Arc::new(provider);
        let ledger = Arc::new(ledger);
        let client = ChainClient::new(provider.clone(), ledger.clone());
        let session =
            WalletSession::with_client(client, Some(ImportMaterial::Mnemonic(words()))).unwrap();
        Fixture {
            session,
            provider,
            ledger,
        }
    }

    fn fixture(provider: MockProvider) -> Fixture {
        fixture_with(provider, MockLedger::new())
    }

    fn wallet_address() -> String {
        fixture(MockProvider::new()).session.addresses()[0].clone()
    }

    fn reward_address() -> String {
        fixture(MockProvider::new())
            .session
            .get_reward_address()
            .to_owned()
    }

    fn registered(address: &str) -> AccountInfo {
        AccountInfo {
            stake_address: address.to_owned(),
            active: true,
            pool_id: Some("pool1old".into()),
            controlled_amount: "10".into(),
            withdrawable_amount: "0".into(),
        }
    }

    #[tokio::test]
    async fn test_send_value_pipeline() {
        let f = fixture(MockProvider::new());
        let hash = f
            .session
            .send_value("addr_test1recipient", "2000000")
            .await
            .unwrap();

        assert_eq!(f.provider.submitted().len(), 1);
        assert_eq!(hash.as_str().len(), 64);
        let plans = f.ledger.plans();
        assert_eq!(
            plans[0].instructions(),
            &[TxInstruction::Pay {
                address: "addr_test1recipient".into(),
                unit: "lovelace".into(),
                quantity: 2_000_000,
            }]
        );
    }

    #[tokio::test]
    async fn test_change_returns_to_session_address() {
        let f = fixture(MockProvider::new());
        let unsigned = TransactionOrchestrator::new(&f.session)
            .build(&TransactionIntent::SendValue {
                to: "addr_test1r".into(),
                lovelace: "1".into(),
            })
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(unsigned.as_bytes()).unwrap();
        assert_eq!(body["change"], json!(wallet_address()));
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected_for_every_intent() {
        let f = fixture(MockProvider::new());
        let err = f.session.send_value("addr_test1r", "0").await.unwrap_err();
        assert_eq!(err.phase(), Some("build"));
        assert!(err.to_string().contains("greater than zero"));

        let err = f
            .session
            .mint_asset(
                MintRequest::new(
                    "Coin",
                    AssetMetadata::new("Coin", "ipfs://x", "image/png", "a coin"),
                )
                .quantity("0"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.phase(), Some("build"));
        assert!(f.ledger.plans().is_empty());
        assert!(f.provider.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_quantity_is_build_error() {
        let f = fixture(MockProvider::new());
        for bad in ["", "0", "-5", "1.5", "99999999999999999999"] {
            let err = f
                .session
                .send_asset("addr_test1r", "abcd", bad)
                .await
                .unwrap_err();
            assert_eq!(err.phase(), Some("build"), "quantity {bad:?}");
        }
        assert!(f.provider.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_mint_defaults_and_metadata_nesting() {
        let f = fixture(MockProvider::new());
        let long = "d".repeat(100);
        let request = MintRequest::new(
            "Token",
            AssetMetadata::new("Token", "ipfs://QmHash", "image/png", long.as_str()),
        );
        f.session.mint_asset(request).await.unwrap();

        let plan = &f.ledger.plans()[0];
        let TxInstruction::Mint {
            script,
            asset_name,
            quantity,
            recipient,
        } = &plan.instructions()[0]
        else {
            panic!("expected mint instruction");
        };
        assert_eq!(asset_name, "546f6b656e");
        assert_eq!(*quantity, 1);
        assert_eq!(recipient, &wallet_address());

        let TxInstruction::Metadata { label, value } = &plan.instructions()[1] else {
            panic!("expected metadata instruction");
        };
        assert_eq!(*label, 721);
        let entry = &value[&script.policy_id]["Token"];
        assert_eq!(entry["mediaType"], "image/png");
        assert_eq!(entry["description"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mint_fungible_label() {
        let f = fixture(MockProvider::new());
        let request = MintRequest::new(
            "Coin",
            AssetMetadata::new("Coin", "ipfs://x", "image/png", "c"),
        )
        .quantity("1000")
        .label(MetadataLabel::Fungible);
        f.session.mint_asset(request).await.unwrap();
        let plan = &f.ledger.plans()[0];
        assert!(matches!(
            plan.instructions()[1],
            TxInstruction::Metadata { label: 20, .. }
        ));
    }

    #[tokio::test]
    async fn test_mint_requires_metadata_fields() {
        let f = fixture(MockProvider::new());
        let request = MintRequest::new("Token", AssetMetadata::new("Token", "ipfs://x", "", "d"));
        let err = f.session.mint_asset(request).await.unwrap_err();
        assert_eq!(err.phase(), Some("build"));
        assert!(err.to_string().contains("mediaType"));
        assert!(f.ledger.plans().is_empty());
    }

    #[tokio::test]
    async fn test_burn_requires_wallet_policy() {
        let f = fixture(MockProvider::new());
        let policy = f
            .session
            .client()
            .ledger()
            .forge_script(&wallet_address())
            .unwrap()
            .policy_id;

        f.session
            .burn_asset(format!("{policy}546f6b656e"), "1")
            .await
            .unwrap();
        assert!(matches!(
            &f.ledger.plans()[0].instructions()[0],
            TxInstruction::Burn { asset_name, quantity: 1, .. } if asset_name == "546f6b656e"
        ));

        let foreign = format!("{}546f6b656e", "f".repeat(56));
        let err = f.session.burn_asset(foreign, "1").await.unwrap_err();
        assert_eq!(err.phase(), Some("build"));
    }

    #[tokio::test]
    async fn test_register_and_stake_registers_once() {
        let f = fixture(MockProvider::new());
        f.session.register_and_stake("pool1abc").await.unwrap();
        let plan = &f.ledger.plans()[0];
        assert!(plan.registers_stake());
        assert_eq!(plan.instructions().len(), 2);

        let reward = reward_address();
        let f = fixture(MockProvider::new().with_account(registered(&reward)));
        for _ in 0..2 {
            f.session.register_and_stake("pool1abc").await.unwrap();
        }
        for plan in f.ledger.plans() {
            assert!(!plan.registers_stake());
            assert_eq!(
                plan.instructions(),
                &[TxInstruction::DelegateStake {
                    reward_address: reward.clone(),
                    pool_id: "pool1abc".into(),
                }]
            );
        }
        assert_eq!(f.provider.account_calls(), 2);
    }

    #[tokio::test]
    async fn test_stake_prefix_checked_before_network() {
        let f = fixture_with(
            MockProvider::new(),
            MockLedger::new().with_reward_address("stake1mainnetaddress"),
        );
        assert_eq!(f.session.network(), Network::Testnet);
        let err = f.session.register_and_stake("pool1abc").await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidStakeAddress {
                expected: "stake_test1",
                ..
            }
        ));
        assert_eq!(f.provider.account_calls(), 0);
    }

    #[tokio::test]
    async fn test_build_failure_stops_pipeline() {
        let f = fixture_with(
            MockProvider::new(),
            MockLedger::new().with_build_failure("insufficient funds"),
        );
        let err = f.session.send_value("addr_test1r", "5").await.unwrap_err();
        assert_eq!(err.phase(), Some("build"));
        let message = err.to_string();
        assert!(message.contains("send_value"));
        assert!(message.contains("insufficient funds"));
        assert!(f.provider.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_sign_failure_stops_pipeline() {
        let f = fixture_with(MockProvider::new(), MockLedger::new().with_sign_failure());
        let err = f.session.send_value("addr_test1r", "5").await.unwrap_err();
        assert_eq!(err.phase(), Some("sign"));
        assert!(f.provider.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_submit_failure_names_intent() {
        let f = fixture(
            MockProvider::new().with_submit_error(ProviderError::http_status(400, "BadInputs")),
        );
        let err = f.session.send_value("addr_test1r", "5").await.unwrap_err();
        assert_eq!(err.phase(), Some("submit"));
        assert!(err.to_string().contains("addr_test1r"));
        assert_eq!(f.ledger.plans().len(), 1);
    }

    #[tokio::test]
    async fn test_no_address_passes_through() {
        let f = fixture_with(MockProvider::new(), MockLedger::new().with_address_count(0));
        let err = f.session.send_value("addr_test1r", "5").await.unwrap_err();
        assert!(matches!(err, Error::NoAddress));
    }

    #[tokio::test]
    async fn test_build_uses_wallet_utxos() {
        let address = wallet_address();
        let utxo = crate::chain::Utxo {
            tx_hash: "prev".into(),
            output_index: 0,
            address: address.clone(),
            amount: vec![Amount::lovelace("5000000")],
        };
        let f = fixture(MockProvider::new().with_utxos(&address, vec![utxo]));
        let unsigned = TransactionOrchestrator::new(&f.session)
            .build(&TransactionIntent::SendValue {
                to: "addr_test1r".into(),
                lovelace: "1000000".into(),
            })
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(unsigned.as_bytes()).unwrap();
        assert_eq!(body["inputs"], 1);
    }
}
