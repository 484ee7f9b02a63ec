//! Declarative transaction plans.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ForgeScript;

/// One thing a transaction must do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxInstruction {
    /// Pay `quantity` of `unit` to `address`.
    Pay {
        /// Recipient address.
        address: String,
        /// `lovelace` or asset unit.
        unit: String,
        /// Amount in the unit's smallest denomination.
        quantity: u64,
    },
    /// Mint an asset and send it to `recipient`.
    Mint {
        /// Authorizing script.
        script: ForgeScript,
        /// Hex asset name.
        asset_name: String,
        /// Amount to mint.
        quantity: u64,
        /// Address receiving the minted tokens.
        recipient: String,
    },
    /// Burn an asset held by the wallet.
    Burn {
        /// Authorizing script.
        script: ForgeScript,
        /// Hex asset name.
        asset_name: String,
        /// Amount to destroy.
        quantity: u64,
    },
    /// Attach transaction metadata under `label`.
    Metadata {
        /// Metadata label (e.g. 721).
        label: u64,
        /// Metadata body.
        value: Value,
    },
    /// Register a stake credential.
    RegisterStake {
        /// Reward address to register.
        reward_address: String,
    },
    /// Delegate a registered stake credential to a pool.
    DelegateStake {
        /// Delegating reward address.
        reward_address: String,
        /// Bech32 or hex pool id.
        pool_id: String,
    },
}

/// Ordered instructions for one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPlan {
    instructions: Vec<TxInstruction>,
}

impl TxPlan {
    /// Start an empty plan.
    #[must_use]
    pub fn builder() -> TxPlanBuilder {
        TxPlanBuilder::default()
    }

    /// Instructions in insertion order.
    #[must_use]
    pub fn instructions(&self) -> &[TxInstruction] {
        &self.instructions
    }

    /// Whether the plan registers a stake credential.
    #[must_use]
    pub fn registers_stake(&self) -> bool {
        self.instructions
            .iter()
            .any(|i| matches!(i, TxInstruction::RegisterStake { .. }))
    }
}

/// Builder for [`TxPlan`].
#[derive(Debug, Clone, Default)]
pub struct TxPlanBuilder {
    instructions: Vec<TxInstruction>,
}

impl TxPlanBuilder {
    /// Pay lovelace to an address.
    #[must_use]
    pub fn send_value(self, address: impl Into<String>, lovelace: u64) -> Self {
        self.send_asset(address, crate::wallet::NATIVE_UNIT, lovelace)
    }

    /// Pay a quantity of an asset unit to an address.
    #[must_use]
    pub fn send_asset(
        mut self,
        address: impl Into<String>,
        unit: impl Into<String>,
        quantity: u64,
    ) -> Self {
        self.instructions.push(TxInstruction::Pay {
            address: address.into(),
            unit: unit.into(),
            quantity,
        });
        self
    }

    /// Mint tokens under `script`.
    #[must_use]
    pub fn mint(
        mut self,
        script: ForgeScript,
        asset_name: impl Into<String>,
        quantity: u64,
        recipient: impl Into<String>,
    ) -> Self {
        self.instructions.push(TxInstruction::Mint {
            script,
            asset_name: asset_name.into(),
            quantity,
            recipient: recipient.into(),
        });
        self
    }

    /// Burn tokens under `script`.
    #[must_use]
    pub fn burn(
        mut self,
        script: ForgeScript,
        asset_name: impl Into<String>,
        quantity: u64,
    ) -> Self {
        self.instructions.push(TxInstruction::Burn {
            script,
            asset_name: asset_name.into(),
            quantity,
        });
        self
    }

    /// Attach metadata.
    #[must_use]
    pub fn metadata(mut self, label: u64, value: Value) -> Self {
        self.instructions
            .push(TxInstruction::Metadata { label, value });
        self
    }

    /// Register a stake credential.
    #[must_use]
    pub fn register_stake(mut self, reward_address: impl Into<String>) -> Self {
        self.instructions.push(TxInstruction::RegisterStake {
            reward_address: reward_address.into(),
        });
        self
    }

    /// Delegate to a pool.
    #[must_use]
    pub fn delegate_stake(
        mut self,
        reward_address: impl Into<String>,
        pool_id: impl Into<String>,
    ) -> Self {
        self.instructions.push(TxInstruction::DelegateStake {
            reward_address: reward_address.into(),
            pool_id: pool_id.into(),
        });
        self
    }

    /// Finish the plan.
    #[must_use]
    pub fn build(self) -> TxPlan {
        TxPlan {
            instructions: self.instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let plan = TxPlan::builder()
            .register_stake("stake_test1u")
            .delegate_stake("stake_test1u", "pool1x")
            .build();
        assert!(plan.registers_stake());
        assert!(matches!(
            plan.instructions()[1],
            TxInstruction::DelegateStake { .. }
        ));
    }

    #[test]
    fn test_send_value_uses_native_unit() {
        let plan = TxPlan::builder().send_value("addr_test1x", 5).build();
        assert_eq!(
            plan.instructions(),
            &[TxInstruction::Pay {
                address: "addr_test1x".into(),
                unit: "lovelace".into(),
                quantity: 5,
            }]
        );
        assert!(!plan.registers_stake());
    }
}
