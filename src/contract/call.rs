use serde::{Deserialize, Serialize};

use crate::{account::Address, ledger::Amount};

/// A mutating operation on the reward token, as carried by transports.
///
/// Reward amounts and costs are whole tokens; `Transfer` moves base units.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    RewardStudent {
        target: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
        reason: String,
    },
    RewardWithUnit {
        target: Address,
        reason: String,
    },
    SubmitTransaction {
        target: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
        reason: String,
    },
    ConfirmTransaction {
        id: u64,
    },
    RevokeConfirmation {
        id: u64,
    },
    ExecuteTransaction {
        id: u64,
    },
    Transfer {
        to: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
    },
    BuyGoodies {
        item_name: String,
        #[serde(with = "crate::ledger::serde_amount")]
        cost: Amount,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::RewardStudent { .. } => "reward_student",
            Call::RewardWithUnit { .. } => "reward_with_unit",
            Call::SubmitTransaction { .. } => "submit_transaction",
            Call::ConfirmTransaction { .. } => "confirm_transaction",
            Call::RevokeConfirmation { .. } => "revoke_confirmation",
            Call::ExecuteTransaction { .. } => "execute_transaction",
            Call::Transfer { .. } => "transfer",
            Call::BuyGoodies { .. } => "buy_goodies",
        }
    }

    /// Canonical byte encoding, the input of envelope signatures.
    ///
    /// Strings are length-prefixed so adjacent fields cannot be shifted into
    /// each other.
    pub fn commitment(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        put_str(&mut buf, self.name());
        match self {
            Call::RewardStudent {
                target,
                amount,
                reason,
            }
            | Call::SubmitTransaction {
                target,
                amount,
                reason,
            } => {
                buf.extend_from_slice(target.as_bytes());
                buf.extend_from_slice(&amount.to_le_bytes());
                put_str(&mut buf, reason);
            }
            Call::RewardWithUnit { target, reason } => {
                buf.extend_from_slice(target.as_bytes());
                put_str(&mut buf, reason);
            }
            Call::ConfirmTransaction { id }
            | Call::RevokeConfirmation { id }
            | Call::ExecuteTransaction { id } => {
                buf.extend_from_slice(&id.to_le_bytes());
            }
            Call::Transfer { to, amount } => {
                buf.extend_from_slice(to.as_bytes());
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Call::BuyGoodies { item_name, cost } => {
                put_str(&mut buf, item_name);
                buf.extend_from_slice(&cost.to_le_bytes());
            }
        }
        buf
    }
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}
