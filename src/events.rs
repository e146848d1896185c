use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{account::Address, ledger::Amount};

/// One structured event per state transition.
///
/// `Transfer`, `Mint` and `Burn` carry base units. The reward, submission and
/// purchase events carry the whole-token amounts the caller supplied.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
    },
    Mint {
        to: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
    },
    Burn {
        from: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
    },
    TransactionSubmitted {
        by: Address,
        id: u64,
        target: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
        reason: String,
    },
    TransactionConfirmed {
        by: Address,
        id: u64,
    },
    TransactionRevoked {
        by: Address,
        id: u64,
    },
    TransactionExecuted {
        by: Address,
        id: u64,
    },
    RewardGiven {
        target: Address,
        #[serde(with = "crate::ledger::serde_amount")]
        amount: Amount,
        reason: String,
    },
    GoodiePurchased {
        account: Address,
        item_name: String,
        #[serde(with = "crate::ledger::serde_amount")]
        cost: Amount,
    },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::Mint { .. } => "Mint",
            LedgerEvent::Burn { .. } => "Burn",
            LedgerEvent::TransactionSubmitted { .. } => "TransactionSubmitted",
            LedgerEvent::TransactionConfirmed { .. } => "TransactionConfirmed",
            LedgerEvent::TransactionRevoked { .. } => "TransactionRevoked",
            LedgerEvent::TransactionExecuted { .. } => "TransactionExecuted",
            LedgerEvent::RewardGiven { .. } => "RewardGiven",
            LedgerEvent::GoodiePurchased { .. } => "GoodiePurchased",
        }
    }
}

/// Receives committed events, in order.
///
/// Sinks only ever see events of operations that committed; a rejected
/// operation publishes nothing.
pub trait EventSink: Send {
    fn publish(&mut self, event: &LedgerEvent);
}

impl EventSink for Vec<LedgerEvent> {
    fn publish(&mut self, event: &LedgerEvent) {
        self.push(event.clone());
    }
}

impl EventSink for Sender<LedgerEvent> {
    fn publish(&mut self, event: &LedgerEvent) {
        // a dropped receiver just means nobody is listening anymore
        let _ = self.send(event.clone());
    }
}

/// Mirrors every event into the `tracing` stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&mut self, event: &LedgerEvent) {
        info!(event = event.name(), payload = ?event, "ledger event");
    }
}
