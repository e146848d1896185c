use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Governance, RewardToken};
use crate::{
    achievements::AchievementLog,
    config::{ConfigError, GovernanceConfig, TokenConfig},
    events::LedgerEvent,
    ledger::{Amount, CappedLedger, InvariantViolation},
    workflow::{HistoryError, Transaction, TransactionWorkflow},
};

/// Complete, serializable token state.
///
/// `state_root` commits to everything except the event journal, which is an
/// append-only history rather than state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub config: TokenConfig,
    pub ledger: CappedLedger,
    pub achievements: AchievementLog,
    pub transactions: Vec<Transaction>,
    pub events: Vec<LedgerEvent>,
    #[serde(with = "hex_root")]
    pub state_root: [u8; 32],
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot config is invalid: {0}")]
    Config(#[from] ConfigError),
    #[error("snapshot ledger is inconsistent: {0}")]
    Invariant(#[from] InvariantViolation),
    #[error("snapshot transactions are inconsistent: {0}")]
    History(#[from] HistoryError),
    #[error("ledger cap {found} does not match configured cap {expected}")]
    CapMismatch { expected: Amount, found: Amount },
    #[error("single-administrator snapshot carries {0} transactions")]
    UnexpectedTransactions(usize),
    #[error("state root mismatch: recorded {recorded}, computed {computed}")]
    RootMismatch { recorded: String, computed: String },
}

impl RewardToken {
    pub fn snapshot(&self) -> TokenSnapshot {
        let transactions = self.transactions().to_vec();
        TokenSnapshot {
            state_root: compute_state_root(&self.config, &self.ledger, &self.achievements, &transactions),
            config: self.config.clone(),
            ledger: self.ledger.clone(),
            achievements: self.achievements.clone(),
            transactions,
            events: self.journal.clone(),
        }
    }

    /// Rebuilds a token from a snapshot after checking config, supply
    /// invariants, transaction history and the state root.
    pub fn restore(snapshot: TokenSnapshot) -> Result<Self, SnapshotError> {
        let TokenSnapshot {
            config,
            ledger,
            achievements,
            transactions,
            events,
            state_root,
        } = snapshot;

        config.validate()?;
        if ledger.cap() != config.scaled_cap() {
            return Err(SnapshotError::CapMismatch {
                expected: config.scaled_cap(),
                found: ledger.cap(),
            });
        }
        ledger.check_invariants()?;

        let computed = compute_state_root(&config, &ledger, &achievements, &transactions);
        if computed != state_root {
            return Err(SnapshotError::RootMismatch {
                recorded: hex::encode(state_root),
                computed: hex::encode(computed),
            });
        }

        let governance = match Governance::from_config(&config.governance) {
            Governance::Multisig(workflow) => Governance::Multisig(TransactionWorkflow::restore(
                workflow.quorum().clone(),
                transactions,
            )?),
            Governance::SoleAdmin(admin) => {
                if !transactions.is_empty() {
                    return Err(SnapshotError::UnexpectedTransactions(transactions.len()));
                }
                Governance::SoleAdmin(admin)
            }
        };

        Ok(RewardToken::from_parts(config, ledger, achievements, governance, events))
    }

    /// Commitment over the current state, see [`TokenSnapshot::state_root`].
    pub fn state_root(&self) -> [u8; 32] {
        compute_state_root(&self.config, &self.ledger, &self.achievements, self.transactions())
    }
}

fn compute_state_root(
    config: &TokenConfig,
    ledger: &CappedLedger,
    achievements: &AchievementLog,
    transactions: &[Transaction],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"altarian-state-v1");

    hasher.update(config.cap.to_le_bytes());
    hasher.update([config.decimals, config.require_reason as u8]);
    match &config.governance {
        GovernanceConfig::SoleAdmin { admin, reward_unit } => {
            hasher.update(b"sole_admin");
            hasher.update(admin.as_bytes());
            hasher.update(reward_unit.to_le_bytes());
        }
        GovernanceConfig::Multisig {
            approvers,
            required_confirmations,
            genesis_allocation,
        } => {
            hasher.update(b"multisig");
            hasher.update((approvers.len() as u64).to_le_bytes());
            for approver in approvers {
                hasher.update(approver.as_bytes());
            }
            hasher.update((*required_confirmations as u64).to_le_bytes());
            hasher.update(genesis_allocation.to_le_bytes());
        }
    }

    hasher.update(ledger.state_root());

    for (account, reasons) in achievements.iter() {
        hasher.update(b"ach");
        hasher.update(account.as_bytes());
        hasher.update((reasons.len() as u64).to_le_bytes());
        for reason in reasons {
            put_str(&mut hasher, reason);
        }
    }

    for tx in transactions {
        hasher.update(b"tx");
        hasher.update(tx.id.to_le_bytes());
        hasher.update(tx.target.as_bytes());
        hasher.update(tx.amount.to_le_bytes());
        put_str(&mut hasher, &tx.reason);
        hasher.update([tx.executed as u8]);
        for slot in tx.confirmations().slots() {
            hasher.update((slot as u64).to_le_bytes());
        }
        hasher.update((tx.num_confirmations() as u64).to_le_bytes());
    }

    hasher.finalize().into()
}

fn put_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

mod hex_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(&encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| D::Error::custom("state root must be 32 bytes"))
    }
}
