use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    access::{Action, ApproverQuorum},
    account::Address,
    error::LedgerError,
    events::LedgerEvent,
    ledger::Amount,
};

/// Upper bound on the approver set, one bit per approver in [`ConfirmationSet`].
pub const MAX_APPROVERS: usize = 64;

/// Confirmations of one transaction, keyed by approver slot.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConfirmationSet(u64);

impl ConfirmationSet {
    pub fn contains(&self, slot: usize) -> bool {
        slot < MAX_APPROVERS && self.0 & (1 << slot) != 0
    }

    fn insert(&mut self, slot: usize) {
        self.0 |= 1 << slot;
    }

    fn remove(&mut self, slot: usize) {
        self.0 &= !(1 << slot);
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_APPROVERS).filter(move |slot| self.contains(*slot))
    }
}

/// A proposed reward awaiting quorum.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: u64,
    pub target: Address,
    /// Whole tokens, scaled on execution.
    pub amount: Amount,
    pub reason: String,
    pub executed: bool,
    confirmations: ConfirmationSet,
}

impl Transaction {
    pub fn num_confirmations(&self) -> usize {
        self.confirmations.len()
    }

    pub fn confirmations(&self) -> ConfirmationSet {
        self.confirmations
    }
}

/// What an approved transaction asks the ledger to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardOrder {
    pub id: u64,
    pub target: Address,
    pub amount: Amount,
    pub reason: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("transaction at position {position} carries id {found}")]
    IdGap { position: usize, found: u64 },
    #[error("transaction {id} confirmed by slot {slot}, only {approvers} approvers exist")]
    ForeignConfirmation {
        id: u64,
        slot: usize,
        approvers: usize,
    },
}

/// Proposal lifecycle gating reward mints behind an approver quorum.
///
/// Transactions live in an arena indexed by their id. Quorum is evaluated at
/// execute time only, so a revoke can take a ready transaction back below
/// threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionWorkflow {
    quorum: ApproverQuorum,
    transactions: Vec<Transaction>,
}

impl TransactionWorkflow {
    pub fn new(quorum: ApproverQuorum) -> Self {
        Self {
            quorum,
            transactions: Vec::new(),
        }
    }

    /// Rebuilds a workflow from persisted transactions.
    pub fn restore(
        quorum: ApproverQuorum,
        transactions: Vec<Transaction>,
    ) -> Result<Self, HistoryError> {
        let approvers = quorum.approvers().len();
        for (position, tx) in transactions.iter().enumerate() {
            if tx.id != position as u64 {
                return Err(HistoryError::IdGap {
                    position,
                    found: tx.id,
                });
            }
            if let Some(slot) = tx.confirmations.slots().find(|slot| *slot >= approvers) {
                return Err(HistoryError::ForeignConfirmation {
                    id: tx.id,
                    slot,
                    approvers,
                });
            }
        }
        Ok(Self {
            quorum,
            transactions,
        })
    }

    pub fn quorum(&self) -> &ApproverQuorum {
        &self.quorum
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction_count(&self) -> u64 {
        self.transactions.len() as u64
    }

    pub fn transaction_at(&self, id: u64) -> Option<&Transaction> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.transactions.get(idx))
    }

    pub fn is_confirmed(&self, id: u64, approver: &Address) -> bool {
        match (self.transaction_at(id), self.quorum.index_of(approver)) {
            (Some(tx), Some(slot)) => tx.confirmations.contains(slot),
            _ => false,
        }
    }

    pub fn submit(
        &mut self,
        caller: Address,
        target: Address,
        amount: Amount,
        reason: String,
    ) -> Result<LedgerEvent, LedgerError> {
        self.quorum.check(&caller, Action::Submit)?;
        let id = self.transaction_count();
        self.transactions.push(Transaction {
            id,
            target,
            amount,
            reason: reason.clone(),
            executed: false,
            confirmations: ConfirmationSet::default(),
        });
        debug!(id, ?target, amount, "transaction submitted");
        Ok(LedgerEvent::TransactionSubmitted {
            by: caller,
            id,
            target,
            amount,
            reason,
        })
    }

    pub fn confirm(&mut self, caller: Address, id: u64) -> Result<LedgerEvent, LedgerError> {
        let slot = self.quorum.check(&caller, Action::Confirm)?;
        let tx = self.pending_mut(id)?;
        if tx.confirmations.contains(slot) {
            return Err(LedgerError::AlreadyConfirmedByCaller { id, caller });
        }
        tx.confirmations.insert(slot);
        debug!(id, confirmations = tx.num_confirmations(), "transaction confirmed");
        Ok(LedgerEvent::TransactionConfirmed { by: caller, id })
    }

    pub fn revoke(&mut self, caller: Address, id: u64) -> Result<LedgerEvent, LedgerError> {
        let slot = self.quorum.check(&caller, Action::Revoke)?;
        let tx = self.pending_mut(id)?;
        if !tx.confirmations.contains(slot) {
            return Err(LedgerError::NotYetConfirmedByCaller { id, caller });
        }
        tx.confirmations.remove(slot);
        debug!(id, confirmations = tx.num_confirmations(), "confirmation revoked");
        Ok(LedgerEvent::TransactionRevoked { by: caller, id })
    }

    /// Checks that `caller` may execute `id` right now and returns what to
    /// mint. Nothing changes until [`TransactionWorkflow::mark_executed`].
    pub fn prepare_execute(&self, caller: Address, id: u64) -> Result<RewardOrder, LedgerError> {
        self.quorum.check(&caller, Action::Execute)?;
        let tx = self.pending(id)?;
        let required = self.quorum.required();
        if tx.num_confirmations() < required {
            return Err(LedgerError::QuorumNotMet {
                id,
                confirmations: tx.num_confirmations(),
                required,
            });
        }
        Ok(RewardOrder {
            id,
            target: tx.target,
            amount: tx.amount,
            reason: tx.reason.clone(),
        })
    }

    /// Second half of execution, called once the mint has committed. The
    /// order must come from [`TransactionWorkflow::prepare_execute`] with no
    /// workflow call in between.
    pub fn mark_executed(&mut self, caller: Address, order: &RewardOrder) -> LedgerEvent {
        if let Some(tx) = self.transactions.get_mut(order.id as usize) {
            tx.executed = true;
        }
        LedgerEvent::TransactionExecuted {
            by: caller,
            id: order.id,
        }
    }

    fn pending(&self, id: u64) -> Result<&Transaction, LedgerError> {
        let count = self.transaction_count();
        let tx = self
            .transaction_at(id)
            .ok_or(LedgerError::UnknownTransaction { id, count })?;
        if tx.executed {
            return Err(LedgerError::AlreadyExecuted { id });
        }
        Ok(tx)
    }

    fn pending_mut(&mut self, id: u64) -> Result<&mut Transaction, LedgerError> {
        self.pending(id)?;
        let idx = id as usize;
        Ok(&mut self.transactions[idx])
    }
}
