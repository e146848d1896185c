use thiserror::Error;

use crate::{account::Address, ledger::Amount};

/// Broad family of a [`LedgerError`], used by callers to pick a response
/// (exit code, HTTP status, …) without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authorization,
    Validation,
    StateConflict,
    ResourceLimit,
}

/// Every way an operation on the reward token can be rejected.
///
/// A rejected operation never leaves partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("caller {caller} is not the administrator")]
    NotOwner { caller: Address },

    #[error("caller {caller} is not an approver")]
    NotApprover { caller: Address },

    #[error("{operation} is not available in the {variant} deployment")]
    UnsupportedOperation {
        operation: &'static str,
        variant: &'static str,
    },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("target {target} is not a valid recipient")]
    InvalidTarget { target: Address },

    #[error("item name cannot be empty")]
    EmptyItemName,

    #[error("cost must be greater than zero")]
    ZeroCost,

    #[error("reward reason cannot be empty")]
    EmptyReason,

    #[error("transaction {id} already confirmed by {caller}")]
    AlreadyConfirmedByCaller { id: u64, caller: Address },

    #[error("transaction {id} not confirmed by {caller}")]
    NotYetConfirmedByCaller { id: u64, caller: Address },

    #[error("transaction {id} already executed")]
    AlreadyExecuted { id: u64 },

    #[error("transaction {id} has {confirmations} confirmations, {required} required")]
    QuorumNotMet {
        id: u64,
        confirmations: usize,
        required: usize,
    },

    #[error("transaction {id} does not exist ({count} submitted)")]
    UnknownTransaction { id: u64, count: u64 },

    #[error("minting {amount} would exceed cap {cap} (supply {total_supply})")]
    CapExceeded {
        amount: Amount,
        total_supply: Amount,
        cap: Amount,
    },

    #[error("account {account} holds {balance}, needs {required}")]
    InsufficientBalance {
        account: Address,
        balance: Amount,
        required: Amount,
    },
}

impl LedgerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LedgerError::NotOwner { .. }
            | LedgerError::NotApprover { .. }
            | LedgerError::UnsupportedOperation { .. } => ErrorClass::Authorization,
            LedgerError::InvalidAmount
            | LedgerError::InvalidTarget { .. }
            | LedgerError::EmptyItemName
            | LedgerError::ZeroCost
            | LedgerError::EmptyReason => ErrorClass::Validation,
            LedgerError::AlreadyConfirmedByCaller { .. }
            | LedgerError::NotYetConfirmedByCaller { .. }
            | LedgerError::AlreadyExecuted { .. }
            | LedgerError::QuorumNotMet { .. }
            | LedgerError::UnknownTransaction { .. } => ErrorClass::StateConflict,
            LedgerError::CapExceeded { .. } | LedgerError::InsufficientBalance { .. } => {
                ErrorClass::ResourceLimit
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        let caller = Address::from_bytes([1; 32]);
        assert_eq!(LedgerError::NotOwner { caller }.class(), ErrorClass::Authorization);
        assert_eq!(LedgerError::ZeroCost.class(), ErrorClass::Validation);
        assert_eq!(
            LedgerError::AlreadyExecuted { id: 3 }.class(),
            ErrorClass::StateConflict
        );
        assert_eq!(
            LedgerError::CapExceeded {
                amount: 1,
                total_supply: 10,
                cap: 10
            }
            .class(),
            ErrorClass::ResourceLimit
        );
    }

    #[test]
    fn messages_carry_operands() {
        let err = LedgerError::QuorumNotMet {
            id: 0,
            confirmations: 1,
            required: 2,
        };
        assert_eq!(
            err.to_string(),
            "transaction 0 has 1 confirmations, 2 required"
        );
    }
}
