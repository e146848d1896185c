use crate::{account::Address, error::LedgerError, ledger::Amount};

/// Privileged operations that go through access control.
///
/// `transfer` and `redeem` are not gated: any account may move or
/// spend its own balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Reward,
    Submit,
    Confirm,
    Revoke,
    Execute,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Reward => "reward",
            Action::Submit => "submit",
            Action::Confirm => "confirm",
            Action::Revoke => "revoke",
            Action::Execute => "execute",
        }
    }

    fn is_workflow(&self) -> bool {
        !matches!(self, Action::Reward)
    }
}

/// Decides whether `caller` may perform `action`.
pub trait Authorizer {
    fn authorize(&self, caller: &Address, action: Action) -> bool;
}

/// Single-administrator deployment: one account mints rewards directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoleAdmin {
    admin: Address,
    reward_unit: Option<Amount>,
}

impl SoleAdmin {
    pub const VARIANT: &'static str = "single-administrator";

    pub fn new(admin: Address, reward_unit: Option<Amount>) -> Self {
        Self { admin, reward_unit }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    /// Fixed whole-token reward for [`crate::RewardToken::reward_with_unit`].
    pub fn reward_unit(&self) -> Option<Amount> {
        self.reward_unit
    }

    pub fn check(&self, caller: &Address, action: Action) -> Result<(), LedgerError> {
        if action.is_workflow() {
            return Err(LedgerError::UnsupportedOperation {
                operation: action.name(),
                variant: Self::VARIANT,
            });
        }
        if !self.authorize(caller, action) {
            return Err(LedgerError::NotOwner { caller: *caller });
        }
        Ok(())
    }
}

impl Authorizer for SoleAdmin {
    fn authorize(&self, caller: &Address, action: Action) -> bool {
        action == Action::Reward && *caller == self.admin
    }
}

/// Multisig deployment: a fixed approver set and confirmation threshold.
///
/// The set is immutable for the lifetime of the deployment; an approver's
/// position in it is its confirmation slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApproverQuorum {
    approvers: Vec<Address>,
    required: usize,
}

impl ApproverQuorum {
    pub const VARIANT: &'static str = "multisig";

    /// Callers are expected to pass a validated approver list
    /// (see [`crate::config::TokenConfig::validate`]).
    pub fn new(approvers: Vec<Address>, required: usize) -> Self {
        Self {
            approvers,
            required,
        }
    }

    pub fn approvers(&self) -> &[Address] {
        &self.approvers
    }

    pub fn required(&self) -> usize {
        self.required
    }

    pub fn index_of(&self, caller: &Address) -> Option<usize> {
        self.approvers.iter().position(|a| a == caller)
    }

    /// On success returns the caller's confirmation slot.
    pub fn check(&self, caller: &Address, action: Action) -> Result<usize, LedgerError> {
        if !action.is_workflow() {
            return Err(LedgerError::UnsupportedOperation {
                operation: action.name(),
                variant: Self::VARIANT,
            });
        }
        self.index_of(caller)
            .ok_or(LedgerError::NotApprover { caller: *caller })
    }
}

impl Authorizer for ApproverQuorum {
    fn authorize(&self, caller: &Address, action: Action) -> bool {
        action.is_workflow() && self.index_of(caller).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 32])
    }

    #[test]
    fn sole_admin_only_rewards() {
        let admin = SoleAdmin::new(addr(1), None);
        assert!(admin.authorize(&addr(1), Action::Reward));
        assert!(!admin.authorize(&addr(2), Action::Reward));
        assert!(!admin.authorize(&addr(1), Action::Submit));

        assert_eq!(
            admin.check(&addr(2), Action::Reward).unwrap_err(),
            LedgerError::NotOwner { caller: addr(2) }
        );
        assert!(matches!(
            admin.check(&addr(1), Action::Execute),
            Err(LedgerError::UnsupportedOperation {
                operation: "execute",
                ..
            })
        ));
    }

    #[test]
    fn quorum_checks_membership() {
        let quorum = ApproverQuorum::new(vec![addr(1), addr(2), addr(3)], 2);
        assert_eq!(quorum.check(&addr(3), Action::Confirm).unwrap(), 2);
        assert_eq!(
            quorum.check(&addr(4), Action::Submit).unwrap_err(),
            LedgerError::NotApprover { caller: addr(4) }
        );
        assert!(!quorum.authorize(&addr(1), Action::Reward));
        assert!(quorum.authorize(&addr(1), Action::Revoke));
    }

    #[test]
    fn direct_reward_is_unsupported_under_multisig() {
        let quorum = ApproverQuorum::new(vec![addr(1)], 1);
        assert!(matches!(
            quorum.check(&addr(1), Action::Reward),
            Err(LedgerError::UnsupportedOperation {
                variant: "multisig",
                ..
            })
        ));
    }
}
