//! End-to-end behaviour of the reward token through its public surface.

use altarian::{
    Address, Amount, CappedLedger, LedgerError, LedgerEvent, RewardToken, TokenConfig,
};

const UNIT: Amount = 1_000_000_000_000_000_000;

fn addr(b: u8) -> Address {
    Address::from_bytes([b; 32])
}

fn approvers() -> Vec<Address> {
    vec![addr(1), addr(2), addr(3)]
}

fn multisig() -> RewardToken {
    RewardToken::new(TokenConfig::multisig(approvers(), 2, 42_000_000)).unwrap()
}

fn sole_admin() -> RewardToken {
    RewardToken::new(TokenConfig::sole_admin(addr(1), 42_000_000)).unwrap()
}

fn assert_supply_invariant(token: &RewardToken) {
    let sum: Amount = token.ledger().holders().map(|(_, balance)| *balance).sum();
    assert_eq!(sum, token.total_supply());
    assert!(token.total_supply() <= token.cap());
    token.ledger().check_invariants().unwrap();
}

#[test]
fn multisig_reward_reaches_quorum_and_executes_once() {
    let mut token = multisig();
    let student = addr(9);

    let id = token.submit_transaction(addr(1), student, 50, "X").unwrap();
    assert_eq!(id, 0);
    assert_eq!(token.transaction_at(0).unwrap().num_confirmations(), 0);

    token.confirm_transaction(addr(1), 0).unwrap();
    assert_eq!(token.transaction_at(0).unwrap().num_confirmations(), 1);
    token.confirm_transaction(addr(2), 0).unwrap();
    assert_eq!(token.transaction_at(0).unwrap().num_confirmations(), 2);

    token.execute_transaction(addr(1), 0).unwrap();
    assert_eq!(token.balance_of(&student), 50 * UNIT);
    assert_eq!(token.achievements_of(&student), ["X"]);
    assert!(token.transaction_at(0).unwrap().executed);

    let supply = token.total_supply();
    let journal = token.events().len();
    assert_eq!(
        token.execute_transaction(addr(2), 0).unwrap_err(),
        LedgerError::AlreadyExecuted { id: 0 }
    );
    assert_eq!(token.total_supply(), supply);
    assert_eq!(token.events().len(), journal);
    assert_supply_invariant(&token);
}

#[test]
fn single_confirmation_does_not_meet_quorum() {
    let mut token = multisig();
    token.submit_transaction(addr(1), addr(9), 50, "X").unwrap();
    token.confirm_transaction(addr(1), 0).unwrap();
    assert_eq!(
        token.execute_transaction(addr(1), 0).unwrap_err(),
        LedgerError::QuorumNotMet {
            id: 0,
            confirmations: 1,
            required: 2
        }
    );
    assert_eq!(token.balance_of(&addr(9)), 0);
    assert!(!token.transaction_at(0).unwrap().executed);
}

#[test]
fn confirm_and_revoke_cancel_out() {
    let mut token = multisig();
    token.submit_transaction(addr(1), addr(9), 50, "X").unwrap();
    token.confirm_transaction(addr(1), 0).unwrap();
    token.confirm_transaction(addr(2), 0).unwrap();
    token.revoke_confirmation(addr(2), 0).unwrap();
    assert_eq!(token.transaction_at(0).unwrap().num_confirmations(), 1);
    assert!(!token.is_confirmed(0, &addr(2)));
    assert!(matches!(
        token.execute_transaction(addr(3), 0),
        Err(LedgerError::QuorumNotMet { .. })
    ));

    assert_eq!(
        token.confirm_transaction(addr(1), 0).unwrap_err(),
        LedgerError::AlreadyConfirmedByCaller {
            id: 0,
            caller: addr(1)
        }
    );
    assert_eq!(token.transaction_at(0).unwrap().num_confirmations(), 1);
}

#[test]
fn sole_admin_rejects_zero_amount_and_null_target() {
    let mut token = sole_admin();
    assert_eq!(
        token.reward_student(addr(1), addr(9), 0, "x").unwrap_err(),
        LedgerError::InvalidAmount
    );
    assert_eq!(
        token.reward_student(addr(1), Address::ZERO, 50, "x").unwrap_err(),
        LedgerError::InvalidTarget {
            target: Address::ZERO
        }
    );
    assert_eq!(token.total_supply(), 0);
    assert!(token.events().is_empty());
    assert!(token.achievements_of(&addr(9)).is_empty());
}

#[test]
fn mint_up_to_cap_succeeds_and_one_more_fails() {
    let mut ledger = CappedLedger::new(1_000);
    ledger.mint(addr(1), 400).unwrap();
    ledger.mint(addr(2), 600).unwrap();
    assert_eq!(ledger.total_supply(), ledger.cap());
    assert_eq!(
        ledger.mint(addr(1), 1).unwrap_err(),
        LedgerError::CapExceeded {
            amount: 1,
            total_supply: 1_000,
            cap: 1_000
        }
    );

    let mut token = RewardToken::new(TokenConfig::sole_admin(addr(1), 100).with_decimals(0)).unwrap();
    token.reward_student(addr(1), addr(9), 100, "all of it").unwrap();
    assert!(matches!(
        token.reward_student(addr(1), addr(9), 1, "one more"),
        Err(LedgerError::CapExceeded { .. })
    ));
    assert_eq!(token.achievements_of(&addr(9)), ["all of it"]);
}

#[test]
fn redemption_is_all_or_nothing() {
    let mut token = sole_admin();
    let student = addr(9);
    token.reward_student(addr(1), student, 50, "exam").unwrap();
    let supply = token.total_supply();

    assert_eq!(
        token.buy_goodies(student, "Hoodie", 51).unwrap_err(),
        LedgerError::InsufficientBalance {
            account: student,
            balance: 50 * UNIT,
            required: 51 * UNIT
        }
    );
    assert_eq!(token.balance_of(&student), 50 * UNIT);
    assert_eq!(token.total_supply(), supply);

    let cursor = token.events().len();
    token.buy_goodies(student, "T-shirt", 20).unwrap();
    assert_eq!(
        token.events_since(cursor),
        [
            LedgerEvent::Burn {
                from: student,
                amount: 20 * UNIT
            },
            LedgerEvent::GoodiePurchased {
                account: student,
                item_name: "T-shirt".into(),
                cost: 20
            },
        ]
    );
    assert_eq!(token.balance_of(&student), 30 * UNIT);
    assert_supply_invariant(&token);
}

#[test]
fn transfers_move_balances_without_touching_supply() {
    let mut token = sole_admin();
    token.reward_student(addr(1), addr(7), 10, "r").unwrap();
    let supply = token.total_supply();

    token.transfer(addr(7), addr(8), 4 * UNIT).unwrap();
    assert_eq!(token.balance_of(&addr(7)), 6 * UNIT);
    assert_eq!(token.balance_of(&addr(8)), 4 * UNIT);
    assert_eq!(token.total_supply(), supply);

    assert!(matches!(
        token.transfer(addr(8), addr(7), 5 * UNIT),
        Err(LedgerError::InsufficientBalance { .. })
    ));
    assert_eq!(
        token.transfer(addr(7), Address::ZERO, 1).unwrap_err(),
        LedgerError::InvalidTarget {
            target: Address::ZERO
        }
    );
    token.transfer(addr(7), addr(8), 0).unwrap();
    assert_supply_invariant(&token);
}

#[test]
fn genesis_allocation_counts_against_cap() {
    let config = TokenConfig::multisig(approvers(), 2, 100)
        .with_decimals(0)
        .with_genesis_allocation(30);
    let mut token = RewardToken::new(config).unwrap();
    assert_eq!(token.total_supply(), 90);
    for approver in approvers() {
        assert_eq!(token.balance_of(&approver), 30);
    }

    token.submit_transaction(addr(2), addr(9), 11, "over").unwrap();
    token.confirm_transaction(addr(1), 0).unwrap();
    token.confirm_transaction(addr(3), 0).unwrap();
    assert!(matches!(
        token.execute_transaction(addr(1), 0),
        Err(LedgerError::CapExceeded { .. })
    ));
    assert!(!token.transaction_at(0).unwrap().executed);
    assert_supply_invariant(&token);

    let over = TokenConfig::multisig(approvers(), 2, 100)
        .with_decimals(0)
        .with_genesis_allocation(34);
    assert!(RewardToken::new(over).is_err());
}

#[test]
fn many_rewards_keep_full_history() {
    let mut token = RewardToken::new(TokenConfig::sole_admin(addr(1), 1_000).with_decimals(0)).unwrap();
    for i in 0..100 {
        token.reward_student(addr(1), addr(9), 1, format!("quiz {i}")).unwrap();
    }
    assert_eq!(token.achievements_of(&addr(9)).len(), 100);
    assert_eq!(token.achievements_page(&addr(9), 98, 10), ["quiz 98", "quiz 99"]);
    assert_eq!(token.balance_of(&addr(9)), 100);
}
