use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{account::Address, error::LedgerError, events::LedgerEvent};

/// Base-unit amount. Whole tokens are scaled by `10^decimals` before they
/// reach the ledger.
pub type Amount = u128;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("total supply {total_supply} exceeds cap {cap}")]
    SupplyAboveCap { total_supply: Amount, cap: Amount },
    #[error("balances sum to {sum}, total supply is {total_supply}")]
    SupplyMismatch { sum: Amount, total_supply: Amount },
}

/// Fungible balance store with a hard supply ceiling.
///
/// `total_supply <= cap` and `sum(balances) == total_supply` hold after every
/// call; a failing call leaves the ledger untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CappedLedger {
    cap: Amount,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
}

impl CappedLedger {
    pub fn new(cap: Amount) -> Self {
        Self {
            cap,
            total_supply: 0,
            balances: BTreeMap::new(),
        }
    }

    pub fn cap(&self) -> Amount {
        self.cap
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Accounts that have ever been touched by a balance change, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    pub fn mint(&mut self, target: Address, amount: Amount) -> Result<LedgerEvent, LedgerError> {
        if target.is_zero() {
            return Err(LedgerError::InvalidTarget { target });
        }
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .filter(|supply| *supply <= self.cap)
            .ok_or(LedgerError::CapExceeded {
                amount,
                total_supply: self.total_supply,
                cap: self.cap,
            })?;
        self.credit(&target, amount);
        self.total_supply = new_supply;
        Ok(LedgerEvent::Mint { to: target, amount })
    }

    pub fn burn(&mut self, source: Address, amount: Amount) -> Result<LedgerEvent, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.debit(&source, amount)?;
        self.total_supply -= amount;
        Ok(LedgerEvent::Burn {
            from: source,
            amount,
        })
    }

    pub fn transfer(
        &mut self,
        source: Address,
        target: Address,
        amount: Amount,
    ) -> Result<LedgerEvent, LedgerError> {
        if target.is_zero() {
            return Err(LedgerError::InvalidTarget { target });
        }
        self.debit(&source, amount)?;
        self.credit(&target, amount);
        Ok(LedgerEvent::Transfer {
            from: source,
            to: target,
            amount,
        })
    }

    fn credit(&mut self, account: &Address, amount: Amount) {
        // cannot overflow: every balance is bounded by total_supply <= cap
        *self.balances.entry(*account).or_insert(0) += amount;
    }

    fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balance_of(account);
        if balance < amount {
            return Err(LedgerError::InsufficientBalance {
                account: *account,
                balance,
                required: amount,
            });
        }
        if amount > 0 {
            self.balances.insert(*account, balance - amount);
        }
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.total_supply > self.cap {
            return Err(InvariantViolation::SupplyAboveCap {
                total_supply: self.total_supply,
                cap: self.cap,
            });
        }
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, b| acc.checked_add(*b))
            .unwrap_or(Amount::MAX);
        if sum != self.total_supply {
            return Err(InvariantViolation::SupplyMismatch {
                sum,
                total_supply: self.total_supply,
            });
        }
        Ok(())
    }

    /// Deterministic commitment over cap, supply and every balance.
    pub fn state_root(&self) -> [u8; 32] {
        let leaves: Vec<[u8; 32]> = self
            .balances
            .iter()
            .map(|(account, balance)| -> [u8; 32] {
                let mut hasher = Sha256::new();
                hasher.update(b"acct");
                hasher.update(account.as_bytes());
                hasher.update(balance.to_le_bytes());
                hasher.finalize().into()
            })
            .collect();
        let mut hasher = Sha256::new();
        hasher.update(b"ledger");
        hasher.update(self.cap.to_le_bytes());
        hasher.update(self.total_supply.to_le_bytes());
        hasher.update(build_merkle(leaves));
        hasher.finalize().into()
    }
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"altarian-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next: Vec<[u8; 32]> = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            // odd node pairs with itself
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

/// Amounts inside internally tagged enums travel as decimal strings; JSON
/// numbers above `u64::MAX` would otherwise be buffered as floats.
/// Plain integers are accepted on input so hand-written configs stay readable.
pub(crate) mod serde_amount {
    use std::fmt;

    use serde::{
        de::{Error, Visitor},
        Deserializer, Serializer,
    };

    use super::Amount;

    pub fn serialize<S>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Amount, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an unsigned amount as integer or decimal string")
            }

            fn visit_u64<E: Error>(self, v: u64) -> Result<Amount, E> {
                Ok(v as Amount)
            }

            fn visit_u128<E: Error>(self, v: u128) -> Result<Amount, E> {
                Ok(v)
            }

            fn visit_i64<E: Error>(self, v: i64) -> Result<Amount, E> {
                Amount::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
            }

            fn visit_str<E: Error>(self, v: &str) -> Result<Amount, E> {
                v.trim().parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}
