use crate::{
    account::Address,
    error::LedgerError,
    events::LedgerEvent,
    ledger::{Amount, CappedLedger},
};

/// Exchanges a caller's own tokens for a named, uninventoried item.
///
/// The engine validates the request shape only; the balance check belongs to
/// [`CappedLedger::burn`] and its error is surfaced unchanged.
pub struct RedemptionEngine<'a> {
    ledger: &'a mut CappedLedger,
    unit: Amount,
}

impl<'a> RedemptionEngine<'a> {
    pub fn new(ledger: &'a mut CappedLedger, unit: Amount) -> Self {
        Self { ledger, unit }
    }

    /// `cost` is in whole tokens. Returns the `Burn` and `GoodiePurchased`
    /// events, in that order.
    pub fn redeem(
        &mut self,
        caller: Address,
        item_name: &str,
        cost: Amount,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        if item_name.is_empty() {
            return Err(LedgerError::EmptyItemName);
        }
        if cost == 0 {
            return Err(LedgerError::ZeroCost);
        }
        // a saturated price is unaffordable by construction, burn reports it
        let burn = self.ledger.burn(caller, cost.saturating_mul(self.unit))?;
        Ok(vec![
            burn,
            LedgerEvent::GoodiePurchased {
                account: caller,
                item_name: item_name.to_string(),
                cost,
            },
        ])
    }
}
