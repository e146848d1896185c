//! The reward token: ledger, achievement log and governance behind one
//! all-or-nothing operation surface.

mod call;
mod snapshot;

pub use call::Call;
pub use snapshot::{SnapshotError, TokenSnapshot};

use tracing::{info, warn};

use crate::{
    access::{Action, ApproverQuorum, Authorizer, SoleAdmin},
    account::Address,
    achievements::AchievementLog,
    config::{ConfigError, GovernanceConfig, TokenConfig},
    error::LedgerError,
    events::{EventSink, LedgerEvent},
    ledger::{Amount, CappedLedger},
    redemption::RedemptionEngine,
    workflow::{Transaction, TransactionWorkflow},
};

/// Who may mint rewards, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Governance {
    SoleAdmin(SoleAdmin),
    Multisig(TransactionWorkflow),
}

impl Governance {
    fn from_config(config: &GovernanceConfig) -> Self {
        match config {
            GovernanceConfig::SoleAdmin { admin, reward_unit } => Governance::SoleAdmin(
                SoleAdmin::new(*admin, (*reward_unit > 0).then_some(*reward_unit)),
            ),
            GovernanceConfig::Multisig {
                approvers,
                required_confirmations,
                ..
            } => Governance::Multisig(TransactionWorkflow::new(ApproverQuorum::new(
                approvers.clone(),
                *required_confirmations,
            ))),
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Governance::SoleAdmin(_) => SoleAdmin::VARIANT,
            Governance::Multisig(_) => ApproverQuorum::VARIANT,
        }
    }
}

impl Authorizer for Governance {
    fn authorize(&self, caller: &Address, action: Action) -> bool {
        match self {
            Governance::SoleAdmin(admin) => admin.authorize(caller, action),
            Governance::Multisig(workflow) => workflow.quorum().authorize(caller, action),
        }
    }
}

/// Capped reward ledger with achievement history and gated minting.
///
/// Every mutating method validates completely before it changes anything, so
/// a returned error means the token is exactly as it was. Events of a
/// committed operation are appended to the journal and handed to every
/// subscribed [`EventSink`], in emission order.
pub struct RewardToken {
    config: TokenConfig,
    unit: Amount,
    ledger: CappedLedger,
    achievements: AchievementLog,
    governance: Governance,
    journal: Vec<LedgerEvent>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl RewardToken {
    pub fn new(config: TokenConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut token = Self {
            unit: config.unit(),
            ledger: CappedLedger::new(config.scaled_cap()),
            achievements: AchievementLog::new(),
            governance: Governance::from_config(&config.governance),
            journal: Vec::new(),
            sinks: Vec::new(),
            config,
        };
        if let GovernanceConfig::Multisig {
            approvers,
            genesis_allocation,
            ..
        } = &token.config.governance
        {
            if *genesis_allocation > 0 {
                let per_approver = genesis_allocation * token.unit;
                let mut events = Vec::with_capacity(approvers.len());
                for approver in approvers {
                    events.push(token.ledger.mint(*approver, per_approver)?);
                }
                token.commit(events);
            }
        }
        info!(
            variant = token.governance.variant(),
            cap = token.ledger.cap(),
            supply = token.ledger.total_supply(),
            "reward token deployed"
        );
        Ok(token)
    }

    pub(crate) fn from_parts(
        config: TokenConfig,
        ledger: CappedLedger,
        achievements: AchievementLog,
        governance: Governance,
        journal: Vec<LedgerEvent>,
    ) -> Self {
        Self {
            unit: config.unit(),
            config,
            ledger,
            achievements,
            governance,
            journal,
            sinks: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    //---------------- rewards (single administrator) ----------------//

    /// Mints `amount` whole tokens to `target` and records `reason`.
    pub fn reward_student(
        &mut self,
        caller: Address,
        target: Address,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        self.reward_direct(caller, target, Some(amount), reason.into())
            .map_err(|err| rejected("reward_student", err))
    }

    /// Same as [`RewardToken::reward_student`] with the configured fixed
    /// reward unit.
    pub fn reward_with_unit(
        &mut self,
        caller: Address,
        target: Address,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        self.reward_direct(caller, target, None, reason.into())
            .map_err(|err| rejected("reward_with_unit", err))
    }

    fn reward_direct(
        &mut self,
        caller: Address,
        target: Address,
        amount: Option<Amount>,
        reason: String,
    ) -> Result<(), LedgerError> {
        let admin = match &self.governance {
            Governance::SoleAdmin(admin) => admin,
            Governance::Multisig(_) => {
                return Err(LedgerError::UnsupportedOperation {
                    operation: Action::Reward.name(),
                    variant: ApproverQuorum::VARIANT,
                })
            }
        };
        admin.check(&caller, Action::Reward)?;
        // an unset reward unit behaves like a zero amount
        let amount = amount.or(admin.reward_unit()).unwrap_or(0);
        self.check_reason(&reason)?;

        let scaled = self.scale(amount)?;
        let mint = self.ledger.mint(target, scaled)?;
        self.achievements.append(target, reason.clone());
        info!(?target, amount, %reason, "reward given");
        self.commit(vec![
            mint,
            LedgerEvent::RewardGiven {
                target,
                amount,
                reason,
            },
        ]);
        Ok(())
    }

    //---------------- multisig workflow ----------------//

    /// Queues a reward for approval and returns its id.
    pub fn submit_transaction(
        &mut self,
        caller: Address,
        target: Address,
        amount: Amount,
        reason: impl Into<String>,
    ) -> Result<u64, LedgerError> {
        let reason = reason.into();
        let require_reason = self.config.require_reason;
        let id = self.transaction_count();
        let result = self.workflow_mut(Action::Submit).and_then(|workflow| {
            workflow.quorum().check(&caller, Action::Submit)?;
            if require_reason && reason.is_empty() {
                return Err(LedgerError::EmptyReason);
            }
            workflow.submit(caller, target, amount, reason)
        });
        let event = result.map_err(|err| rejected("submit_transaction", err))?;
        info!(id, ?caller, "transaction submitted");
        self.commit(vec![event]);
        Ok(id)
    }

    pub fn confirm_transaction(&mut self, caller: Address, id: u64) -> Result<(), LedgerError> {
        let event = self
            .workflow_mut(Action::Confirm)
            .and_then(|workflow| workflow.confirm(caller, id))
            .map_err(|err| rejected("confirm_transaction", err))?;
        info!(id, ?caller, "transaction confirmed");
        self.commit(vec![event]);
        Ok(())
    }

    pub fn revoke_confirmation(&mut self, caller: Address, id: u64) -> Result<(), LedgerError> {
        let event = self
            .workflow_mut(Action::Revoke)
            .and_then(|workflow| workflow.revoke(caller, id))
            .map_err(|err| rejected("revoke_confirmation", err))?;
        info!(id, ?caller, "confirmation revoked");
        self.commit(vec![event]);
        Ok(())
    }

    /// Mints the approved reward, marks the transaction executed and records
    /// the achievement. A failing mint leaves the transaction pending.
    pub fn execute_transaction(&mut self, caller: Address, id: u64) -> Result<(), LedgerError> {
        self.execute(caller, id)
            .map_err(|err| rejected("execute_transaction", err))
    }

    fn execute(&mut self, caller: Address, id: u64) -> Result<(), LedgerError> {
        let order = self.workflow_mut(Action::Execute)?.prepare_execute(caller, id)?;
        let scaled = self.scale(order.amount)?;
        let mint = self.ledger.mint(order.target, scaled)?;
        let executed = self.workflow_mut(Action::Execute)?.mark_executed(caller, &order);
        self.achievements.append(order.target, order.reason.clone());
        info!(id, target = ?order.target, amount = order.amount, "transaction executed");
        self.commit(vec![
            mint,
            executed,
            LedgerEvent::RewardGiven {
                target: order.target,
                amount: order.amount,
                reason: order.reason,
            },
        ]);
        Ok(())
    }

    //---------------- holder operations ----------------//

    /// Moves `amount` base units from the caller to `to`.
    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        let event = self
            .ledger
            .transfer(caller, to, amount)
            .map_err(|err| rejected("transfer", err))?;
        info!(from = ?caller, ?to, amount, "transfer");
        self.commit(vec![event]);
        Ok(())
    }

    /// Burns `cost` whole tokens from the caller for `item_name`.
    pub fn buy_goodies(&mut self, caller: Address, item_name: &str, cost: Amount) -> Result<(), LedgerError> {
        let events = RedemptionEngine::new(&mut self.ledger, self.unit)
            .redeem(caller, item_name, cost)
            .map_err(|err| rejected("buy_goodies", err))?;
        info!(?caller, item_name, cost, "goodie purchased");
        self.commit(events);
        Ok(())
    }

    /// Applies `call` on behalf of an already authenticated `caller` and
    /// returns the events it emitted.
    pub fn dispatch(&mut self, caller: Address, call: Call) -> Result<Vec<LedgerEvent>, LedgerError> {
        let cursor = self.journal.len();
        match call {
            Call::RewardStudent {
                target,
                amount,
                reason,
            } => self.reward_student(caller, target, amount, reason)?,
            Call::RewardWithUnit { target, reason } => self.reward_with_unit(caller, target, reason)?,
            Call::SubmitTransaction {
                target,
                amount,
                reason,
            } => {
                self.submit_transaction(caller, target, amount, reason)?;
            }
            Call::ConfirmTransaction { id } => self.confirm_transaction(caller, id)?,
            Call::RevokeConfirmation { id } => self.revoke_confirmation(caller, id)?,
            Call::ExecuteTransaction { id } => self.execute_transaction(caller, id)?,
            Call::Transfer { to, amount } => self.transfer(caller, to, amount)?,
            Call::BuyGoodies { item_name, cost } => self.buy_goodies(caller, &item_name, cost)?,
        }
        Ok(self.events_since(cursor).to_vec())
    }

    //---------------- queries ----------------//

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    pub fn ledger(&self) -> &CappedLedger {
        &self.ledger
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.ledger.balance_of(account)
    }

    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    pub fn cap(&self) -> Amount {
        self.ledger.cap()
    }

    pub fn decimals(&self) -> u8 {
        self.config.decimals
    }

    /// Base units per whole token.
    pub fn unit(&self) -> Amount {
        self.unit
    }

    pub fn achievements_of(&self, account: &Address) -> &[String] {
        self.achievements.list_of(account)
    }

    pub fn achievements_page(&self, account: &Address, offset: usize, limit: usize) -> &[String] {
        self.achievements.page_of(account, offset, limit)
    }

    pub fn achievements(&self) -> &AchievementLog {
        &self.achievements
    }

    pub fn transaction_count(&self) -> u64 {
        self.workflow().map_or(0, TransactionWorkflow::transaction_count)
    }

    pub fn transaction_at(&self, id: u64) -> Option<&Transaction> {
        self.workflow().and_then(|workflow| workflow.transaction_at(id))
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.workflow()
            .map(TransactionWorkflow::transactions)
            .unwrap_or_default()
    }

    pub fn is_confirmed(&self, id: u64, approver: &Address) -> bool {
        self.workflow()
            .map_or(false, |workflow| workflow.is_confirmed(id, approver))
    }

    /// Approver set; empty for the single-administrator variant.
    pub fn approvers(&self) -> &[Address] {
        self.workflow()
            .map(|workflow| workflow.quorum().approvers())
            .unwrap_or_default()
    }

    pub fn owners(&self) -> &[Address] {
        self.approvers()
    }

    pub fn required_confirmations(&self) -> Option<usize> {
        self.workflow().map(|workflow| workflow.quorum().required())
    }

    pub fn administrator(&self) -> Option<Address> {
        match &self.governance {
            Governance::SoleAdmin(admin) => Some(admin.admin()),
            Governance::Multisig(_) => None,
        }
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.journal
    }

    /// Events appended after the first `cursor` ones.
    pub fn events_since(&self, cursor: usize) -> &[LedgerEvent] {
        &self.journal[cursor.min(self.journal.len())..]
    }

    //---------------- internals ----------------//

    fn workflow(&self) -> Option<&TransactionWorkflow> {
        match &self.governance {
            Governance::Multisig(workflow) => Some(workflow),
            Governance::SoleAdmin(_) => None,
        }
    }

    fn workflow_mut(&mut self, action: Action) -> Result<&mut TransactionWorkflow, LedgerError> {
        match &mut self.governance {
            Governance::Multisig(workflow) => Ok(workflow),
            Governance::SoleAdmin(_) => Err(LedgerError::UnsupportedOperation {
                operation: action.name(),
                variant: SoleAdmin::VARIANT,
            }),
        }
    }

    fn check_reason(&self, reason: &str) -> Result<(), LedgerError> {
        if self.config.require_reason && reason.is_empty() {
            return Err(LedgerError::EmptyReason);
        }
        Ok(())
    }

    /// Whole tokens to base units. Anything that overflows `u128` is over the cap.
    fn scale(&self, amount: Amount) -> Result<Amount, LedgerError> {
        amount
            .checked_mul(self.unit)
            .ok_or(LedgerError::CapExceeded {
                amount: Amount::MAX,
                total_supply: self.ledger.total_supply(),
                cap: self.ledger.cap(),
            })
    }

    fn commit(&mut self, events: Vec<LedgerEvent>) {
        for event in &events {
            for sink in self.sinks.iter_mut() {
                sink.publish(event);
            }
        }
        self.journal.extend(events);
    }
}

fn rejected(operation: &'static str, err: LedgerError) -> LedgerError {
    warn!(operation, class = ?err.class(), %err, "operation rejected");
    err
}
