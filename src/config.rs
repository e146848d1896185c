use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{account::Address, ledger::Amount, workflow::MAX_APPROVERS};

/// Construction-time configuration of a reward token. Immutable once the
/// token exists.
///
/// `cap`, `reward_unit` and `genesis_allocation` are whole tokens; the ledger
/// works in `10^decimals` base units per token.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenConfig {
    #[serde(with = "crate::ledger::serde_amount")]
    pub cap: Amount,
    #[serde(default = "default_decimals")]
    pub decimals: u8,
    /// Reject rewards and submissions whose reason is empty.
    #[serde(default)]
    pub require_reason: bool,
    pub governance: GovernanceConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GovernanceConfig {
    SoleAdmin {
        admin: Address,
        /// Fixed per-action reward; zero means none configured.
        #[serde(default, with = "crate::ledger::serde_amount")]
        reward_unit: Amount,
    },
    Multisig {
        approvers: Vec<Address>,
        required_confirmations: usize,
        /// Minted to every approver at construction.
        #[serde(default, with = "crate::ledger::serde_amount")]
        genesis_allocation: Amount,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cap must be greater than zero")]
    ZeroCap,
    #[error("decimals {0} exceeds the maximum of {}", TokenConfig::MAX_DECIMALS)]
    DecimalsTooLarge(u8),
    #[error("cap of {cap} tokens does not fit in base units at {decimals} decimals")]
    CapOverflow { cap: Amount, decimals: u8 },
    #[error("administrator cannot be the null address")]
    NullAdministrator,
    #[error("approver list is empty")]
    NoApprovers,
    #[error("{0} approvers configured, at most {} supported", MAX_APPROVERS)]
    TooManyApprovers(usize),
    #[error("approver list contains the null address")]
    NullApprover,
    #[error("approver {0} listed more than once")]
    DuplicateApprover(Address),
    #[error("required confirmations {required} must be within 1..={approvers}")]
    InvalidThreshold { required: usize, approvers: usize },
    #[error("genesis allocation of {per_approver} to {approvers} approvers exceeds cap {cap}")]
    GenesisExceedsCap {
        per_approver: Amount,
        approvers: usize,
        cap: Amount,
    },
    #[error("genesis allocation failed: {0}")]
    Genesis(#[from] crate::error::LedgerError),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_decimals() -> u8 {
    TokenConfig::DEFAULT_DECIMALS
}

impl TokenConfig {
    pub const DEFAULT_DECIMALS: u8 = 18;
    pub const MAX_DECIMALS: u8 = 30;

    pub fn sole_admin(admin: Address, cap: Amount) -> Self {
        Self {
            cap,
            decimals: Self::DEFAULT_DECIMALS,
            require_reason: false,
            governance: GovernanceConfig::SoleAdmin {
                admin,
                reward_unit: 0,
            },
        }
    }

    pub fn multisig(approvers: Vec<Address>, required_confirmations: usize, cap: Amount) -> Self {
        Self {
            cap,
            decimals: Self::DEFAULT_DECIMALS,
            require_reason: false,
            governance: GovernanceConfig::Multisig {
                approvers,
                required_confirmations,
                genesis_allocation: 0,
            },
        }
    }

    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn requiring_reason(mut self) -> Self {
        self.require_reason = true;
        self
    }

    /// No-op for the single-administrator variant.
    pub fn with_genesis_allocation(mut self, amount: Amount) -> Self {
        if let GovernanceConfig::Multisig {
            genesis_allocation, ..
        } = &mut self.governance
        {
            *genesis_allocation = amount;
        }
        self
    }

    /// No-op for the multisig variant.
    pub fn with_reward_unit(mut self, amount: Amount) -> Self {
        if let GovernanceConfig::SoleAdmin { reward_unit, .. } = &mut self.governance {
            *reward_unit = amount;
        }
        self
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        let config: TokenConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Base units per whole token. Only meaningful on a validated config.
    pub fn unit(&self) -> Amount {
        10u128.pow(u32::from(self.decimals.min(Self::MAX_DECIMALS)))
    }

    /// Cap in base units. Only meaningful on a validated config.
    pub fn scaled_cap(&self) -> Amount {
        self.cap.saturating_mul(self.unit())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cap == 0 {
            return Err(ConfigError::ZeroCap);
        }
        if self.decimals > Self::MAX_DECIMALS {
            return Err(ConfigError::DecimalsTooLarge(self.decimals));
        }
        if self.cap.checked_mul(self.unit()).is_none() {
            return Err(ConfigError::CapOverflow {
                cap: self.cap,
                decimals: self.decimals,
            });
        }
        match &self.governance {
            GovernanceConfig::SoleAdmin { admin, .. } => {
                if admin.is_zero() {
                    return Err(ConfigError::NullAdministrator);
                }
            }
            GovernanceConfig::Multisig {
                approvers,
                required_confirmations,
                genesis_allocation,
            } => {
                if approvers.is_empty() {
                    return Err(ConfigError::NoApprovers);
                }
                if approvers.len() > MAX_APPROVERS {
                    return Err(ConfigError::TooManyApprovers(approvers.len()));
                }
                let mut seen = BTreeSet::new();
                for approver in approvers {
                    if approver.is_zero() {
                        return Err(ConfigError::NullApprover);
                    }
                    if !seen.insert(*approver) {
                        return Err(ConfigError::DuplicateApprover(*approver));
                    }
                }
                if *required_confirmations == 0 || *required_confirmations > approvers.len() {
                    return Err(ConfigError::InvalidThreshold {
                        required: *required_confirmations,
                        approvers: approvers.len(),
                    });
                }
                let total = genesis_allocation.checked_mul(approvers.len() as Amount);
                if total.map_or(true, |total| total > self.cap) {
                    return Err(ConfigError::GenesisExceedsCap {
                        per_approver: *genesis_allocation,
                        approvers: approvers.len(),
                        cap: self.cap,
                    });
                }
            }
        }
        Ok(())
    }
}
