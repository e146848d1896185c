//! Governance-gated, capped reward ledger.
//!
//! The crate models a fungible token whose supply only grows through rewards
//! and only shrinks through redemptions. Every supply change is gated either
//! by a sole administrator or by a quorum of approvers:
//!
//! * [`ledger`]: capped balance store with mint/burn/transfer primitives.
//! * [`achievements`]: append-only per-account record of reward reasons.
//! * [`redemption`]: burns a caller's own tokens in exchange for a named item.
//! * [`workflow`]: submit → confirm → execute/revoke lifecycle for rewards in
//!   the multisig deployment.
//! * [`access`]: the two authorization capabilities (sole admin, approver
//!   quorum) composed into the token at construction.
//! * [`contract`]: [`RewardToken`], the composition root that owns all of the
//!   above and guarantees that every operation either fully commits or leaves
//!   no trace.
//!
//! Identity, persistence and transport live at the edges: [`envelope`] turns
//! ed25519-signed calls into authenticated callers, [`store`] keeps the token
//! state in a JSON file, and [`cli`] drives both from the command line.

pub mod access;
pub mod account;
pub mod achievements;
pub mod cli;
pub mod config;
pub mod contract;
pub mod envelope;
pub mod events;
pub mod ledger;
pub mod redemption;
pub mod store;
pub mod workflow;

mod error;

pub use account::Address;
pub use config::{ConfigError, GovernanceConfig, TokenConfig};
pub use contract::{Call, RewardToken, TokenSnapshot};
pub use envelope::{CallEnvelope, DeploymentId};
pub use error::{ErrorClass, LedgerError};
pub use events::{EventSink, LedgerEvent};
pub use ledger::{Amount, CappedLedger};
pub use store::Store;
