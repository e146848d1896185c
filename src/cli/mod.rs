//! Command-line driver for a reward token kept in a JSON state file.
//!
//! ```text
//! altarian [--state <FILE>] [-v] <COMMAND>
//!
//! Commands:
//!   keygen        Generate an ed25519 keypair (sk.hex / pk.hex)
//!   init          Deploy a token from a config file
//!   reward        Mint a reward directly (single administrator)
//!   reward-unit   Mint the configured reward unit (single administrator)
//!   submit        Propose a reward (multisig)
//!   confirm       Confirm a proposal (multisig)
//!   revoke        Withdraw a confirmation (multisig)
//!   execute       Execute a confirmed proposal (multisig)
//!   transfer      Move base units to another account
//!   redeem        Burn tokens for a named item
//!   apply         Apply a signed envelope produced with --sign-only
//!   balance, supply, achievements, tx, tx-count, approvers, events, verify
//! ```

mod error;
mod handler;

pub use error::{CliError, CliResult};
pub use handler::run;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{account::Address, ledger::Amount};

#[derive(Parser, Debug)]
#[command(name = "altarian")]
#[command(version)]
#[command(about = "Governance-gated capped reward ledger")]
pub struct Cli {
    /// State file holding the token
    #[arg(long, global = true, default_value = "altarian-state.json")]
    pub state: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Caller key, given inline or as a file holding the hex secret.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct KeyArgs {
    /// Secret key, 32 bytes as hex
    #[arg(long)]
    pub sk_hex: Option<String>,

    /// File containing the secret key hex (as written by `keygen`)
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SignArgs {
    #[command(flatten)]
    pub key: KeyArgs,

    /// Write the signed envelope here instead of applying it
    #[arg(long)]
    pub sign_only: Option<PathBuf>,

    /// Envelope nonce; random when omitted
    #[arg(long)]
    pub nonce: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an ed25519 keypair
    Keygen {
        #[arg(long)]
        out_dir: PathBuf,
    },

    /// Deploy a token from a JSON config
    Init {
        #[arg(long)]
        config: PathBuf,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },

    /// Reward a student directly
    Reward {
        #[arg(long)]
        target: Address,
        /// Whole tokens
        #[arg(long)]
        amount: Amount,
        #[arg(long, default_value = "")]
        reason: String,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Reward a student with the configured reward unit
    RewardUnit {
        #[arg(long)]
        target: Address,
        #[arg(long, default_value = "")]
        reason: String,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Submit a reward proposal
    Submit {
        #[arg(long)]
        target: Address,
        /// Whole tokens
        #[arg(long)]
        amount: Amount,
        #[arg(long, default_value = "")]
        reason: String,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Confirm a proposal
    Confirm {
        id: u64,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Revoke a confirmation
    Revoke {
        id: u64,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Execute a confirmed proposal
    Execute {
        id: u64,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Transfer base units
    Transfer {
        #[arg(long)]
        to: Address,
        #[arg(long)]
        amount: Amount,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Redeem tokens for an item
    Redeem {
        #[arg(long)]
        item: String,
        /// Whole tokens
        #[arg(long)]
        cost: Amount,
        #[command(flatten)]
        sign: SignArgs,
    },

    /// Apply a signed envelope file
    Apply { envelope: PathBuf },

    /// Balance of an account in base units
    Balance { account: Address },

    /// Cap, total supply and decimals
    Supply,

    /// Achievement history of an account
    Achievements {
        account: Address,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one proposal
    Tx { id: u64 },

    /// Number of proposals submitted
    TxCount,

    /// Approver set and threshold
    Approvers,

    /// Event journal
    Events {
        /// Skip the first N events
        #[arg(long, default_value_t = 0)]
        since: usize,
    },

    /// Check the state file (state root and supply invariants)
    Verify,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mutating_command_with_key() {
        let target = "11".repeat(32);
        let cli = Cli::try_parse_from([
            "altarian",
            "--state",
            "s.json",
            "submit",
            "--target",
            target.as_str(),
            "--amount",
            "50",
            "--reason",
            "exam",
            "--sk-hex",
            "00",
        ])
        .unwrap();
        assert_eq!(cli.state, PathBuf::from("s.json"));
        match cli.command {
            Commands::Submit { amount, sign, .. } => {
                assert_eq!(amount, 50);
                assert_eq!(sign.key.sk_hex.as_deref(), Some("00"));
                assert!(sign.sign_only.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn key_is_required_once() {
        assert!(Cli::try_parse_from(["altarian", "confirm", "0"]).is_err());
        assert!(Cli::try_parse_from([
            "altarian",
            "confirm",
            "0",
            "--sk-hex",
            "00",
            "--key-file",
            "k"
        ])
        .is_err());
    }

    #[test]
    fn rejects_bad_address() {
        assert!(Cli::try_parse_from(["altarian", "balance", "xyz"]).is_err());
    }
}
