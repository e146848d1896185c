//! JSON file persistence for a reward token, with replay protection for
//! applied envelopes.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::{ConfigError, TokenConfig},
    contract::{RewardToken, SnapshotError, TokenSnapshot},
    envelope::{CallEnvelope, DeploymentId, EnvelopeError},
    error::LedgerError,
    events::{LedgerEvent, TracingSink},
};

pub const STATE_VERSION: u32 = 2;

/// On-disk layout of the state file.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateFile {
    pub version: u32,
    pub deployment: DeploymentId,
    pub snapshot: TokenSnapshot,
    /// Hex digests of every envelope applied so far.
    pub applied: BTreeSet<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("state file rejected: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("envelope rejected: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("envelope was signed for deployment {found}, this state file is {expected}")]
    ForeignDeployment {
        expected: DeploymentId,
        found: DeploymentId,
    },
    #[error("envelope {0} was already applied")]
    DuplicateCall(String),
    #[error("state file version {0} is not supported (expected {})", STATE_VERSION)]
    UnsupportedVersion(u32),
    #[error("{} already exists, pass --force to overwrite", .0.display())]
    AlreadyExists(PathBuf),
}

/// A token bound to its state file. Changes reach the disk on [`Store::save`].
pub struct Store {
    path: PathBuf,
    deployment: DeploymentId,
    token: RewardToken,
    applied: BTreeSet<String>,
}

impl Store {
    /// Deploys a fresh token from `config` and writes it to `path`.
    pub fn init(path: impl Into<PathBuf>, config: TokenConfig, force: bool) -> Result<Self, StoreError> {
        let path = path.into();
        if path.exists() && !force {
            return Err(StoreError::AlreadyExists(path));
        }
        let mut token = RewardToken::new(config)?;
        token.subscribe(Box::new(TracingSink));
        let store = Self {
            deployment: DeploymentId::random(),
            token,
            applied: BTreeSet::new(),
            path,
        };
        store.save()?;
        info!(path = %store.path.display(), deployment = %store.deployment, "state initialized");
        Ok(store)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let file: StateFile = serde_json::from_slice(&bytes)?;
        if file.version != STATE_VERSION {
            return Err(StoreError::UnsupportedVersion(file.version));
        }
        let mut token = RewardToken::restore(file.snapshot)?;
        token.subscribe(Box::new(TracingSink));
        debug!(path = %path.display(), applied = file.applied.len(), "state loaded");
        Ok(Self {
            path,
            deployment: file.deployment,
            token,
            applied: file.applied,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The id envelopes must be sealed with to be accepted here.
    pub fn deployment(&self) -> DeploymentId {
        self.deployment
    }

    pub fn token(&self) -> &RewardToken {
        &self.token
    }

    pub fn is_applied(&self, envelope: &CallEnvelope) -> bool {
        self.applied.contains(&hex::encode(envelope.digest()))
    }

    /// Authenticates and applies one envelope. The digest is recorded only
    /// when the call succeeds, so a rejected envelope may be retried.
    pub fn apply(&mut self, envelope: CallEnvelope) -> Result<Vec<LedgerEvent>, StoreError> {
        if envelope.deployment != self.deployment {
            return Err(StoreError::ForeignDeployment {
                expected: self.deployment,
                found: envelope.deployment,
            });
        }
        let digest = hex::encode(envelope.digest());
        if self.applied.contains(&digest) {
            return Err(StoreError::DuplicateCall(digest));
        }
        let (caller, call) = envelope.open()?;
        let events = self.token.dispatch(caller, call)?;
        self.applied.insert(digest);
        Ok(events)
    }

    /// Writes the state next to the target file and renames it into place.
    pub fn save(&self) -> Result<(), StoreError> {
        let file = StateFile {
            version: STATE_VERSION,
            deployment: self.deployment,
            snapshot: self.token.snapshot(),
            applied: self.applied.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&file)?;
        let tmp = temp_path(&self.path);
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
