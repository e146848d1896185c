use thiserror::Error;

use crate::{
    config::ConfigError,
    error::{ErrorClass, LedgerError},
    store::StoreError,
};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Not found: {what}")]
    NotFound { what: String },
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn invalid_arg(message: impl Into<String>) -> Self {
        CliError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        CliError::NotFound { what: what.into() }
    }

    /// Process exit code. Rejected token operations map by error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 1,
            CliError::InvalidArgument { .. } => 2,
            CliError::Io(_) => 5,
            CliError::Json(_) => 6,
            CliError::NotFound { .. } => 21,
            CliError::Store(err) => match err {
                StoreError::Config(_) => 1,
                StoreError::Io(_) => 5,
                StoreError::Json(_) => 6,
                StoreError::Ledger(err) => ledger_exit_code(err),
                StoreError::Envelope(_) | StoreError::ForeignDeployment { .. } => 14,
                StoreError::DuplicateCall(_) => 15,
                StoreError::Snapshot(_) | StoreError::UnsupportedVersion(_) => 20,
                StoreError::AlreadyExists(_) => 22,
            },
        }
    }
}

fn ledger_exit_code(err: &LedgerError) -> i32 {
    match err.class() {
        ErrorClass::Authorization => 10,
        ErrorClass::Validation => 11,
        ErrorClass::StateConflict => 12,
        ErrorClass::ResourceLimit => 13,
    }
}
