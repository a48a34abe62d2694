//! Error kinds shared by every library crate in the workspace.
//!
//! Each variant is a distinct tag so callers can match on the failure class;
//! messages carry the offending identifier (contract, account, address, path).

use thiserror::Error;

/// Result alias used across the workspace libraries.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("configuration not found at any of: {}", .paths.join(", "))]
    ConfigMissing { paths: Vec<String> },

    #[error("configuration {path} uses an outdated format (top-level host or inline account keys), please migrate it")]
    OutdatedFormat { path: String },

    #[error("failed to parse {subject}: {message}")]
    Parse { subject: String, message: String },

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("invalid key configuration: {0}")]
    BadKeyConfig(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("the same contract cannot be deployed to multiple accounts on the same network: {0}")]
    AmbiguousDeployment(String),

    #[error("import from {0} could not be found, make sure the contract or alias is configured")]
    UnresolvedImport(String),

    #[error("import cycle detected: {}", .0.join(" -> "))]
    ImportCycle(Vec<String>),

    #[error("target account for deploying contract {contract} not found in configuration (address {address})")]
    MissingTargetAccount { contract: String, address: String },

    #[error("signer role mismatch: {0}")]
    RoleMismatch(String),

    #[error("transaction is not ready for submission: {0}")]
    UnpreparedTransaction(String),

    #[error("transaction payload cannot change after the envelope was signed")]
    ImmutableTransaction,

    #[error("{0}")]
    Gateway(String),

    #[error("account creation transaction {0} sealed without an AccountCreated event")]
    AccountCreateFailed(String),

    #[error("failed deploying contracts: {}", .failed.join(", "))]
    DeploymentFailed { failed: Vec<String> },

    #[error("operation not supported on chain {0}")]
    UnsupportedChain(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to access {path}: {message}")]
    Io { path: String, message: String },
}

impl Error {
    pub fn parse(subject: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Error::Parse {
            subject: subject.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        Error::Io {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Wrap an upstream failure with "failed to <operation>" context.
    pub fn gateway(operation: &str, err: impl std::fmt::Display) -> Self {
        Error::Gateway(format!("failed to {}: {}", operation, err))
    }
}
