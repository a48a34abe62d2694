//! Flow project toolkit
//!
//! Everything the command line does apart from parsing flags and printing.
//!
//! This crate provides:
//! - [`config`]: the configuration model, its JSON format and the loader
//! - [`keys`] / [`kms`]: configured signing keys, in memory or in Google Cloud KMS
//! - [`project`]: a loaded configuration with derived deployment views
//! - [`arguments`]: `Type:Value` and JSON argument parsing
//! - [`transactions`]: the transaction builder and signer
//! - [`deploy`]: dependency-ordered contract deployment
//! - [`services`]: the operations behind each command
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flowkit::{DeploymentEngine, Loader, LocalFs, Project};
//!
//! let project = Project::load(Loader::new(Arc::new(LocalFs)), &["flow.json".into()])?;
//! let report = DeploymentEngine::new(&gateway, &project).deploy("emulator", false)?;
//! ```

#![allow(clippy::result_large_err)]

pub mod arguments;
pub mod config;
pub mod deploy;
pub mod keys;
pub mod kms;
pub mod project;
pub mod services;
pub mod transactions;

pub use config::{Config, Loader, LocalFs, MemoryFs, ReaderWriter};
pub use deploy::{ContractOutcome, DeployedContract, DeploymentEngine, DeploymentReport};
pub use keys::{AccountKey, KeyType};
pub use project::Project;
pub use services::Services;
pub use transactions::{SignerRole, TransactionBuilder};
