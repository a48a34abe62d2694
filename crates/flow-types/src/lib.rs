//! Shared types for the flow-cli workspace.
//!
//! This crate provides the foundational types every other crate builds on:
//!
//! - [`address`] - 8-byte account addresses and chain-scoped validity
//! - [`crypto`] - signature/hash algorithms, keys and the [`Signer`](crypto::Signer) capability
//! - [`value`] - typed values and their JSON interchange encoding
//! - [`transaction`] - transactions and their canonical encoding
//! - [`models`] - accounts, blocks, collections, events and results as seen on chain
//! - [`templates`] - built-in transaction and script code
//! - [`error`] - the error kinds shared by all library crates

pub mod address;
pub mod crypto;
pub mod encoding;
pub mod env_utils;
pub mod error;
pub mod models;
pub mod templates;
pub mod transaction;
pub mod value;

pub use address::{Address, AddressGenerator, Chain};
pub use crypto::{HashAlgorithm, InMemorySigner, PrivateKey, PublicKey, SignatureAlgorithm, Signer};
pub use error::{Error, Result};
pub use models::{
    Account, AccountPublicKey, Block, BlockEvents, Collection, Event, Identifier,
    TransactionResult, TransactionStatus,
};
pub use transaction::{ProposalKey, Transaction, TransactionSignature};
pub use value::Value;
