//! Flow Transport Layer
//!
//! Gateways to a Flow node, all behind the one [`Gateway`] trait.
//!
//! This crate provides:
//! - [`remote`]: blocking client for an access node's REST API
//! - [`emulator`]: an in-process ledger for tests and offline use
//! - [`network`]: well-known hosts and REST endpoint resolution
//!
//! # Example
//!
//! ```ignore
//! use flow_transport::{Gateway, RemoteGateway};
//!
//! let gateway = RemoteGateway::new("access.devnet.nodes.onflow.org:9000");
//! let block = gateway.get_latest_block()?;
//! ```

pub mod emulator;
pub mod gateway;
pub mod network;
pub mod remote;

pub use emulator::EmulatorGateway;
pub use gateway::Gateway;
pub use remote::{RemoteGateway, RemoteSettings};
