//! Flow Resolver
//!
//! Contract import resolution and deployment planning.
//!
//! This crate provides:
//! - [`parser`]: import declaration scanner for contract source
//! - [`resolver`]: rewriting of path and name imports into address imports
//! - [`planner`]: dependency graph, cycle detection and deployment order
//!
//! # Import Resolution
//!
//! Contracts in a project import each other by relative path:
//!
//! ```text
//! import NonFungibleToken from "./NonFungibleToken.cdc"
//! ```
//!
//! A node only accepts address imports, so before anything is sent each path
//! is looked up in:
//! - the deployment targets of the project's contracts on the chosen network
//! - the network's aliases (contracts that already live on chain)
//!
//! and the string location is replaced with the `0x` address.

pub mod parser;
pub mod planner;
pub mod resolver;

pub use parser::{Import, Location, Program};
pub use planner::{DeploymentPlanner, PlannedContract};
pub use resolver::{clean_path, AddressMap, ResolvedContract, Resolver};
