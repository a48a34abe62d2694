//! Subcommand implementations for the flow CLI

pub mod accounts;
pub mod blocks;
pub mod collections;
pub mod context;
pub mod emulator;
pub mod events;
pub mod keys;
pub mod output;
pub mod project;
pub mod scripts;
pub mod status;
pub mod transactions;

pub use context::{Context, GlobalArgs};
