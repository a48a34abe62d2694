#![allow(dead_code, unused_imports)]
//! Shared helpers for the flowkit integration tests.
//!
//! - `setup`: projects in memory and an emulator seeded with the service key
//! - `mocks`: a gateway with canned responses

pub mod mocks;
pub mod setup;

pub use mocks::CannedGateway;
pub use setup::{config_with_key, emulator, memory_project, service_account, SERVICE_KEY};
