//! MV Test Harness - Doubles and scenarios for the handoff core
//!
//! This crate provides:
//! - A recorder implementing every authority hook
//! - A registry fixture that signs and publishes directory entries
//! - A simulated parcel server answering queued handoff requests
//! - Seeded fuzzing of the authority state machine
//! - End-to-end session scenarios

pub mod fuzzer;
pub mod integration;
pub mod parcel_server;
pub mod recorder;
pub mod registry;

pub use fuzzer::*;
pub use integration::*;
pub use parcel_server::*;
pub use recorder::*;
pub use registry::*;
