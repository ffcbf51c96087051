//! Testing utilities for relay-storage
//!
//! Mock implementations of the consumed interfaces, generated with mockall.
//!
//! ```toml
//! [dev-dependencies]
//! relay-storage = { path = "../relay-storage", features = ["testing"] }
//! ```

pub mod mocks;

pub use mocks::{MockJobBackend, MockRunnerRegistry};
