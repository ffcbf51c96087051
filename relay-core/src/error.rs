//! Core error types for Relay

use thiserror::Error;

/// Core error type for domain-level failures
#[derive(Debug, Error)]
pub enum RelayError {
    /// An execution status string did not name a known status
    #[error("Unknown job execution status: {0}")]
    UnknownStatus(String),
}
