//! Domain-driven configuration management for Relay
//!
//! Configuration is split by functional domain (`execution`, `logging`),
//! loaded from YAML, overridden from `RELAY_*` environment variables and
//! validated per domain before use.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    execution::ExecutionConfig,
    logging::{LogFormat, LogLevel, LoggingConfig},
    RelayConfig,
};

// Re-export utilities
pub use domains::utils::{serde_duration, serde_duration_option};
