//! Inter-process communication for Relay
//!
//! This crate provides the protocol and transport used between the engine
//! and its task processes. Each task process handles exactly one round
//! trip: one [`WorkerMessage::ExecuteTask`] in, one [`CoordinatorMessage`]
//! out, as newline-delimited JSON envelopes.

pub mod error;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use error::IpcError;
pub use protocol::{
    CoordinatorMessage, MessageEnvelope, TaskRequest, WorkerError, WorkerMessage,
    IPC_PROTOCOL_VERSION,
};
pub use transport::{
    read_envelope, write_envelope, ChildProcessTransport, IpcTransport, StdioTransport,
};
