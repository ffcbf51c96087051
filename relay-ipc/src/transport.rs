//! IPC transport implementations
//!
//! Both transports speak newline-delimited JSON envelopes. The read half is
//! held in a persistent `BufReader` so bytes buffered past one line are not
//! lost before the next `receive`.

use async_trait::async_trait;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};

use crate::error::IpcError;
use crate::protocol::{MessageEnvelope, IPC_PROTOCOL_VERSION};

/// IPC transport trait for different communication mechanisms
#[async_trait]
pub trait IpcTransport: Send + Sync {
    /// Send a message to the other end
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError>;

    /// Receive a message from the other end
    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), IpcError>;
}

/// Write one envelope followed by a newline and flush
pub async fn write_envelope<W, T>(
    writer: &mut W,
    message: &MessageEnvelope<T>,
) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin + Send,
    T: Serialize + Sync,
{
    let mut line = serde_json::to_vec(message)
        .map_err(|e| IpcError::SerializationError(e.to_string()))?;
    line.push(b'\n');

    trace!("Sending {} byte envelope", line.len());
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Read the next non-blank line and decode it as an envelope
pub async fn read_envelope<R, T>(reader: &mut R) -> Result<MessageEnvelope<T>, IpcError>
where
    R: AsyncBufRead + Unpin + Send,
    T: for<'de> Deserialize<'de>,
{
    let mut line = String::new();
    loop {
        line.clear();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            debug!("IPC peer closed the connection");
            return Err(IpcError::ConnectionClosed);
        }
        if !line.trim().is_empty() {
            break;
        }
    }

    trace!("Received {} byte envelope", line.len());
    let envelope: MessageEnvelope<T> = serde_json::from_str(line.trim_end()).map_err(|e| {
        warn!("Undecodable IPC message: {}", e);
        IpcError::DeserializationError(e.to_string())
    })?;

    if envelope.protocol_version != IPC_PROTOCOL_VERSION {
        warn!(
            "IPC protocol version mismatch: expected {}, got {}",
            IPC_PROTOCOL_VERSION, envelope.protocol_version
        );
        return Err(IpcError::ProtocolVersionMismatch {
            expected: IPC_PROTOCOL_VERSION,
            actual: envelope.protocol_version,
        });
    }

    Ok(envelope)
}

/// Stdin/Stdout IPC transport, used by the task process side
pub struct StdioTransport {
    stdin: BufReader<tokio::io::Stdin>,
    stdout: tokio::io::Stdout,
}

impl StdioTransport {
    /// Create a new stdio transport
    pub fn new() -> Self {
        Self {
            stdin: BufReader::new(tokio::io::stdin()),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpcTransport for StdioTransport {
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError> {
        write_envelope(&mut self.stdout, message).await
    }

    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError> {
        read_envelope(&mut self.stdin).await
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        self.stdout.flush().await?;
        Ok(())
    }
}

/// Child process transport, used by the engine to talk to a task process
pub struct ChildProcessTransport {
    stdin: Option<ChildStdin>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl ChildProcessTransport {
    /// Create a new child process transport
    pub fn new(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        Self {
            stdin: Some(stdin),
            stdout: Some(BufReader::new(stdout)),
        }
    }

    /// Close the child's stdin so it sees end of input
    pub async fn close_stdin(&mut self) -> Result<(), IpcError> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.shutdown().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl IpcTransport for ChildProcessTransport {
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError> {
        let stdin = self.stdin.as_mut().ok_or(IpcError::NotConnected)?;
        write_envelope(stdin, message).await
    }

    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError> {
        let stdout = self.stdout.as_mut().ok_or(IpcError::NotConnected)?;
        read_envelope(stdout).await
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        self.close_stdin().await?;
        self.stdout.take();
        Ok(())
    }
}
