//! Core traits for transports and identifier generation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::protocol::{ClientEnvelope, ServerEnvelope};

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connect failed: {0}")]
    Connect(String),
    #[error("Connection closed")]
    Closed,
    #[error("Invalid envelope: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("Transport I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether the connection is still usable after this error.
    ///
    /// Only a frame that failed to decode leaves the channel intact.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Codec(_))
    }
}

/// Write half of a live connection.
///
/// Not safe for concurrent use; exactly one task owns it.
#[async_trait]
pub trait EnvelopeSink: Send {
    /// Send one envelope.
    async fn send(&mut self, envelope: &ClientEnvelope) -> Result<(), TransportError>;

    /// Close the connection. Further sends fail.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a live connection.
#[async_trait]
pub trait EnvelopeStream: Send {
    /// Receive the next envelope.
    ///
    /// Returns `TransportError::Closed` once the peer has gone away.
    async fn recv(&mut self) -> Result<ServerEnvelope, TransportError>;
}

/// A connected, bidirectional envelope channel.
pub struct Connection {
    pub sink: Box<dyn EnvelopeSink>,
    pub stream: Box<dyn EnvelopeStream>,
}

impl Connection {
    /// Assemble a connection from its two halves.
    #[must_use]
    pub fn new(sink: impl EnvelopeSink + 'static, stream: impl EnvelopeStream + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            stream: Box::new(stream),
        }
    }

    /// Split into write and read halves.
    #[must_use]
    pub fn split(self) -> (Box<dyn EnvelopeSink>, Box<dyn EnvelopeStream>) {
        (self.sink, self.stream)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Trait for establishing connections to the control server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dial the server and return a live connection.
    async fn connect(&self) -> Result<Connection, TransportError>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect(&self) -> Result<Connection, TransportError> {
        (**self).connect().await
    }
}

/// Source of fresh unique tokens for controller and command identifiers.
pub trait IdGenerator: Send + Sync {
    /// Produce a new identifier, never returned before.
    fn next_id(&self) -> String;
}
