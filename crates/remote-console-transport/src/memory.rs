//! In-memory transport.
//!
//! Frames travel as JSON text over channels, so the envelope codec is
//! exercised exactly as on the wire. The server side is driven by hand,
//! which makes this the backbone of the session tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use remote_console_core::{
    ClientEnvelope, Connection, Connector, EnvelopeSink, EnvelopeStream, ServerEnvelope,
    TransportError,
};
use tokio::sync::mpsc;

/// Create a connected connector/server pair.
#[must_use]
pub fn memory_pair() -> (MemoryConnector, MemoryServer) {
    let (accept_tx, accept_rx) = mpsc::unbounded_channel();
    let connector = MemoryConnector {
        accept_tx,
        failures: AtomicUsize::new(0),
        dials: AtomicUsize::new(0),
    };
    (connector, MemoryServer { accept_rx })
}

/// Client side: each `connect` hands a fresh connection to the server.
pub struct MemoryConnector {
    accept_tx: mpsc::UnboundedSender<ServerConnection>,
    failures: AtomicUsize,
    dials: AtomicUsize,
}

impl MemoryConnector {
    /// Make the next `n` dial attempts fail.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Total dial attempts so far, failed ones included.
    #[must_use]
    pub fn dial_attempts(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (client_tx, client_rx) = mpsc::unbounded_channel();
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        self.accept_tx
            .send(ServerConnection {
                to_client: Some(server_tx),
                from_client: client_rx,
            })
            .map_err(|_| TransportError::Connect("server is gone".to_string()))?;

        Ok(Connection::new(
            MemorySink {
                tx: Some(client_tx),
            },
            MemoryStream { rx: server_rx },
        ))
    }
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl EnvelopeSink for MemorySink {
    async fn send(&mut self, envelope: &ClientEnvelope) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(envelope.to_json()?)
            .map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

struct MemoryStream {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl EnvelopeStream for MemoryStream {
    async fn recv(&mut self) -> Result<ServerEnvelope, TransportError> {
        let frame = self.rx.recv().await.ok_or(TransportError::Closed)?;
        Ok(ServerEnvelope::from_json(&frame)?)
    }
}

/// Server side: yields one `ServerConnection` per successful dial.
pub struct MemoryServer {
    accept_rx: mpsc::UnboundedReceiver<ServerConnection>,
}

impl MemoryServer {
    /// Wait for the next client connection.
    pub async fn accept(&mut self) -> Option<ServerConnection> {
        self.accept_rx.recv().await
    }
}

/// Server end of one in-memory connection.
pub struct ServerConnection {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerConnection {
    /// Push an envelope to the client. Returns false if the client is gone.
    pub fn send(&self, envelope: &ServerEnvelope) -> bool {
        envelope
            .to_json()
            .is_ok_and(|json| self.send_raw(json))
    }

    /// Push a raw text frame, valid or not.
    pub fn send_raw(&self, frame: impl Into<String>) -> bool {
        self.to_client
            .as_ref()
            .is_some_and(|tx| tx.send(frame.into()).is_ok())
    }

    /// Next envelope from the client, or `None` once it closed the
    /// connection.
    ///
    /// # Panics
    /// Panics if the client sent a frame that is not a client envelope.
    pub async fn recv(&mut self) -> Option<ClientEnvelope> {
        let frame = self.from_client.recv().await?;
        Some(ClientEnvelope::from_json(&frame).expect("client sent an invalid envelope"))
    }

    /// Next envelope if one is already queued.
    ///
    /// # Panics
    /// Panics if the client sent a frame that is not a client envelope.
    pub fn try_recv(&mut self) -> Option<ClientEnvelope> {
        let frame = self.from_client.try_recv().ok()?;
        Some(ClientEnvelope::from_json(&frame).expect("client sent an invalid envelope"))
    }

    /// Drop the connection from the server side.
    pub fn disconnect(&mut self) {
        self.to_client = None;
    }
}
