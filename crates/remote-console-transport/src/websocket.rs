//! WebSocket transport to the control server.

use async_trait::async_trait;
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use remote_console_core::{
    ClientEnvelope, Connection, Connector, EnvelopeSink, EnvelopeStream, ServerEnvelope,
    TransportError,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials a fixed WebSocket endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    /// Create a connector for the given `ws://` URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The endpoint this connector dials.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        tracing::debug!(url = %self.url, "WebSocket connected");

        let (sender, receiver) = ws_stream.split();
        Ok(Connection::new(
            WsSink {
                sender,
                closed: false,
            },
            WsReceiver { receiver },
        ))
    }
}

struct WsSink {
    sender: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait]
impl EnvelopeSink for WsSink {
    async fn send(&mut self, envelope: &ClientEnvelope) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let json = envelope.to_json()?;
        self.sender
            .send(Message::Text(json))
            .await
            .map_err(map_ws_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.sender.close().await.map_err(map_ws_error)
    }
}

struct WsReceiver {
    receiver: SplitStream<WsStream>,
}

#[async_trait]
impl EnvelopeStream for WsReceiver {
    async fn recv(&mut self) -> Result<ServerEnvelope, TransportError> {
        loop {
            match self.receiver.next().await {
                Some(Ok(Message::Text(text))) => return Ok(ServerEnvelope::from_json(&text)?),
                Some(Ok(Message::Binary(data))) => return Ok(serde_json::from_slice(&data)?),
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Server closed the WebSocket");
                    return Err(TransportError::Closed);
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(map_ws_error(e)),
                None => return Err(TransportError::Closed),
            }
        }
    }
}

fn map_ws_error(error: tungstenite::Error) -> TransportError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Io(other.to_string()),
    }
}
