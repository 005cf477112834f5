//! Transport layer for the remote console client.
//!
//! Provides:
//! - WebSocket connector (feature: websocket)
//! - In-memory connector with a scriptable server side (feature: memory)

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnector;

#[cfg(feature = "memory")]
pub use memory::{MemoryConnector, MemoryServer, ServerConnection, memory_pair};
