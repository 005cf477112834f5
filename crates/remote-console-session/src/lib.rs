//! Session concurrency and reconnection engine.
//!
//! Provides:
//! - `InputSource` / `InputMultiplexer` - Single reader of the local terminal
//! - `EventPump` - Single reader of the server connection
//! - `SessionCoordinator` - One registered session, start to finish
//! - `authenticate` - Login handshake with local retry
//! - `ReconnectLoop` - Dial, log in, register, run, repeat

pub mod auth;
pub mod config;
pub mod console;
pub mod coordinator;
pub mod input;
pub mod multiplexer;
pub mod pump;
pub mod reconnect;

#[cfg(test)]
mod testing;

pub use auth::{AuthError, CredentialPrompter, Credentials, PromptError, TerminalPrompter, authenticate};
pub use config::ClientConfig;
pub use console::Console;
pub use coordinator::{SessionCoordinator, SessionOutcome};
pub use input::{InputSource, LineReader};
pub use multiplexer::InputMultiplexer;
pub use pump::{EventPump, SessionEnd};
pub use reconnect::{ReconnectLoop, RunSummary};
