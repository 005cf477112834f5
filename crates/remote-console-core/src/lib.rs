//! Core abstractions for the remote console client.
//!
//! This crate provides the fundamental building blocks:
//! - `ClientEnvelope` / `ServerEnvelope` - Typed wire envelopes
//! - `Connector`, `EnvelopeSink`, `EnvelopeStream` - Transport seams
//! - `IdGenerator` - Fresh controller and command identifiers

pub mod ids;
pub mod protocol;
pub mod traits;

pub use ids::{SequentialIds, UuidGenerator};
pub use protocol::{ClientEnvelope, CommandResult, ServerEnvelope};
pub use traits::{Connection, Connector, EnvelopeSink, EnvelopeStream, IdGenerator, TransportError};
