//! Wire protocol between the console and the control server.
//!
//! Every frame is one JSON object discriminated by its `type` field.
//! Empty optional fields are left out of the encoded form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Role announced in the `register` envelope.
pub const CONTROLLER_ROLE: &str = "admin";

/// Envelope sent from the console to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEnvelope {
    /// Login attempt.
    Auth { client_id: String, password: String },
    /// Declare this connection as the controller of the session.
    Register { role: String, id: String },
    /// A line to execute on the remote target.
    Command {
        client_id: String,
        command_id: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        command: String,
        /// Controller identifier.
        id: String,
    },
    /// Answer to an `interactive_prompt`.
    InteractiveResponse {
        command_id: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        command: String,
        /// Controller identifier.
        id: String,
    },
}

impl ClientEnvelope {
    /// Build a `register` envelope for the given controller identifier.
    #[must_use]
    pub fn register(controller_id: impl Into<String>) -> Self {
        Self::Register {
            role: CONTROLLER_ROLE.to_string(),
            id: controller_id.into(),
        }
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from a JSON text frame.
    ///
    /// # Errors
    /// Returns error if the frame is not a known client envelope.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Envelope sent from the server to the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEnvelope {
    /// Login accepted.
    AuthOk,
    /// Login rejected.
    AuthError {
        #[serde(
            default,
            deserialize_with = "null_as_default",
            skip_serializing_if = "String::is_empty"
        )]
        error: String,
    },
    /// A running command wants input.
    InteractivePrompt {
        #[serde(default, deserialize_with = "null_as_default")]
        command_id: String,
        #[serde(default, deserialize_with = "null_as_default")]
        prompt: String,
    },
    /// Completed output for a prior command.
    Result {
        #[serde(default, deserialize_with = "null_as_default")]
        result: CommandResult,
        /// Follow-up prompt shown after the output.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    /// The remote target's session has ended.
    SessionClosed,
    /// Any envelope type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerEnvelope {
    /// Build a `result` envelope carrying only output text.
    #[must_use]
    pub fn output(output: impl Into<String>) -> Self {
        Self::Result {
            result: CommandResult {
                output: Some(Value::String(output.into())),
                extra: Map::new(),
            },
            prompt: None,
        }
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from a JSON text frame.
    ///
    /// # Errors
    /// Returns error if the frame is not valid JSON or a known type has
    /// malformed fields.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Payload of a `result` envelope.
///
/// Only `output` is interpreted; everything else the server sends is kept
/// untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Raw `output` value. Servers are not held to sending a string here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandResult {
    /// The output text, if the server sent one as a string.
    #[must_use]
    pub fn output_text(&self) -> Option<&str> {
        self.output.as_ref().and_then(Value::as_str)
    }
}

/// Read an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
