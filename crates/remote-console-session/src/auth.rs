//! Login handshake.

use async_trait::async_trait;
use remote_console_core::{ClientEnvelope, Connection, ServerEnvelope, TransportError};
use thiserror::Error;

use crate::{console::Console, input::InputSource};

/// One login attempt's credentials.
pub struct Credentials {
    pub client_id: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Prompt error.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Local input closed")]
    InputClosed,
}

/// Trait for asking the operator who they are.
#[async_trait]
pub trait CredentialPrompter: Send {
    /// Ask for a client identifier and password.
    async fn prompt(&mut self, input: &mut InputSource) -> Result<Credentials, PromptError>;
}

/// Prompts on the console and reads the answers from local input.
#[derive(Debug, Clone)]
pub struct TerminalPrompter {
    console: Console,
}

impl TerminalPrompter {
    #[must_use]
    pub const fn new(console: Console) -> Self {
        Self { console }
    }
}

#[async_trait]
impl CredentialPrompter for TerminalPrompter {
    async fn prompt(&mut self, input: &mut InputSource) -> Result<Credentials, PromptError> {
        self.console.print("Enter connection id: ").await;
        let client_id = input.next_line().await.ok_or(PromptError::InputClosed)?;

        self.console.print("Enter password: ").await;
        let password = input.next_secret().await.ok_or(PromptError::InputClosed)?;

        Ok(Credentials {
            client_id: client_id.trim().to_string(),
            password,
        })
    }
}

/// Authentication error.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Log in on `connection`, re-prompting until the server accepts.
///
/// Rejections and undecodable replies are retried on the same connection
/// without limit. A broken connection is returned to the caller.
///
/// # Errors
/// Returns error if local input ends or the connection fails.
pub async fn authenticate(
    connection: &mut Connection,
    input: &mut InputSource,
    prompter: &mut dyn CredentialPrompter,
    console: &Console,
) -> Result<String, AuthError> {
    loop {
        let Credentials {
            client_id,
            password,
        } = prompter.prompt(input).await?;

        let attempt = ClientEnvelope::Auth {
            client_id: client_id.clone(),
            password,
        };
        let sent = connection.sink.send(&attempt).await;
        drop(attempt);
        match sent {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                console.println(&format!("Failed to send: {e}")).await;
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        match connection.stream.recv().await {
            Ok(ServerEnvelope::AuthOk) => {
                tracing::info!(%client_id, "Authenticated");
                console.println("Authentication successful").await;
                return Ok(client_id);
            }
            Ok(ServerEnvelope::AuthError { error }) => {
                tracing::debug!(%client_id, %error, "Authentication rejected");
                console.println(&format!("Authentication failed: {error}")).await;
            }
            Ok(other) => {
                tracing::debug!(?other, "Unexpected reply to auth");
                console.println("Authentication failed").await;
            }
            Err(e) if e.is_recoverable() => {
                console.println(&format!("Server error: {e}")).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
