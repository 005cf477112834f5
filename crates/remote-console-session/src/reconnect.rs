//! Top-level reconnect loop.

use std::sync::Arc;

use remote_console_core::{ClientEnvelope, Connection, Connector, IdGenerator, UuidGenerator};

use crate::{
    auth::{AuthError, CredentialPrompter, PromptError, authenticate},
    config::ClientConfig,
    console::Console,
    coordinator::SessionCoordinator,
    input::InputSource,
};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy)]
enum LoopState {
    Dialing,
    Authenticating,
    Registering,
    Active,
}

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Dial attempts that failed and were retried.
    pub dial_failures: usize,
    /// Sessions that reached the active state.
    pub sessions: usize,
}

/// Dial, log in, register, run a session, repeat.
///
/// Runs until local input is exhausted at a login prompt; every other
/// failure loops back to dialing.
pub struct ReconnectLoop<C, P> {
    connector: C,
    prompter: P,
    config: ClientConfig,
    ids: Arc<dyn IdGenerator>,
    console: Console,
}

impl<C, P> ReconnectLoop<C, P>
where
    C: Connector,
    P: CredentialPrompter,
{
    /// Create a loop printing to stdout with random identifiers.
    #[must_use]
    pub fn new(connector: C, prompter: P, config: ClientConfig) -> Self {
        Self {
            connector,
            prompter,
            config,
            ids: Arc::new(UuidGenerator),
            console: Console::stdout(),
        }
    }

    /// Use a different identifier source.
    #[must_use]
    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Print to a different console.
    #[must_use]
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Run until local input is exhausted at a login prompt.
    pub async fn run(mut self, mut input: InputSource) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            let mut connection = self.dial(&mut summary).await;

            enter(LoopState::Authenticating);
            let client_id = match authenticate(
                &mut connection,
                &mut input,
                &mut self.prompter,
                &self.console,
            )
            .await
            {
                Ok(client_id) => client_id,
                Err(AuthError::Prompt(PromptError::InputClosed)) => {
                    tracing::info!("Local input closed at login; stopping");
                    close(&mut connection).await;
                    self.console.println("\nInput closed, exiting").await;
                    return summary;
                }
                Err(AuthError::Transport(e)) => {
                    tracing::warn!("Connection lost during login: {e}");
                    self.console.println("\nConnection lost").await;
                    close(&mut connection).await;
                    continue;
                }
            };

            enter(LoopState::Registering);
            let controller_id = self.ids.next_id();
            if let Err(e) = connection
                .sink
                .send(&ClientEnvelope::register(controller_id.as_str()))
                .await
            {
                tracing::warn!("Failed to register: {e}");
                self.console.println("\nConnection lost").await;
                close(&mut connection).await;
                continue;
            }
            tracing::info!(%client_id, %controller_id, "Registered as controller");

            enter(LoopState::Active);
            summary.sessions += 1;
            self.console.print("> ").await;
            let outcome = SessionCoordinator::new(
                client_id,
                controller_id,
                Arc::clone(&self.ids),
                self.console.clone(),
            )
            .run(connection, input)
            .await;
            input = outcome.input;

            self.console.println("\nReconnecting to server...\n").await;
        }
    }

    async fn dial(&self, summary: &mut RunSummary) -> Connection {
        enter(LoopState::Dialing);
        loop {
            match self.connector.connect().await {
                Ok(connection) => {
                    self.console.println("Connected to server").await;
                    return connection;
                }
                Err(e) => {
                    summary.dial_failures += 1;
                    tracing::warn!(
                        url = %self.config.server_url,
                        "Dial failed: {e}, retrying in {}s",
                        self.config.retry_interval.as_secs()
                    );
                    self.console
                        .println(&format!(
                            "Server unavailable, retrying in {} seconds...",
                            self.config.retry_interval.as_secs()
                        ))
                        .await;
                    tokio::time::sleep(self.config.retry_interval).await;
                }
            }
        }
    }
}

fn enter(state: LoopState) {
    tracing::debug!(?state, "Reconnect loop state");
}

async fn close(connection: &mut Connection) {
    if let Err(e) = connection.sink.close().await {
        tracing::debug!("Error closing connection: {e}");
    }
}
