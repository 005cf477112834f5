//! Server event pump.

use remote_console_core::{EnvelopeStream, ServerEnvelope, TransportError};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::console::Console;

/// Why a session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The server reported `session_closed`.
    Closed,
    /// Reading or writing the connection failed.
    Disconnected(TransportError),
}

/// Handle to a running event pump.
///
/// The pump is the only reader of the connection. It prints what the
/// server sends, reports interactive prompts by command id, and fires
/// `done` exactly once when the session is over.
#[derive(Debug)]
pub struct EventPump {
    /// Command ids of interactive prompts, in arrival order.
    pub prompts: mpsc::UnboundedReceiver<String>,
    /// Completion notification.
    pub done: oneshot::Receiver<SessionEnd>,
    task: JoinHandle<()>,
}

impl EventPump {
    /// Start pumping `stream`.
    #[must_use]
    pub fn spawn(stream: Box<dyn EnvelopeStream>, console: Console) -> Self {
        let (prompt_tx, prompts) = mpsc::unbounded_channel();
        let (done_tx, done) = oneshot::channel();
        let task = tokio::spawn(async move {
            let end = pump(stream, &console, &prompt_tx).await;
            let _ = done_tx.send(end);
        });
        Self {
            prompts,
            done,
            task,
        }
    }

    /// Stop the pump if it is still running.
    pub async fn shutdown(self) {
        self.task.abort();
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!("Event pump failed: {e}");
            }
        }
    }
}

async fn pump(
    mut stream: Box<dyn EnvelopeStream>,
    console: &Console,
    prompts: &mpsc::UnboundedSender<String>,
) -> SessionEnd {
    loop {
        let envelope = match stream.recv().await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Connection lost: {e}");
                return SessionEnd::Disconnected(e);
            }
        };

        match envelope {
            ServerEnvelope::InteractivePrompt { command_id, prompt } => {
                tracing::debug!(%command_id, "Interactive prompt");
                console.print(&prompt).await;
                if prompts.send(command_id).is_err() {
                    tracing::debug!("Prompt arrived after the session stopped listening");
                }
            }
            ServerEnvelope::Result { result, prompt } => {
                if let Some(output) = result.output_text() {
                    console.print(output).await;
                } else if result.output.is_some() {
                    tracing::debug!(output = ?result.output, "Ignoring non-text output");
                }
                if let Some(prompt) = prompt {
                    console.print(&prompt).await;
                }
            }
            ServerEnvelope::SessionClosed => {
                tracing::info!("Remote session closed");
                console.println("\nClient session ended").await;
                return SessionEnd::Closed;
            }
            other => tracing::debug!(?other, "Ignoring envelope"),
        }
    }
}
