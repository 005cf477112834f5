//! Operator-facing output.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Shared writer for everything the operator sees.
///
/// Clones share one underlying writer, so the event pump and the control
/// flow never interleave partial writes.
#[derive(Clone)]
pub struct Console {
    writer: Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>,
}

impl Console {
    /// Create a console over any async writer.
    #[must_use]
    pub fn new(writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Console on the process's standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }

    /// Write text as-is and flush.
    pub async fn print(&self, text: &str) {
        let mut guard = self.writer.lock().await;
        let written = async {
            guard.write_all(text.as_bytes()).await?;
            guard.flush().await
        }
        .await;
        if let Err(e) = written {
            tracing::warn!("Failed to write to console: {e}");
        }
    }

    /// Write a line of text.
    pub async fn println(&self, text: &str) {
        self.print(&format!("{text}\n")).await;
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}
