//! Per-session input multiplexer.

use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::input::InputSource;

/// Sole reader of the local terminal for one session.
///
/// A background task pulls lines from the `InputSource` and hands them out
/// in arrival order. A line is only taken from the source once there is
/// room to deliver it, so stopping never swallows a line the operator has
/// not typed yet.
#[derive(Debug)]
pub struct InputMultiplexer {
    lines: mpsc::Receiver<String>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<InputSource>,
}

impl InputMultiplexer {
    /// Start reading from `source`.
    #[must_use]
    pub fn start(source: InputSource) -> Self {
        let (line_tx, lines) = mpsc::channel(1);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(forward_lines(source, line_tx, stop_rx));
        Self {
            lines,
            stop: Some(stop_tx),
            task,
        }
    }

    /// Next line, or `None` once local input has ended.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Stop the reader task and take back the input source.
    ///
    /// A read still waiting on the operator stays pending on the returned
    /// source.
    pub async fn stop(mut self) -> InputSource {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.lines.close();
        while let Ok(line) = self.lines.try_recv() {
            tracing::debug!(len = line.len(), "Discarding input line typed before session end");
        }
        match self.task.await {
            Ok(source) => source,
            Err(e) => {
                tracing::error!("Input task failed: {e}");
                InputSource::exhausted()
            }
        }
    }
}

async fn forward_lines(
    mut source: InputSource,
    lines: mpsc::Sender<String>,
    mut stop: oneshot::Receiver<()>,
) -> InputSource {
    loop {
        let permit = tokio::select! {
            biased;
            _ = &mut stop => break,
            permit = lines.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let line = tokio::select! {
            biased;
            _ = &mut stop => break,
            line = source.next_line() => line,
        };

        match line {
            Some(line) => permit.send(line),
            None => break,
        }
    }
    source
}
