//! Test doubles shared by the session tests.

use std::{
    io,
    pin::Pin,
    sync::{Arc, Mutex, mpsc},
    task::{Context, Poll},
    time::Duration,
};

use tokio::io::AsyncWrite;

use crate::input::{InputSource, LineReader};

/// In-memory console sink that can be inspected afterwards.
#[derive(Clone, Default)]
pub struct Transcript {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Transcript {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    /// Wait until `needle` shows up in the output.
    pub async fn wait_for(&self, needle: &str) {
        let wait = async {
            while !self.contents().contains(needle) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("{needle:?} never printed; got {:?}", self.contents()));
    }
}

impl AsyncWrite for Transcript {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        data: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Poll::Ready(Ok(data.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Operator typing lines one at a time. Dropping the sender ends input.
pub struct ChannelReader {
    rx: mpsc::Receiver<String>,
}

impl LineReader for ChannelReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.rx.recv().ok())
    }
}

/// Input source fed by hand.
pub fn typed_input() -> (InputSource, mpsc::Sender<String>) {
    let (tx, rx) = mpsc::channel();
    let source = InputSource::from_reader(ChannelReader { rx }).unwrap();
    (source, tx)
}

/// Input source over a fixed script; ends after the last line.
pub fn scripted_input(script: &str) -> InputSource {
    InputSource::from_reader(crate::input::BufLineReader::new(io::Cursor::new(
        script.to_string(),
    )))
    .unwrap()
}

/// Run a future with a generous deadline.
pub async fn within<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("timed out")
}
