//! Local terminal input.
//!
//! Terminal reads block and cannot be cancelled, so they run on one
//! dedicated thread that reads only when asked. `InputSource` keeps at
//! most one request outstanding and remembers it across cancellation: if
//! the caller stops waiting, the line the operator eventually types is
//! handed to whoever reads next instead of being lost or misrouted.

use std::io::{self, BufRead, IsTerminal, Write};

use tokio::sync::{mpsc, oneshot};

/// Blocking line reader driven by the input thread.
pub trait LineReader: Send + 'static {
    /// Read one line without its line terminator. `Ok(None)` at end of input.
    ///
    /// # Errors
    /// Returns error if the underlying read fails.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Read one line that must not be echoed.
    ///
    /// # Errors
    /// Returns error if the underlying read fails.
    fn read_secret(&mut self) -> io::Result<Option<String>> {
        self.read_line()
    }
}

/// Line reader over any buffered reader.
#[derive(Debug)]
pub struct BufLineReader<R> {
    inner: R,
}

impl<R: BufRead> BufLineReader<R> {
    #[must_use]
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BufRead + Send + 'static> LineReader for BufLineReader<R> {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.inner.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(trim_line(&buf).to_string()))
    }
}

/// Process standard input. Secrets are read without echo when stdin is a
/// terminal.
#[derive(Debug)]
pub struct StdinReader {
    stdin: io::Stdin,
    interactive: bool,
}

impl StdinReader {
    #[must_use]
    pub fn new() -> Self {
        let stdin = io::stdin();
        let interactive = stdin.is_terminal();
        Self { stdin, interactive }
    }
}

impl Default for StdinReader {
    fn default() -> Self {
        Self::new()
    }
}

impl LineReader for StdinReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.stdin.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(trim_line(&buf).to_string()))
    }

    fn read_secret(&mut self) -> io::Result<Option<String>> {
        if !self.interactive {
            return self.read_line();
        }
        let secret = rpassword::read_password()?;
        // The operator's Enter was not echoed.
        let mut stdout = io::stdout();
        writeln!(stdout)?;
        stdout.flush()?;
        Ok(Some(secret))
    }
}

fn trim_line(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

#[derive(Debug, Clone, Copy)]
enum ReadKind {
    Line,
    Secret,
}

struct ReadRequest {
    kind: ReadKind,
    reply: oneshot::Sender<Option<String>>,
}

/// Handle to the input thread.
#[derive(Debug)]
pub struct InputSource {
    requests: Option<mpsc::UnboundedSender<ReadRequest>>,
    pending: Option<oneshot::Receiver<Option<String>>>,
}

impl InputSource {
    /// Read from the process's standard input.
    ///
    /// # Errors
    /// Returns error if the input thread cannot be spawned.
    pub fn stdin() -> io::Result<Self> {
        Self::from_reader(StdinReader::new())
    }

    /// Serve reads from `reader` on a dedicated thread.
    ///
    /// # Errors
    /// Returns error if the input thread cannot be spawned.
    pub fn from_reader(reader: impl LineReader) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("console-input".to_string())
            .spawn(move || serve_reads(reader, rx))?;
        Ok(Self {
            requests: Some(tx),
            pending: None,
        })
    }

    /// A source that has already reached end of input.
    #[must_use]
    pub const fn exhausted() -> Self {
        Self {
            requests: None,
            pending: None,
        }
    }

    /// Next line typed by the operator, or `None` once input has ended.
    ///
    /// Cancel safe: dropping the future keeps the read outstanding for the
    /// next call.
    pub async fn next_line(&mut self) -> Option<String> {
        self.read(ReadKind::Line).await
    }

    /// Next line read without echo.
    ///
    /// If a plain read is already outstanding, its line is returned.
    pub async fn next_secret(&mut self) -> Option<String> {
        self.read(ReadKind::Secret).await
    }

    /// Whether a read was requested and not yet delivered.
    #[must_use]
    pub const fn has_pending_read(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether input has ended for good.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.requests.is_none() && self.pending.is_none()
    }

    async fn read(&mut self, kind: ReadKind) -> Option<String> {
        if self.pending.is_none() {
            let requests = self.requests.as_ref()?;
            let (reply, rx) = oneshot::channel();
            if requests.send(ReadRequest { kind, reply }).is_err() {
                self.requests = None;
                return None;
            }
            self.pending = Some(rx);
        }

        let rx = self.pending.as_mut()?;
        let line = rx.await.ok().flatten();
        self.pending = None;
        if line.is_none() {
            tracing::debug!("Local input ended");
            self.requests = None;
        }
        line
    }
}

fn serve_reads(mut reader: impl LineReader, mut requests: mpsc::UnboundedReceiver<ReadRequest>) {
    while let Some(request) = requests.blocking_recv() {
        let read = match request.kind {
            ReadKind::Line => reader.read_line(),
            ReadKind::Secret => reader.read_secret(),
        };
        let line = read.unwrap_or_else(|e| {
            tracing::warn!("Failed to read local input: {e}");
            None
        });
        let ended = line.is_none();
        if request.reply.send(line).is_err() {
            tracing::debug!("Input reader went away before the line was delivered");
        }
        if ended {
            break;
        }
    }
}
