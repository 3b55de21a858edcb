#![forbid(unsafe_code)]

//! Output streams the compositor paints on.
//!
//! Every compositor write is one [`OutputStream::write_chunk`] call carrying
//! the complete text for that operation, flushed before returning. Snapshot
//! tests rely on this: a [`CapturedStream`] records each chunk separately,
//! so "exactly one write" is observable.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::tty::IsTty;
use inkling_core::geometry::TerminalSize;

/// Identity of a physical output stream, used as the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(16);

impl StreamId {
    /// Process standard output.
    pub const STDOUT: Self = Self(1);
    /// Process standard error.
    pub const STDERR: Self = Self(2);

    /// Allocate an identity no other stream shares.
    #[must_use]
    pub fn unique() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::STDOUT => f.write_str("stdout"),
            Self::STDERR => f.write_str("stderr"),
            Self(n) => write!(f, "#{n}"),
        }
    }
}

/// A terminal-like sink the compositor writes frames to.
pub trait OutputStream: Send {
    /// Registry identity of the underlying stream.
    fn id(&self) -> StreamId;

    /// Write one chunk and flush it.
    fn write_chunk(&mut self, chunk: &str) -> io::Result<()>;

    /// Current viewport size.
    fn size(&self) -> TerminalSize;

    /// Whether the stream is attached to a terminal. Cursor visibility is
    /// only toggled on terminals.
    fn is_terminal(&self) -> bool {
        false
    }
}

impl<S: OutputStream + ?Sized> OutputStream for Box<S> {
    fn id(&self) -> StreamId {
        (**self).id()
    }

    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        (**self).write_chunk(chunk)
    }

    fn size(&self) -> TerminalSize {
        (**self).size()
    }

    fn is_terminal(&self) -> bool {
        (**self).is_terminal()
    }
}

/// Size of a process stream. Off a terminal the row count is unbounded, so
/// tall frames are never treated as overflowing a pipe or a file.
fn process_stream_size(terminal: bool) -> TerminalSize {
    if terminal {
        TerminalSize::detect().unwrap_or_default()
    } else {
        TerminalSize::unbounded(TerminalSize::FALLBACK.columns)
    }
}

/// Process standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutStream;

impl OutputStream for StdoutStream {
    fn id(&self) -> StreamId {
        StreamId::STDOUT
    }

    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(chunk.as_bytes())?;
        out.flush()
    }

    fn size(&self) -> TerminalSize {
        process_stream_size(self.is_terminal())
    }

    fn is_terminal(&self) -> bool {
        io::stdout().is_tty()
    }
}

/// Process standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrStream;

impl OutputStream for StderrStream {
    fn id(&self) -> StreamId {
        StreamId::STDERR
    }

    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        let mut err = io::stderr().lock();
        err.write_all(chunk.as_bytes())?;
        err.flush()
    }

    fn size(&self) -> TerminalSize {
        process_stream_size(self.is_terminal())
    }

    fn is_terminal(&self) -> bool {
        io::stderr().is_tty()
    }
}

/// Adapter turning any [`Write`] into an [`OutputStream`] with a fixed size.
pub struct WriterStream<W: Write + Send> {
    id: StreamId,
    inner: W,
    size: TerminalSize,
    terminal: bool,
}

impl<W: Write + Send> WriterStream<W> {
    /// Wrap `inner` with a fresh identity.
    pub fn new(inner: W, size: TerminalSize) -> Self {
        Self {
            id: StreamId::unique(),
            inner,
            size,
            terminal: false,
        }
    }

    /// Treat the writer as a terminal (enables cursor hide/show).
    #[must_use]
    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// Update the reported viewport size.
    pub fn set_size(&mut self, size: TerminalSize) {
        self.size = size;
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> OutputStream for WriterStream<W> {
    fn id(&self) -> StreamId {
        self.id
    }

    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        self.inner.write_all(chunk.as_bytes())?;
        self.inner.flush()
    }

    fn size(&self) -> TerminalSize {
        self.size
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[derive(Debug, Default)]
struct CaptureState {
    chunks: Vec<String>,
    size: Option<TerminalSize>,
}

/// In-memory stream recording every chunk separately.
///
/// Clone the [`CaptureHandle`] before handing the stream to an instance to
/// inspect what was written. Clones of the stream share its identity and
/// its recorded chunks, like two handles to the same terminal.
#[derive(Debug, Clone)]
pub struct CapturedStream {
    id: StreamId,
    state: Arc<Mutex<CaptureState>>,
    size: TerminalSize,
    terminal: bool,
}

impl CapturedStream {
    /// New capture with the given viewport size.
    #[must_use]
    pub fn new(size: TerminalSize) -> Self {
        Self {
            id: StreamId::unique(),
            state: Arc::new(Mutex::new(CaptureState::default())),
            size,
            terminal: false,
        }
    }

    /// Report the capture as a terminal.
    #[must_use]
    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// Handle for reading back the recorded chunks.
    #[must_use]
    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            id: self.id,
            state: Arc::clone(&self.state),
        }
    }
}

impl OutputStream for CapturedStream {
    fn id(&self) -> StreamId {
        self.id
    }

    fn write_chunk(&mut self, chunk: &str) -> io::Result<()> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .chunks
            .push(chunk.to_string());
        Ok(())
    }

    fn size(&self) -> TerminalSize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .size
            .unwrap_or(self.size)
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }
}

/// Read side of a [`CapturedStream`].
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    id: StreamId,
    state: Arc<Mutex<CaptureState>>,
}

impl CaptureHandle {
    /// Identity of the captured stream.
    #[must_use]
    pub fn stream_id(&self) -> StreamId {
        self.id
    }

    /// Every chunk written so far, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.lock().chunks.clone()
    }

    /// Number of write calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().chunks.len()
    }

    /// Most recent chunk.
    #[must_use]
    pub fn last_write(&self) -> Option<String> {
        self.lock().chunks.last().cloned()
    }

    /// Concatenation of every chunk.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lock().chunks.concat()
    }

    /// Forget recorded chunks.
    pub fn clear(&self) {
        self.lock().chunks.clear();
    }

    /// Simulate a terminal resize.
    pub fn resize(&self, size: TerminalSize) {
        self.lock().size = Some(size);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CaptureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
