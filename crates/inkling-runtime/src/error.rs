#![forbid(unsafe_code)]

//! Runtime error type.

use std::fmt;
use std::io;

use crate::stream::StreamId;

/// Errors surfaced by instance operations.
///
/// Writes after unmount, double unmounts, and triggers on a detached tree are
/// absorbed silently and never produce an error.
#[derive(Debug)]
pub enum Error {
    /// The output stream rejected a write.
    Io(io::Error),
    /// Another mounted instance already owns the stream.
    StreamBusy(StreamId),
    /// The stream is owned by an instance of a different tree, renderer or
    /// stream type, so it cannot be reused for this call.
    InstanceMismatch(StreamId),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "terminal write failed: {err}"),
            Self::StreamBusy(id) => write!(f, "stream {id} is owned by another mounted instance"),
            Self::InstanceMismatch(id) => {
                write!(f, "stream {id} is owned by an instance of a different type")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Standard result type for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
