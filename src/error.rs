//! Crate error type for file operations.
//!
//! Would-block conditions are never surfaced; they are converted into
//! suspensions by the yield primitives. Everything else is reported to the
//! caller verbatim, carrying the OS error where one exists.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`File`](crate::fs::File) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening a path failed. Displays as `<path>: <os error>`.
    #[error("{path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The handle was closed by an earlier `close` call.
    #[error("attempt to use a closed file")]
    Closed,

    /// Refusal to close a descriptor other tasks are still parked on.
    #[error("file descriptor {0} has tasks parked on it")]
    Parked(i32),

    /// Any other OS-level I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// True when the error is the closed-handle error.
    pub fn is_closed(&self) -> bool {
        matches!(self, Error::Closed)
    }
}
