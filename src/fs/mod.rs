//! Asynchronous file primitives.
//!
//! Non-blocking file handles backed by the reactor, read specs for lines,
//! numbers, and byte counts, subprocess pipes, and the process-wide default
//! streams.
//!
//! Public API:
//! - [`File`]: the async file handle
//! - [`Lines`] / [`open_lines`]: line iteration
//! - [`stdin`], [`stdout`], [`stderr`]: the standard streams
//! - [`input`], [`output`] and the free read/write/flush functions for the
//!   process-wide defaults

pub mod file;
mod lines;
pub(crate) mod pool;
mod read;
mod stdio;

pub use file::{BufferMode, File};
pub use lines::{Lines, open_lines};
pub use stdio::{
    flush, input, lines, open_input, open_output, output, read_all, read_bytes, read_line,
    read_number, set_input, set_output, stderr, stdin, stdout, write,
};
