//! Standard streams and process-wide default input/output.
//!
//! The first use of a standard stream switches its descriptor to
//! non-blocking mode and wraps it; the fd itself is borrowed and never
//! closed by the handle. The free read/write/flush/lines functions operate
//! on process-wide defaults, initially stdin and stdout, reassignable with
//! `set_input`/`set_output` or by opening a path.

use crate::error::Result;
use crate::fs::file::File;
use crate::fs::lines::Lines;

use std::sync::{Mutex, OnceLock};

static STDIN: OnceLock<File> = OnceLock::new();
static STDOUT: OnceLock<File> = OnceLock::new();
static STDERR: OnceLock<File> = OnceLock::new();

static CURRENT_INPUT: Mutex<Option<File>> = Mutex::new(None);
static CURRENT_OUTPUT: Mutex<Option<File>> = Mutex::new(None);

/// The process's standard input as a non-blocking handle.
pub fn stdin() -> File {
    STDIN
        .get_or_init(|| File::std_stream(libc::STDIN_FILENO))
        .clone()
}

/// The process's standard output as a non-blocking handle.
pub fn stdout() -> File {
    STDOUT
        .get_or_init(|| File::std_stream(libc::STDOUT_FILENO))
        .clone()
}

/// The process's standard error as a non-blocking handle.
pub fn stderr() -> File {
    STDERR
        .get_or_init(|| File::std_stream(libc::STDERR_FILENO))
        .clone()
}

/// The current default input, initially [`stdin`].
pub fn input() -> File {
    CURRENT_INPUT
        .lock()
        .unwrap()
        .get_or_insert_with(stdin)
        .clone()
}

/// The current default output, initially [`stdout`].
pub fn output() -> File {
    CURRENT_OUTPUT
        .lock()
        .unwrap()
        .get_or_insert_with(stdout)
        .clone()
}

/// Installs `file` as the default input.
pub fn set_input(file: File) {
    *CURRENT_INPUT.lock().unwrap() = Some(file);
}

/// Installs `file` as the default output.
pub fn set_output(file: File) {
    *CURRENT_OUTPUT.lock().unwrap() = Some(file);
}

/// Opens `path` for reading and installs it as the default input.
pub async fn open_input(path: &str) -> Result<File> {
    let file = File::open(path, "r").await?;
    set_input(file.clone());

    Ok(file)
}

/// Opens `path` for writing and installs it as the default output.
pub async fn open_output(path: &str) -> Result<File> {
    let file = File::open(path, "w").await?;
    set_output(file.clone());

    Ok(file)
}

/// Reads a line from the default input.
pub async fn read_line() -> Result<Option<String>> {
    input().read_line().await
}

/// Reads a number from the default input.
pub async fn read_number() -> Result<Option<f64>> {
    input().read_number().await
}

/// Reads the default input to end of stream.
pub async fn read_all() -> Result<Option<Vec<u8>>> {
    input().read_all().await
}

/// Reads at most `n` bytes from the default input.
pub async fn read_bytes(n: usize) -> Result<Option<Vec<u8>>> {
    input().read_bytes(n).await
}

/// Writes `data` to the default output.
pub async fn write(data: impl AsRef<[u8]>) -> Result<()> {
    output().write(data).await
}

/// Flushes the default output.
pub async fn flush() -> Result<()> {
    output().flush().await
}

/// A line cursor over the default input.
pub fn lines() -> Lines {
    input().lines()
}
