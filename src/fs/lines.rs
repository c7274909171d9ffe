use crate::error::Result;
use crate::fs::file::File;

/// Line cursor over a file handle.
///
/// Yields one line per call with the newline stripped, then `None` at end of
/// stream. Obtained from [`File::lines`] or [`open_lines`].
pub struct Lines {
    file: File,
}

impl Lines {
    pub(crate) fn new(file: File) -> Self {
        Self { file }
    }

    /// The next line, or `None` at end of stream.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        self.file.read_line().await
    }
}

/// Opens `path` for reading and returns a line cursor over it.
pub async fn open_lines(path: &str) -> Result<Lines> {
    Ok(Lines::new(File::open(path, "r").await?))
}
