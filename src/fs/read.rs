//! Read operations on [`File`]: fixed-length, read-all, line, and number.
//!
//! All four share one structure: consume the handle's lookahead first, then
//! refill it from the descriptor through a pooled scratch buffer, suspending
//! on would-block. Lookahead that an operation does not consume stays
//! buffered for the next one, so `read_number` on `"42.5 foo"` leaves
//! `" foo"` for a following `read_line`.

use crate::error::Result;
use crate::fs::file::{File, raw_read, would_block};
use crate::fs::pool;
use crate::reactor::future::readable;

use std::os::unix::io::RawFd;

/// Outcome of one refill attempt.
enum Fill {
    /// New bytes were appended to the lookahead.
    Data,
    Eof,
    Wait(RawFd),
}

/// Progress of the number scanner over the current lookahead.
enum Scan {
    /// A number token of `len` bytes evaluating to the value.
    Complete(usize, f64),

    /// The token runs to the end of the lookahead; more input could extend it.
    NeedMore,

    /// The next input is not a number.
    NoNumber,
}

impl File {
    /// Reads at most `n` bytes, fewer only at end of stream.
    ///
    /// Returns `None` when the stream is at EOF and nothing was read.
    pub async fn read_bytes(&self, n: usize) -> Result<Option<Vec<u8>>> {
        let mut out = self.with_inner(|inner| {
            inner.require_fd()?;
            Ok::<_, crate::error::Error>(inner.consume(n))
        })?;

        while out.len() < n {
            if !self.fill().await? {
                break;
            }

            let more = self.with_inner(|inner| inner.consume(n - out.len()));
            out.extend_from_slice(&more);
        }

        if out.is_empty() && n > 0 {
            return Ok(None);
        }

        Ok(Some(out))
    }

    /// Reads everything up to end of stream.
    ///
    /// Returns `None` when the stream was already at EOF.
    pub async fn read_all(&self) -> Result<Option<Vec<u8>>> {
        let mut out = self.with_inner(|inner| {
            inner.require_fd()?;
            Ok::<_, crate::error::Error>(inner.consume(usize::MAX))
        })?;

        while self.fill().await? {
            let more = self.with_inner(|inner| inner.consume(usize::MAX));
            out.extend_from_slice(&more);
        }

        if out.is_empty() {
            return Ok(None);
        }

        Ok(Some(out))
    }

    /// Reads one line, with the terminating newline stripped.
    ///
    /// A final line without a terminator is returned as-is. Returns `None`
    /// at end of stream. Invalid UTF-8 is replaced lossily.
    pub async fn read_line(&self) -> Result<Option<String>> {
        let mut acc: Vec<u8> = Vec::new();

        loop {
            let line = self.with_inner(|inner| {
                inner.require_fd()?;

                if let Some(mut chunk) = inner.consume_through_newline() {
                    chunk.pop();
                    return Ok::<_, crate::error::Error>(Some(chunk));
                }

                acc.extend_from_slice(&inner.consume(usize::MAX));
                Ok(None)
            })?;

            if let Some(chunk) = line {
                acc.extend_from_slice(&chunk);
                return Ok(Some(String::from_utf8_lossy(&acc).into_owned()));
            }

            if !self.fill().await? {
                if acc.is_empty() {
                    return Ok(None);
                }

                return Ok(Some(String::from_utf8_lossy(&acc).into_owned()));
            }
        }
    }

    /// Reads one number in `fscanf("%lf")` fashion: leading whitespace is
    /// skipped, then the longest valid decimal/exponent token is consumed.
    ///
    /// Returns `None` when the next input is not a number (the offending
    /// bytes stay buffered) or the stream is at EOF.
    pub async fn read_number(&self) -> Result<Option<f64>> {
        // Skip whitespace, refilling as needed.
        loop {
            let has_input = self.with_inner(|inner| {
                inner.require_fd()?;
                inner.skip_whitespace();
                Ok::<_, crate::error::Error>(!inner.lookahead().is_empty())
            })?;

            if has_input {
                break;
            }

            if !self.fill().await? {
                return Ok(None);
            }
        }

        // Scan the token, extending the lookahead until its end is visible.
        loop {
            let scan = self.with_inner(|inner| scan_number(inner.lookahead(), false));

            match scan {
                Scan::Complete(len, value) => {
                    self.with_inner(|inner| inner.advance(len));
                    return Ok(Some(value));
                }
                Scan::NoNumber => return Ok(None),
                Scan::NeedMore => {
                    if !self.fill().await? {
                        // EOF terminates the token.
                        let scan = self.with_inner(|inner| scan_number(inner.lookahead(), true));

                        return match scan {
                            Scan::Complete(len, value) => {
                                self.with_inner(|inner| inner.advance(len));
                                Ok(Some(value))
                            }
                            _ => Ok(None),
                        };
                    }
                }
            }
        }
    }

    /// Pulls one chunk from the descriptor into the lookahead buffer.
    /// Returns `false` at end of stream.
    async fn fill(&self) -> Result<bool> {
        loop {
            let mut chunk = pool::acquire();

            let step = self.with_inner(|inner| {
                let fd = inner.require_fd()?;

                match raw_read(fd, &mut chunk) {
                    Ok(0) => Ok::<_, crate::error::Error>(Fill::Eof),
                    Ok(n) => {
                        inner.push_lookahead(&chunk[..n]);
                        Ok(Fill::Data)
                    }
                    Err(ref error) if would_block(error) => Ok(Fill::Wait(fd)),
                    Err(error) => Err(error.into()),
                }
            })?;

            // Return the scratch buffer before suspending.
            drop(chunk);

            match step {
                Fill::Data => return Ok(true),
                Fill::Eof => return Ok(false),
                Fill::Wait(fd) => readable(fd, None).await,
            }
        }
    }
}

/// Scans the longest number token at the start of `input`.
///
/// `at_eof` means no more input can arrive, so a token touching the end of
/// the slice is complete rather than possibly truncated.
fn scan_number(input: &[u8], at_eof: bool) -> Scan {
    let run = input
        .iter()
        .position(|&b| !is_number_byte(b))
        .unwrap_or(input.len());

    if run == input.len() && !at_eof {
        return Scan::NeedMore;
    }

    // Longest prefix of the run that parses as a double wins; "42.5e" still
    // yields 42.5 with the 'e' left unconsumed.
    for end in (1..=run).rev() {
        if let Ok(text) = std::str::from_utf8(&input[..end]) {
            if let Ok(value) = text.parse::<f64>() {
                return Scan::Complete(end, value);
            }
        }
    }

    Scan::NoNumber
}

fn is_number_byte(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')
}
