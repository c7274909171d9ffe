//! Non-blocking file handles backed by the reactor.
//!
//! A [`File`] owns a descriptor placed in non-blocking mode at construction.
//! Every operation follows the would-block dance: attempt the syscall, and
//! when the OS reports `EAGAIN`/`EWOULDBLOCK`, suspend on the descriptor and
//! retry once readiness fires. Would-block never surfaces to the caller;
//! every other failure does, verbatim.
//!
//! Handles are cheap clones of one shared state, so a handle can be passed
//! to a task or installed as a process-wide default stream. Closing re-tags
//! the descriptor as `-1`; later operations return the closed-file error and
//! a second close is a no-op.

use crate::error::{Error, Result};
use crate::fs::lines::Lines;
use crate::reactor::event::set_nonblocking;
use crate::reactor::future::writable;
use crate::runtime::context::{current_reactor_io, ensure_fs};

use libc::{O_APPEND, O_CREAT, O_NONBLOCK, O_RDONLY, O_RDWR, O_TRUNC, O_WRONLY};
use std::ffi::CString;
use std::io::{self, SeekFrom};
use std::os::unix::io::{AsRawFd, FromRawFd, IntoRawFd, RawFd};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};

/// DEFFILEMODE: creation mode for new files, moderated by the umask.
const DEFAULT_FILE_MODE: libc::c_int = 0o666;

/// Output buffering discipline, in the `setvbuf` family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferMode {
    /// Write-through: every write goes straight to the descriptor.
    None,

    /// Collect output until the buffer capacity is reached.
    Full,

    /// Flush complete lines, buffer the partial tail.
    Line,
}

/// An asynchronous file handle.
///
/// Created by [`open`](File::open), [`popen`](File::popen), the standard
/// stream accessors, or by wrapping an existing descriptor via `FromRawFd`.
#[derive(Clone, Debug)]
pub struct File {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug)]
pub(super) struct Inner {
    fd: RawFd,
    owns_fd: bool,
    child: Option<Child>,

    /// Read lookahead: bytes fetched from the descriptor but not yet
    /// consumed by a read operation.
    rbuf: Vec<u8>,
    rpos: usize,

    wbuf: Vec<u8>,
    buffering: BufferMode,
    capacity: usize,
}

impl Inner {
    pub(super) fn require_fd(&self) -> Result<RawFd> {
        if self.fd < 0 {
            return Err(Error::Closed);
        }

        Ok(self.fd)
    }

    fn unread(&self) -> usize {
        self.rbuf.len() - self.rpos
    }

    /// Takes up to `max` buffered bytes.
    pub(super) fn consume(&mut self, max: usize) -> Vec<u8> {
        let take = self.unread().min(max);
        let out = self.rbuf[self.rpos..self.rpos + take].to_vec();

        self.rpos += take;
        self.compact();

        out
    }

    /// Takes buffered bytes through the first newline, if one is buffered.
    pub(super) fn consume_through_newline(&mut self) -> Option<Vec<u8>> {
        let haystack = &self.rbuf[self.rpos..];
        let pos = haystack.iter().position(|&b| b == b'\n')?;
        let out = haystack[..=pos].to_vec();

        self.rpos += pos + 1;
        self.compact();

        Some(out)
    }

    /// Advances past buffered ASCII whitespace.
    pub(super) fn skip_whitespace(&mut self) {
        while self.rpos < self.rbuf.len() && self.rbuf[self.rpos].is_ascii_whitespace() {
            self.rpos += 1;
        }

        self.compact();
    }

    pub(super) fn lookahead(&self) -> &[u8] {
        &self.rbuf[self.rpos..]
    }

    pub(super) fn advance(&mut self, n: usize) {
        self.rpos += n;
        self.compact();
    }

    pub(super) fn push_lookahead(&mut self, data: &[u8]) {
        self.rbuf.extend_from_slice(data);
    }

    fn compact(&mut self) {
        if self.rpos == self.rbuf.len() {
            self.rbuf.clear();
            self.rpos = 0;
        }
    }
}

impl File {
    pub(crate) fn from_parts(fd: RawFd, owns_fd: bool, child: Option<Child>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                fd,
                owns_fd,
                child,
                rbuf: Vec::new(),
                rpos: 0,
                wbuf: Vec::new(),
                buffering: BufferMode::None,
                capacity: crate::fs::pool::BUF_SIZE,
            })),
        }
    }

    /// Wraps a standard stream descriptor: non-blocking, but borrowed, so
    /// closing the handle never closes the underlying fd.
    pub(crate) fn std_stream(fd: RawFd) -> Self {
        set_nonblocking(fd);
        Self::from_parts(fd, false, None)
    }

    /// Opens `path` with an fopen-style mode string.
    ///
    /// Recognized modes are `r`, `r+`, `w`, `w+`, `a`, `a+`, each optionally
    /// with a `b`. The descriptor is opened non-blocking; files are created
    /// with mode 0o666.
    ///
    /// # Panics
    /// Panics on an unrecognized mode string, or if the runtime was not
    /// built with filesystem support.
    pub async fn open(path: &str, mode: &str) -> Result<File> {
        ensure_fs();

        let flags = parse_mode(mode) | O_NONBLOCK;

        let c_path = CString::new(path).map_err(|_| Error::Open {
            path: path.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "path contains null byte"),
        })?;

        let fd = unsafe {
            if flags & O_CREAT != 0 {
                libc::open(c_path.as_ptr(), flags, DEFAULT_FILE_MODE)
            } else {
                libc::open(c_path.as_ptr(), flags)
            }
        };

        if fd < 0 {
            return Err(Error::Open {
                path: path.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        log::debug!(target: "fs", "open {path:?} mode={mode:?} fd={fd}");

        Ok(File::from_parts(fd, true, None))
    }

    /// Starts `sh -c cmd` and wraps the pipe to it.
    ///
    /// Mode `"r"` captures the child's stdout; `"w"` feeds its stdin. The
    /// pipe is non-blocking. Closing the handle closes the pipe and then
    /// reaps the child.
    ///
    /// # Panics
    /// Panics on a mode other than `"r"` or `"w"`, or if the runtime was not
    /// built with filesystem support.
    pub async fn popen(cmd: &str, mode: &str) -> Result<File> {
        ensure_fs();

        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(cmd);

        match mode {
            "r" => {
                command.stdout(Stdio::piped());
            }
            "w" => {
                command.stdin(Stdio::piped());
            }
            _ => panic!("invalid popen mode {mode:?}"),
        }

        let mut child = command.spawn().map_err(|source| Error::Open {
            path: cmd.to_string(),
            source,
        })?;

        let fd = match mode {
            "r" => child.stdout.take().expect("piped stdout").into_raw_fd(),
            _ => child.stdin.take().expect("piped stdin").into_raw_fd(),
        };

        set_nonblocking(fd);

        log::debug!(target: "fs", "popen {cmd:?} mode={mode:?} fd={fd}");

        Ok(File::from_parts(fd, true, Some(child)))
    }

    /// Closes the handle.
    ///
    /// Flushes buffered output, closes the descriptor (and reaps the child
    /// of a [`popen`](File::popen) handle), and re-tags the fd as `-1`.
    /// Closing an already-closed handle succeeds without side effect.
    /// Refuses with [`Error::Parked`] while tasks are suspended on the
    /// descriptor.
    pub async fn close(&self) -> Result<()> {
        {
            let inner = self.inner.lock().unwrap();

            if inner.fd < 0 {
                return Ok(());
            }
        }

        self.flush().await?;

        let (fd, owns_fd, child) = {
            let mut inner = self.inner.lock().unwrap();

            if inner.fd < 0 {
                return Ok(());
            }

            let fd = inner.fd;

            if current_reactor_io().lock().unwrap().has_waiters(fd) {
                return Err(Error::Parked(fd));
            }

            inner.fd = -1;
            inner.rbuf.clear();
            inner.rpos = 0;

            (fd, inner.owns_fd, inner.child.take())
        };

        log::debug!(target: "fs", "close fd={fd}");

        if owns_fd {
            let ret = unsafe { libc::close(fd) };

            if ret < 0 {
                return Err(io::Error::last_os_error().into());
            }
        }

        if let Some(mut child) = child {
            child.wait().map_err(Error::Io)?;
        }

        Ok(())
    }

    /// Writes all of `data`, retrying short writes and would-block.
    ///
    /// Under [`BufferMode::Full`] or [`BufferMode::Line`] the bytes may stay
    /// in the write buffer until a flush point is reached.
    pub async fn write(&self, data: impl AsRef<[u8]>) -> Result<()> {
        let data = data.as_ref();

        let buffering = {
            let inner = self.inner.lock().unwrap();
            inner.require_fd()?;
            inner.buffering
        };

        match buffering {
            BufferMode::None => self.write_direct(data).await,
            BufferMode::Full => {
                let over = {
                    let mut inner = self.inner.lock().unwrap();
                    inner.require_fd()?;
                    inner.wbuf.extend_from_slice(data);
                    inner.wbuf.len() >= inner.capacity
                };

                if over {
                    self.drain(usize::MAX).await
                } else {
                    Ok(())
                }
            }
            BufferMode::Line => {
                let flush_to = {
                    let mut inner = self.inner.lock().unwrap();
                    inner.require_fd()?;
                    inner.wbuf.extend_from_slice(data);
                    inner.wbuf.iter().rposition(|&b| b == b'\n').map(|pos| pos + 1)
                };

                match flush_to {
                    Some(limit) => self.drain(limit).await,
                    None => Ok(()),
                }
            }
        }
    }

    /// Drains any buffered output to the descriptor.
    pub async fn flush(&self) -> Result<()> {
        {
            let inner = self.inner.lock().unwrap();
            inner.require_fd()?;
        }

        self.drain(usize::MAX).await
    }

    /// Repositions the handle. Buffered output is flushed first and read
    /// lookahead is discarded (a relative seek accounts for it). Returns the
    /// new offset from the start of the file.
    pub async fn seek(&self, pos: SeekFrom) -> Result<u64> {
        self.flush().await?;

        let mut inner = self.inner.lock().unwrap();
        let fd = inner.require_fd()?;

        let (whence, offset) = match pos {
            SeekFrom::Start(offset) => (libc::SEEK_SET, offset as i64),
            // The kernel offset is ahead of the handle by the unread lookahead.
            SeekFrom::Current(offset) => (libc::SEEK_CUR, offset - inner.unread() as i64),
            SeekFrom::End(offset) => (libc::SEEK_END, offset),
        };

        inner.rbuf.clear();
        inner.rpos = 0;

        let ret = unsafe { libc::lseek(fd, offset, whence) };

        if ret < 0 {
            return Err(io::Error::last_os_error().into());
        }

        Ok(ret as u64)
    }

    /// Switches the output buffering discipline, flushing pending output
    /// first. `size` overrides the buffer capacity for [`BufferMode::Full`].
    pub async fn setvbuf(&self, mode: BufferMode, size: Option<usize>) -> Result<()> {
        self.flush().await?;

        let mut inner = self.inner.lock().unwrap();
        inner.require_fd()?;
        inner.buffering = mode;

        if let Some(size) = size {
            inner.capacity = size.max(1);
        }

        Ok(())
    }

    /// Returns a line cursor over this handle.
    pub fn lines(&self) -> Lines {
        Lines::new(self.clone())
    }

    async fn write_direct(&self, data: &[u8]) -> Result<()> {
        let mut offset = 0;

        while offset < data.len() {
            let wait_fd = {
                let inner = self.inner.lock().unwrap();
                let fd = inner.require_fd()?;

                match raw_write(fd, &data[offset..]) {
                    Ok(0) => return Err(write_zero().into()),
                    Ok(n) => {
                        offset += n;
                        None
                    }
                    Err(ref error) if would_block(error) => Some(fd),
                    Err(error) => return Err(error.into()),
                }
            };

            if let Some(fd) = wait_fd {
                writable(fd, None).await;
            }
        }

        Ok(())
    }

    /// Writes out up to `limit` bytes of the write buffer.
    async fn drain(&self, limit: usize) -> Result<()> {
        let mut remaining = limit;

        loop {
            let wait_fd = {
                let mut inner = self.inner.lock().unwrap();
                let fd = inner.require_fd()?;
                let len = remaining.min(inner.wbuf.len());

                if len == 0 {
                    return Ok(());
                }

                match raw_write(fd, &inner.wbuf[..len]) {
                    Ok(0) => return Err(write_zero().into()),
                    Ok(n) => {
                        inner.wbuf.drain(..n);
                        remaining -= n;
                        None
                    }
                    Err(ref error) if would_block(error) => Some(fd),
                    Err(error) => return Err(error.into()),
                }
            };

            if let Some(fd) = wait_fd {
                writable(fd, None).await;
            }
        }
    }

    pub(super) fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        f(&mut self.inner.lock().unwrap())
    }
}

impl AsRawFd for File {
    /// The wrapped descriptor, `-1` once closed.
    fn as_raw_fd(&self) -> RawFd {
        self.inner.lock().unwrap().fd
    }
}

impl FromRawFd for File {
    /// Wraps an existing descriptor, taking ownership and switching it to
    /// non-blocking mode.
    unsafe fn from_raw_fd(fd: RawFd) -> File {
        set_nonblocking(fd);
        File::from_parts(fd, true, None)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.fd < 0 {
            return;
        }

        // Best-effort flush; a would-block here loses the tail, as no
        // suspension is possible in a destructor.
        if !self.wbuf.is_empty() {
            let _ = raw_write(self.fd, &self.wbuf);
        }

        if self.owns_fd {
            unsafe {
                libc::close(self.fd);
            }
        }

        if let Some(mut child) = self.child.take() {
            let _ = child.try_wait();
        }
    }
}

fn parse_mode(mode: &str) -> libc::c_int {
    let base: String = mode.chars().filter(|&c| c != 'b').collect();

    match base.as_str() {
        "r" => O_RDONLY,
        "r+" => O_RDWR,
        "w" => O_WRONLY | O_CREAT | O_TRUNC,
        "w+" => O_RDWR | O_CREAT | O_TRUNC,
        "a" => O_WRONLY | O_CREAT | O_APPEND,
        "a+" => O_RDWR | O_CREAT | O_APPEND,
        _ => panic!("invalid open mode {mode:?}"),
    }
}

pub(super) fn raw_read(fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, buf.len()) };

    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(n as usize)
}

fn raw_write(fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    let n = unsafe { libc::write(fd, buf.as_ptr() as *const _, buf.len()) };

    if n < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(n as usize)
}

pub(super) fn would_block(error: &io::Error) -> bool {
    matches!(
        error.raw_os_error(),
        Some(code) if code == libc::EAGAIN || code == libc::EWOULDBLOCK
    )
}

fn write_zero() -> io::Error {
    io::Error::new(io::ErrorKind::WriteZero, "write returned zero bytes")
}
