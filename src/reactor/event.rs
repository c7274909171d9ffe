use libc::{F_GETFL, F_SETFL, O_NONBLOCK, fcntl};
use std::os::unix::io::RawFd;

/// The classes of events a task can wait for.
///
/// `Read` and `Write` are keyed by file descriptor; `Timer` is keyed by a
/// reactor-allocated id so that concurrently armed timers resume the task
/// that armed them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum WaitKind {
    Read,
    Write,
    Timer,
}

/// A single delivered event: the watch for `(kind, key)` fired.
///
/// For `Read`/`Write` the key is the fd (a deadline expiry on a timed fd
/// watch fires under the same key; the resumed task distinguishes the two by
/// retrying the syscall). For `Timer` the key is the timer id.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Fired {
    pub(crate) kind: WaitKind,
    pub(crate) key: u64,
}

/// Puts a descriptor in non-blocking mode.
pub(crate) fn set_nonblocking(fd: RawFd) {
    let flags = unsafe { fcntl(fd, F_GETFL) };

    unsafe {
        fcntl(fd, F_SETFL, flags | O_NONBLOCK);
    }
}
