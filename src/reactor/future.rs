//! Readiness yield points for non-blocking file descriptors.
//!
//! These futures are the suspension primitive of the runtime: the first poll
//! parks the calling task in the wait index under `(kind, fd)` and registers
//! a one-shot reactor watch for the same address; the poll triggered by that
//! watch firing completes the future. Every other poll leaves the task
//! suspended.
//!
//! Readiness is a hint, not a guarantee: the descriptor may report `EAGAIN`
//! again after the task resumes (spurious wakeup, drained buffer, or a timed
//! watch whose deadline fired first). Callers must retry the syscall and
//! yield again on `EAGAIN`; `EAGAIN` right after a timed yield resumes is how
//! a timeout is observed.
//!
//! # Examples
//!
//! ```ignore
//! use coopio::readable;
//!
//! # async fn wait_for_input(fd: i32) {
//! readable(fd, None).await;
//! // the next read(2) on `fd` is likely to succeed
//! # }
//! ```

use crate::reactor::event::WaitKind;
use crate::runtime::context::{consume_wake_reason, current_reactor_io, current_sched, current_task};

use std::future::Future;
use std::os::unix::io::RawFd;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// Suspends the current task until `fd` is readable.
///
/// With a timeout, the task also resumes when the deadline expires; the
/// caller observes the timeout as `EAGAIN` on the retried syscall.
pub fn readable(fd: RawFd, timeout: Option<Duration>) -> Readable {
    Readable {
        fd,
        timeout,
        parked: false,
    }
}

/// Suspends the current task until `fd` is writable.
pub fn writable(fd: RawFd, timeout: Option<Duration>) -> Writable {
    Writable {
        fd,
        timeout,
        parked: false,
    }
}

/// Future returned by [`readable`].
pub struct Readable {
    fd: RawFd,
    timeout: Option<Duration>,
    parked: bool,
}

impl Future for Readable {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_yield(WaitKind::Read, self.fd, self.timeout, &mut self.parked)
    }
}

/// Future returned by [`writable`].
pub struct Writable {
    fd: RawFd,
    timeout: Option<Duration>,
    parked: bool,
}

impl Future for Writable {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        poll_yield(WaitKind::Write, self.fd, self.timeout, &mut self.parked)
    }
}

fn poll_yield(
    kind: WaitKind,
    fd: RawFd,
    timeout: Option<Duration>,
    parked: &mut bool,
) -> Poll<()> {
    if consume_wake_reason(kind, fd as u64) {
        return Poll::Ready(());
    }

    if !*parked {
        let task = current_task();

        // Park first; the watch registered by the same yield is what
        // eventually unparks the task.
        current_sched().lock().unwrap().park(kind, fd as u64, task);
        current_reactor_io().lock().unwrap().watch_fd(fd, kind, timeout);

        *parked = true;
    }

    Poll::Pending
}
