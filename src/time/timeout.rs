//! Deadline wrapper for async operations.

use crate::runtime::context::current_reactor_io;
use crate::time::TimeError;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Wraps a future with a deadline. If the future does not complete within
/// `duration`, resolves to `Err(TimeError::Elapsed)`.
///
/// The abandoned inner future is dropped; any reactor watch it left behind
/// fires into a spurious poll, which the yield primitives tolerate.
pub fn timeout<F>(duration: Duration, future: F) -> Timeout<F>
where
    F: Future,
{
    Timeout {
        future,
        deadline: Instant::now() + duration,
        duration,
        registered: false,
    }
}

/// Future returned by [`timeout`].
pub struct Timeout<F> {
    future: F,
    deadline: Instant,
    duration: Duration,

    /// Whether the alarm has been armed with the reactor.
    registered: bool,
}

impl<F: Future> Future for Timeout<F> {
    type Output = Result<F::Output, TimeError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if Instant::now() >= self.deadline {
            return Poll::Ready(Err(TimeError::Elapsed));
        }

        let future = unsafe { self.as_mut().map_unchecked_mut(|s| &mut s.future) };
        if let Poll::Ready(value) = future.poll(cx) {
            return Poll::Ready(Ok(value));
        }

        if !self.registered {
            let waker = cx.waker().clone();
            current_reactor_io()
                .lock()
                .unwrap()
                .watch_alarm(self.duration, waker);

            unsafe {
                let this = self.get_unchecked_mut();
                this.registered = true;
            }
        }

        Poll::Pending
    }
}
