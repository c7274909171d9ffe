//! Sleep futures for asynchronous delays.

use crate::reactor::event::WaitKind;
use crate::runtime::context::{consume_wake_reason, current_reactor_io, current_sched, current_task};

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

/// A future that completes after a duration, using a one-shot reactor timer.
///
/// The timer is armed lazily on the first poll; the task parks under the
/// timer's id so that concurrently sleeping tasks each resume when their own
/// timer expires. A zero-duration sleep completes immediately.
pub struct Sleep {
    duration: Duration,

    /// Timer id once armed.
    key: Option<u64>,
}

/// Suspends the current task for at least `duration`.
///
/// # Panics
/// Panics when polled outside of a runtime context.
pub fn sleep(duration: Duration) -> Sleep {
    Sleep {
        duration,
        key: None,
    }
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.duration.is_zero() {
            return Poll::Ready(());
        }

        match self.key {
            Some(key) => {
                if consume_wake_reason(WaitKind::Timer, key) {
                    return Poll::Ready(());
                }

                Poll::Pending
            }
            None => {
                let task = current_task();
                let key = current_reactor_io()
                    .lock()
                    .unwrap()
                    .watch_timer(self.duration);

                current_sched()
                    .lock()
                    .unwrap()
                    .park(WaitKind::Timer, key, task);

                self.key = Some(key);

                Poll::Pending
            }
        }
    }
}
