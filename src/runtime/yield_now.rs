use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Cooperative reschedule: parks the calling task on the idle queue and lets
/// other runnable tasks take a turn.
///
/// The returned future is `Pending` exactly once. Waking through the task's
/// own waker puts the task at the back of the FIFO idle queue, so every
/// task enqueued earlier runs first.
pub async fn yield_now() {
    struct YieldNow {
        rescheduled: bool,
    }

    impl Future for YieldNow {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            if !self.rescheduled {
                self.rescheduled = true;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }

            Poll::Ready(())
        }
    }

    YieldNow { rescheduled: false }.await
}
