use crate::runtime::context::{current_task, try_current_sched};
use crate::runtime::queue::WaitHandle;
use crate::runtime::waker::make_waker;

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

type TaskFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Lifecycle of a spawned task.
///
/// A task is either a suspended future waiting for the dispatch loop, the
/// future currently being driven, or a finished result waiting for its join
/// handle. Keeping all of it in one slot means a resumption that arrives
/// after completion (a stale watch firing, a duplicate wake) finds no future
/// to run and falls through as a no-op.
enum TaskState<T> {
    /// Parked at a yield point, or enqueued and not yet started.
    Suspended(TaskFuture<T>),

    /// The dispatch loop is inside the future right now.
    Polling,

    /// Completed; the result waits to be claimed.
    Finished(T),

    /// The join handle claimed the result.
    Joined,
}

/// A spawned unit of cooperative execution.
///
/// Tasks run only when the dispatch loop polls them; an uncaught panic in
/// the task body unwinds through the loop to the `block_on` caller.
pub struct Task<T: Send> {
    state: Mutex<TaskState<T>>,

    /// Tasks that joined this one. They go back on the idle queue when it
    /// finishes; there is no separate wake-up channel for joins.
    joiners: Mutex<Vec<TaskRef>>,

    pub(crate) sched: WaitHandle,
}

impl<T: 'static + Send> Task<T> {
    /// Resumes the task: runs the future to its next suspension point or to
    /// completion. A resumption of a finished task is a no-op.
    pub(crate) fn poll(self: &Arc<Self>) {
        let waker = make_waker(self.clone());
        let mut context = Context::from_waker(&waker);

        let mut future = {
            let mut state = self.state.lock().unwrap();

            match mem::replace(&mut *state, TaskState::Polling) {
                TaskState::Suspended(future) => future,
                other => {
                    *state = other;
                    return;
                }
            }
        };

        match future.as_mut().poll(&mut context) {
            Poll::Pending => {
                *self.state.lock().unwrap() = TaskState::Suspended(future);
            }
            Poll::Ready(value) => {
                *self.state.lock().unwrap() = TaskState::Finished(value);
                self.requeue_joiners();
            }
        }
    }

    /// Hands every task that joined this one back to the idle queue, where
    /// the dispatch loop resumes them in FIFO order.
    fn requeue_joiners(&self) {
        let joiners = mem::take(&mut *self.joiners.lock().unwrap());
        let mut sched = self.sched.lock().unwrap();

        for joiner in joiners {
            sched.park_idle(joiner);
        }
    }

    /// Spawns a new task on the current runtime.
    ///
    /// The child is enqueued on the idle queue and never runs inside the
    /// spawn call itself; it gains control when the dispatch loop drains the
    /// idle queue in FIFO order.
    ///
    /// # Panics
    /// Panics if called outside of a runtime context.
    pub fn spawn<F>(future: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + 'static + Send,
    {
        let sched =
            try_current_sched().expect("Task::spawn() called outside of a runtime context");

        let task = Arc::new(Task {
            state: Mutex::new(TaskState::Suspended(Box::pin(future))),
            joiners: Mutex::new(Vec::new()),
            sched: sched.clone(),
        });

        let runnable: Arc<dyn Runnable> = task.clone();
        sched.lock().unwrap().park_idle(TaskRef::Child(runnable));

        log::trace!(target: "sched", "task spawned");

        JoinHandle { task }
    }
}

/// Type-erased resumable unit, so tasks of different output types share the
/// scheduler's queues.
pub(crate) trait Runnable: Send + Sync {
    fn poll(self: Arc<Self>);
}

impl<T: 'static + Send> Runnable for Task<T> {
    fn poll(self: Arc<Self>) {
        Task::poll(&self);
    }
}

/// A reference to a schedulable task.
///
/// `Main` denotes the initial caller of the scheduler: resuming it means
/// polling the `block_on` future. At most one task is current at any instant.
#[derive(Clone)]
pub(crate) enum TaskRef {
    Main,
    Child(Arc<dyn Runnable>),
}

/// Handle for awaiting a spawned task's result.
///
/// Awaiting parks the calling task with the child; the child's completion
/// puts the caller back on the idle queue.
pub struct JoinHandle<T: Send> {
    task: Arc<Task<T>>,
}

impl<T: Send> Future for JoinHandle<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.task.state.lock().unwrap();

        match mem::replace(&mut *state, TaskState::Joined) {
            TaskState::Finished(value) => Poll::Ready(value),
            TaskState::Joined => panic!("join handle polled after completion"),
            running => {
                *state = running;
                drop(state);

                self.task.joiners.lock().unwrap().push(current_task());

                Poll::Pending
            }
        }
    }
}
