//! Wakers that hand a task back to the scheduler.
//!
//! Waking re-enqueues the task on the wait index's idle queue; the dispatch
//! loop picks it up on a later iteration. This is how completion
//! notifications (e.g. a finished [`JoinHandle`]) make their awaiting task
//! runnable again without going through a reactor watch.
//!
//! [`JoinHandle`]: crate::task::JoinHandle

use crate::runtime::queue::WaitHandle;
use crate::task::{Task, TaskRef};

use std::sync::Arc;
use std::task::{Wake, Waker};

/// Waker for a spawned task: re-enqueues it on wake.
struct TaskWaker<T: Send + 'static> {
    task: Arc<Task<T>>,
}

impl<T: Send + 'static> Wake for TaskWaker<T> {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        let runnable: Arc<dyn crate::task::Runnable> = self.task.clone();

        self.task
            .sched
            .lock()
            .unwrap()
            .park_idle(TaskRef::Child(runnable));
    }
}

/// Waker for the main task: re-enqueues the `Main` sentinel, which the
/// dispatch loop resolves by polling the `block_on` future.
struct MainWaker {
    sched: WaitHandle,
}

impl Wake for MainWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.sched.lock().unwrap().park_idle(TaskRef::Main);
    }
}

/// Builds the waker used while polling a spawned task.
pub(crate) fn make_waker<T: Send + 'static>(task: Arc<Task<T>>) -> Waker {
    Waker::from(Arc::new(TaskWaker { task }))
}

/// Builds the waker used while polling the main future.
pub(crate) fn main_waker(sched: WaitHandle) -> Waker {
    Waker::from(Arc::new(MainWaker { sched }))
}
