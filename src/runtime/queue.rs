//! Wait index: the scheduler's bookkeeping of suspended tasks.
//!
//! Tasks suspended on I/O or timers are stacked under their `(kind, key)`
//! watch address; tasks that are runnable but not I/O-bound sit in a single
//! FIFO idle queue. The asymmetry is deliberate: waiters on the same
//! descriptor are typically one logical task re-registering after a partial
//! read (LIFO resumes it first), while FIFO across independent idle tasks
//! approximates fair scheduling.

use crate::reactor::event::WaitKind;
use crate::task::TaskRef;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Shared handle to the wait index.
pub(crate) type WaitHandle = Arc<Mutex<WaitIndex>>;

/// The event that caused a task to be resumed, threaded through to the yield
/// future so it can tell its own wake-up from a spurious poll.
pub(crate) type WakeReason = (WaitKind, u64);

/// One runnable entry popped by the dispatch loop.
pub(crate) type Resumption = (TaskRef, Option<WakeReason>);

pub(crate) struct WaitIndex {
    /// Suspended tasks, LIFO per watch address.
    parked: HashMap<(WaitKind, u64), Vec<TaskRef>>,

    /// Runnable tasks, FIFO.
    idle: VecDeque<Resumption>,

    /// The next task to resume, written when the first event of a pump batch
    /// unparks a task. Read and cleared by the dispatch loop; later events in
    /// the same batch overflow to the idle queue.
    next: Option<Resumption>,
}

impl WaitIndex {
    pub(crate) fn new() -> Self {
        Self {
            parked: HashMap::new(),
            idle: VecDeque::new(),
            next: None,
        }
    }

    /// Suspends `task` under the `(kind, key)` watch address.
    pub(crate) fn park(&mut self, kind: WaitKind, key: u64, task: TaskRef) {
        self.parked.entry((kind, key)).or_default().push(task);
    }

    /// Enqueues `task` as runnable without an associated event.
    pub(crate) fn park_idle(&mut self, task: TaskRef) {
        self.idle.push_back((task, None));
    }

    /// Pops the most recently parked task for `(kind, key)`.
    ///
    /// Panics when no task is parked there: an event was delivered for a
    /// watch nobody established, which is a bug in the scheduler/reactor
    /// bridge, not a runtime condition.
    pub(crate) fn unpark_one(&mut self, kind: WaitKind, key: u64) -> TaskRef {
        let stack = self
            .parked
            .get_mut(&(kind, key))
            .unwrap_or_else(|| panic!("event for ({kind:?}, {key}) with no parked task"));

        let task = stack
            .pop()
            .unwrap_or_else(|| panic!("event for ({kind:?}, {key}) with no parked task"));

        if stack.is_empty() {
            self.parked.remove(&(kind, key));
        }

        task
    }

    /// Marks an unparked task runnable: the first of a batch becomes the
    /// next-task hint, the rest accumulate on the idle queue.
    pub(crate) fn make_runnable(&mut self, task: TaskRef, reason: Option<WakeReason>) {
        if self.next.is_none() {
            self.next = Some((task, reason));
        } else {
            self.idle.push_back((task, reason));
        }
    }

    /// Picks the next task to resume: the hint if set, else the idle queue.
    pub(crate) fn take_next(&mut self) -> Option<Resumption> {
        self.next.take().or_else(|| self.idle.pop_front())
    }
}
