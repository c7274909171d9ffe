use crate::reactor::{DEFAULT_EVENT_CAPACITY, PumpMode, Reactor, ReactorHandle};
use crate::runtime::context::{Features, enter_context, set_current_task, set_wake_reason};
use crate::runtime::queue::{WaitHandle, WaitIndex};
use crate::runtime::waker::main_waker;
use crate::task::TaskRef;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

/// Single-threaded cooperative runtime.
///
/// Owns the wait index and the reactor; `block_on` runs the dispatch loop
/// that alternately pumps the reactor and resumes one ready task. Tasks
/// interleave only at explicit yield points, so no internal structure needs
/// synchronization beyond the handle mutexes.
pub struct Runtime {
    sched: WaitHandle,
    reactor: ReactorHandle,
    features: Features,
}

impl Runtime {
    /// Creates a runtime with every feature enabled.
    pub fn new() -> Self {
        Self::with_config(
            Features {
                io_enabled: true,
                fs_enabled: true,
            },
            DEFAULT_EVENT_CAPACITY,
        )
    }

    pub(crate) fn with_config(features: Features, event_capacity: usize) -> Self {
        Self {
            sched: Arc::new(Mutex::new(WaitIndex::new())),
            reactor: Arc::new(Mutex::new(Reactor::with_capacity(event_capacity))),
            features,
        }
    }

    /// Drives `future` to completion, dispatching spawned tasks and reactor
    /// events until it resolves.
    ///
    /// The dispatch cycle: pump the reactor without blocking, unpark the
    /// tasks whose watches fired, resume exactly one task (the hint left by
    /// the first event of the batch, else the oldest idle task), repeat.
    /// When nothing is runnable the pump escalates to blocking; this is the
    /// only place the process sleeps. The loop exits when `future` itself
    /// completes; tasks still pending at that point never resume.
    pub fn block_on<F: Future>(&mut self, future: F) -> F::Output {
        enter_context(
            self.sched.clone(),
            self.reactor.clone(),
            self.features,
            || {
                let mut main = Box::pin(future);
                let waker = main_waker(self.sched.clone());
                let mut cx = Context::from_waker(&waker);

                // The main task is the initial current task.
                set_current_task(Some(TaskRef::Main));
                let polled = main.as_mut().poll(&mut cx);
                set_current_task(None);

                if let Poll::Ready(value) = polled {
                    return value;
                }

                let mut mode = PumpMode::NonBlocking;
                let mut fired = Vec::new();

                loop {
                    self.reactor
                        .lock()
                        .unwrap()
                        .pump(mode, &mut fired)
                        .expect("reactor pump failed");
                    mode = PumpMode::NonBlocking;

                    {
                        let mut sched = self.sched.lock().unwrap();

                        for event in fired.drain(..) {
                            let task = sched.unpark_one(event.kind, event.key);
                            sched.make_runnable(task, Some((event.kind, event.key)));
                        }
                    }

                    let Some((task, reason)) = self.sched.lock().unwrap().take_next() else {
                        log::trace!(target: "sched", "no runnable task; blocking on reactor");
                        mode = PumpMode::Once;
                        continue;
                    };

                    set_wake_reason(reason);

                    match task {
                        TaskRef::Main => {
                            set_current_task(Some(TaskRef::Main));
                            let polled = main.as_mut().poll(&mut cx);
                            set_current_task(None);
                            set_wake_reason(None);

                            if let Poll::Ready(value) = polled {
                                return value;
                            }
                        }
                        TaskRef::Child(runnable) => {
                            set_current_task(Some(TaskRef::Child(runnable.clone())));
                            runnable.poll();
                            set_current_task(None);
                            set_wake_reason(None);
                        }
                    }
                }
            },
        )
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
