//! Thread-local runtime context.
//!
//! `block_on` installs the scheduler handle, reactor handle, and feature set
//! for the duration of the call, so that `Task::spawn`, the yield
//! primitives, and the file operations can reach the current runtime without
//! threading handles through every call. The dispatch loop additionally
//! records which task is being polled and why it was resumed.
//!
//! All of this state is confined to the scheduler's thread; invariants hold
//! at every yield boundary because tasks only interleave there.

use crate::reactor::ReactorHandle;
use crate::runtime::queue::{WaitHandle, WakeReason};
use crate::task::TaskRef;

use std::cell::{Cell, RefCell};

/// Feature switches for the current runtime context.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Features {
    /// Reactor-backed I/O (fd yields, timers) is enabled.
    pub(crate) io_enabled: bool,

    /// File handles and standard streams are enabled.
    pub(crate) fs_enabled: bool,
}

thread_local! {
    /// The current runtime's wait index, set for the span of `block_on`.
    static CURRENT_SCHED: RefCell<Option<WaitHandle>> = const { RefCell::new(None) };

    /// The current runtime's reactor, set for the span of `block_on`.
    static CURRENT_REACTOR: RefCell<Option<ReactorHandle>> = const { RefCell::new(None) };

    /// The current runtime's feature set.
    static CURRENT_FEATURES: Cell<Option<Features>> = const { Cell::new(None) };

    /// The task being polled right now. At most one task is current.
    static CURRENT_TASK: RefCell<Option<TaskRef>> = const { RefCell::new(None) };

    /// The event that caused the current resumption, if any. A yield future
    /// completes only when this matches its own watch address.
    static WAKE_REASON: Cell<Option<WakeReason>> = const { Cell::new(None) };
}

/// Enters a runtime context for the current thread, restoring the previous
/// one on exit so `block_on` calls may nest.
pub(crate) fn enter_context<F, R>(
    sched: WaitHandle,
    reactor: ReactorHandle,
    features: Features,
    function: F,
) -> R
where
    F: FnOnce() -> R,
{
    CURRENT_SCHED.with(|current_sched| {
        CURRENT_REACTOR.with(|current_reactor| {
            let previous_sched = current_sched.borrow_mut().replace(sched);
            let previous_reactor = current_reactor.borrow_mut().replace(reactor);
            let previous_features = CURRENT_FEATURES.with(|f| f.replace(Some(features)));

            let result = function();

            *current_sched.borrow_mut() = previous_sched;
            *current_reactor.borrow_mut() = previous_reactor;
            CURRENT_FEATURES.with(|f| f.set(previous_features));

            result
        })
    })
}

/// Returns the current wait index handle, if a runtime context is active.
pub(crate) fn try_current_sched() -> Option<WaitHandle> {
    CURRENT_SCHED.with(|current| current.borrow().clone())
}

/// Returns the current wait index handle for a yield point.
///
/// # Panics
/// Panics outside of a runtime context.
pub(crate) fn current_sched() -> WaitHandle {
    try_current_sched().expect(
        "no scheduler in current context. Yield points must be reached within Runtime::block_on",
    )
}

/// Returns the current reactor handle for I/O and timer registration.
///
/// # Panics
/// Panics if the runtime was not built with `.enable_io()`.
pub(crate) fn current_reactor_io() -> ReactorHandle {
    ensure_feature(|f| f.io_enabled, "I/O", "RuntimeBuilder::enable_io()");

    current_reactor_inner()
}

/// Checks that filesystem support is enabled in the current context.
///
/// # Panics
/// Panics if the runtime was not built with `.enable_fs()`.
pub(crate) fn ensure_fs() {
    ensure_feature(|f| f.fs_enabled, "filesystem", "RuntimeBuilder::enable_fs()");
}

fn ensure_feature(check: impl Fn(&Features) -> bool, name: &str, hint: &str) {
    let enabled = CURRENT_FEATURES.with(|features| features.get().as_ref().map(&check))
        .unwrap_or(false);

    if !enabled {
        panic!("{} support not enabled. Use {}.", name, hint);
    }
}

fn current_reactor_inner() -> ReactorHandle {
    CURRENT_REACTOR.with(|current| {
        current.borrow().clone().expect(
            "no reactor in current context. I/O operations must be called within Runtime::block_on",
        )
    })
}

/// The task the dispatch loop is polling right now.
///
/// # Panics
/// Panics when no task is being polled (a yield point outside the loop).
pub(crate) fn current_task() -> TaskRef {
    CURRENT_TASK.with(|current| {
        current
            .borrow()
            .clone()
            .expect("no current task. Yield points must be reached within Runtime::block_on")
    })
}

pub(crate) fn set_current_task(task: Option<TaskRef>) {
    CURRENT_TASK.with(|current| {
        *current.borrow_mut() = task;
    });
}

pub(crate) fn set_wake_reason(reason: Option<WakeReason>) {
    WAKE_REASON.with(|cell| cell.set(reason));
}

/// Consumes the pending wake reason when it matches `(kind, key)`.
///
/// A yield future calls this on every poll: a match means its watch fired
/// and the wait is over; anything else is a spurious poll and the task stays
/// suspended.
pub(crate) fn consume_wake_reason(kind: crate::reactor::event::WaitKind, key: u64) -> bool {
    WAKE_REASON.with(|cell| {
        if cell.get() == Some((kind, key)) {
            cell.set(None);
            true
        } else {
            false
        }
    })
}
