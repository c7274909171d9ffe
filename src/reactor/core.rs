use crate::reactor::event::{Fired, WaitKind};
use crate::reactor::poller::{PollEvent, Poller};

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::io;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex};
use std::task::Waker;
use std::time::{Duration, Instant};

/// Shared handle to the reactor.
pub(crate) type ReactorHandle = Arc<Mutex<Reactor>>;

/// How a pump call should wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PumpMode {
    /// Process everything that is ready right now and return.
    NonBlocking,

    /// Block until at least one event fires, process the batch, return.
    /// The only place the process sleeps.
    Once,
}

/// What a deadline entry resolves to when it expires.
enum TimerTarget {
    /// Deadline paired with an fd watch; expiry fires under the watch key.
    Watch { kind: WaitKind, fd: RawFd },

    /// Plain one-shot timer; expiry fires under the timer id.
    Sleep,

    /// Wakes a task waker directly, bypassing the wait index.
    Alarm(Waker),
}

/// Readiness demultiplexer: one-shot fd watches with optional deadlines,
/// identity-carrying timers, and a two-mode pump.
///
/// The reactor tracks registrations only; the tasks waiting on them live in
/// the scheduler's wait index under the same `(kind, key)` addressing. Every
/// watch fires at most once: readiness and deadline expiry cancel each other.
pub(crate) struct Reactor {
    poller: Poller,
    scratch: Vec<PollEvent>,
    /// LIFO stacks of watch sequence numbers per `(kind, fd)`.
    watches: HashMap<(WaitKind, RawFd), Vec<u64>>,
    /// Interest currently registered with the poller, per fd: (read, write).
    registered: HashMap<RawFd, (bool, bool)>,
    timers: BinaryHeap<Reverse<(Instant, u64)>>,
    /// Live deadline targets; a sequence missing here was cancelled.
    deadlines: HashMap<u64, TimerTarget>,
    next_seq: u64,
}

impl Reactor {
    /// Creates a reactor whose pump delivers at most `event_capacity`
    /// readiness events per cycle.
    pub(crate) fn with_capacity(event_capacity: usize) -> Self {
        Self {
            poller: Poller::with_capacity(event_capacity),
            scratch: Vec::new(),
            watches: HashMap::new(),
            registered: HashMap::new(),
            timers: BinaryHeap::new(),
            deadlines: HashMap::new(),
            next_seq: 0,
        }
    }

    fn alloc_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Registers a one-shot readiness watch on `fd`, with an optional
    /// deadline after which the watch fires regardless of readiness.
    pub(crate) fn watch_fd(&mut self, fd: RawFd, kind: WaitKind, timeout: Option<Duration>) {
        debug_assert!(matches!(kind, WaitKind::Read | WaitKind::Write));

        let seq = self.alloc_seq();

        if let Some(timeout) = timeout {
            self.deadlines.insert(seq, TimerTarget::Watch { kind, fd });
            self.timers.push(Reverse((Instant::now() + timeout, seq)));
        }

        log::trace!(target: "reactor", "watch fd={fd} kind={kind:?} timeout={timeout:?}");

        self.watches.entry((kind, fd)).or_default().push(seq);
        self.update_interest(fd);
    }

    /// Registers a one-shot timer, returning the id its firing will carry.
    pub(crate) fn watch_timer(&mut self, duration: Duration) -> u64 {
        let seq = self.alloc_seq();

        self.deadlines.insert(seq, TimerTarget::Sleep);
        self.timers.push(Reverse((Instant::now() + duration, seq)));

        log::trace!(target: "reactor", "timer id={seq} duration={duration:?}");

        seq
    }

    /// Registers a one-shot timer that wakes `waker` on expiry instead of
    /// going through the wait index.
    pub(crate) fn watch_alarm(&mut self, duration: Duration, waker: Waker) {
        let seq = self.alloc_seq();

        self.deadlines.insert(seq, TimerTarget::Alarm(waker));
        self.timers.push(Reverse((Instant::now() + duration, seq)));
    }

    /// True when any watch is registered for `fd`.
    pub(crate) fn has_waiters(&self, fd: RawFd) -> bool {
        self.watches.contains_key(&(WaitKind::Read, fd))
            || self.watches.contains_key(&(WaitKind::Write, fd))
    }

    /// Runs one pump cycle, appending delivered events to `fired`.
    ///
    /// In `Once` mode the call loops internally until a readiness event, a
    /// timer, or an alarm has fired.
    pub(crate) fn pump(&mut self, mode: PumpMode, fired: &mut Vec<Fired>) -> io::Result<()> {
        fired.clear();

        loop {
            let timeout = match mode {
                PumpMode::NonBlocking => Some(Duration::ZERO),
                PumpMode::Once => self.next_timeout(),
            };

            let mut scratch = std::mem::take(&mut self.scratch);
            let result = self.poller.poll(&mut scratch, timeout);

            let mut woke = false;

            for event in &scratch {
                if event.readable {
                    self.fire_fd(WaitKind::Read, event.fd, fired);
                }

                if event.writable {
                    self.fire_fd(WaitKind::Write, event.fd, fired);
                }
            }

            self.scratch = scratch;
            result?;

            let now = Instant::now();
            while let Some(&Reverse((deadline, seq))) = self.timers.peek() {
                if deadline > now {
                    break;
                }

                self.timers.pop();

                match self.deadlines.remove(&seq) {
                    // Cancelled: readiness beat the deadline.
                    None => {}
                    Some(TimerTarget::Sleep) => {
                        fired.push(Fired {
                            kind: WaitKind::Timer,
                            key: seq,
                        });
                    }
                    Some(TimerTarget::Alarm(waker)) => {
                        waker.wake();
                        woke = true;
                    }
                    Some(TimerTarget::Watch { kind, fd }) => {
                        if let Some(stack) = self.watches.get_mut(&(kind, fd)) {
                            if let Some(pos) = stack.iter().rposition(|&s| s == seq) {
                                stack.remove(pos);
                            }

                            if stack.is_empty() {
                                self.watches.remove(&(kind, fd));
                            }
                        }

                        self.update_interest(fd);

                        fired.push(Fired {
                            kind,
                            key: fd as u64,
                        });
                    }
                }
            }

            if mode == PumpMode::Once && fired.is_empty() && !woke {
                continue;
            }

            return Ok(());
        }
    }

    /// Pops the top watch for `(kind, fd)` and emits its firing. Readiness
    /// for a descriptor nobody watches is dropped silently; level-triggered
    /// interest is torn down as soon as its stack empties, so this only
    /// happens for the other half of an error/hang-up report.
    fn fire_fd(&mut self, kind: WaitKind, fd: RawFd, fired: &mut Vec<Fired>) {
        let Some(stack) = self.watches.get_mut(&(kind, fd)) else {
            return;
        };

        let seq = stack.pop().expect("empty watch stack left in map");

        if stack.is_empty() {
            self.watches.remove(&(kind, fd));
        }

        // Cancel the paired deadline, if the watch had one.
        self.deadlines.remove(&seq);

        self.update_interest(fd);

        fired.push(Fired {
            kind,
            key: fd as u64,
        });
    }

    /// Syncs the poller's interest mask for `fd` with the live watch stacks.
    fn update_interest(&mut self, fd: RawFd) {
        let read = self.watches.contains_key(&(WaitKind::Read, fd));
        let write = self.watches.contains_key(&(WaitKind::Write, fd));

        match (self.registered.get(&fd).copied(), read || write) {
            (None, true) => {
                self.poller.register(fd, read, write);
                self.registered.insert(fd, (read, write));
            }
            (Some(_), false) => {
                self.poller.deregister(fd);
                self.registered.remove(&fd);
            }
            (Some(current), true) if current != (read, write) => {
                self.poller.modify(fd, read, write);
                self.registered.insert(fd, (read, write));
            }
            _ => {}
        }
    }

    /// Time until the earliest live deadline, or `None` when there is none
    /// (a blocking pump may then sleep indefinitely).
    fn next_timeout(&mut self) -> Option<Duration> {
        while let Some(&Reverse((deadline, seq))) = self.timers.peek() {
            if !self.deadlines.contains_key(&seq) {
                self.timers.pop();
                continue;
            }

            return Some(deadline.saturating_duration_since(Instant::now()));
        }

        None
    }
}
