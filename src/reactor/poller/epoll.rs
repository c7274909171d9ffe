use libc::{
    EPOLL_CLOEXEC, EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLL_CTL_MOD, EPOLLERR, EPOLLHUP, EPOLLIN,
    EPOLLOUT, epoll_create1, epoll_ctl, epoll_event, epoll_wait,
};
use std::os::unix::io::RawFd;
use std::time::Duration;
use std::{io, ptr};

/// Readiness reported for one descriptor in a poll batch.
///
/// Error and hang-up conditions count as both readable and writable: the
/// pending syscall is the place where the actual outcome (EOF, EPIPE, ...)
/// surfaces.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PollEvent {
    pub(crate) fd: RawFd,
    pub(crate) readable: bool,
    pub(crate) writable: bool,
}

/// Default size of one poll batch.
pub(crate) const DEFAULT_EVENT_CAPACITY: usize = 64;

pub(crate) struct EpollPoller {
    epoll: RawFd,
    events: Vec<epoll_event>,
}

impl EpollPoller {
    /// Creates a poller delivering at most `capacity` events per poll.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let epoll = unsafe { epoll_create1(EPOLL_CLOEXEC) };
        assert!(epoll >= 0, "epoll_create1() failed");

        let events = Vec::with_capacity(capacity.max(1));

        EpollPoller { epoll, events }
    }

    pub(crate) fn register(&self, fd: RawFd, read: bool, write: bool) {
        self.ctl(EPOLL_CTL_ADD, fd, read, write);
    }

    pub(crate) fn modify(&self, fd: RawFd, read: bool, write: bool) {
        self.ctl(EPOLL_CTL_MOD, fd, read, write);
    }

    pub(crate) fn deregister(&self, fd: RawFd) {
        unsafe {
            epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, ptr::null_mut());
        }
    }

    fn ctl(&self, op: libc::c_int, fd: RawFd, read: bool, write: bool) {
        let mut mask = 0u32;

        if read {
            mask |= EPOLLIN as u32;
        }

        if write {
            mask |= EPOLLOUT as u32;
        }

        let mut event = epoll_event {
            events: mask,
            u64: fd as u64,
        };

        let ret = unsafe { epoll_ctl(self.epoll, op, fd, &mut event) };
        assert!(ret == 0, "epoll_ctl failed for fd {fd}");
    }

    /// Waits for readiness, filling `events`.
    ///
    /// `timeout` of `None` blocks indefinitely; `Some(Duration::ZERO)` polls.
    /// Interruption by a signal returns an empty batch.
    pub(crate) fn poll(
        &mut self,
        events: &mut Vec<PollEvent>,
        timeout: Option<Duration>,
    ) -> io::Result<()> {
        // Round up so a sub-millisecond deadline still sleeps instead of
        // spinning until it expires.
        let timeout_ms: libc::c_int = match timeout {
            Some(t) => {
                let mut ms = t.as_millis();

                if t.subsec_nanos() % 1_000_000 != 0 {
                    ms += 1;
                }

                ms.min(libc::c_int::MAX as u128) as libc::c_int
            }
            None => -1,
        };

        unsafe {
            self.events.set_len(0);
        }

        let n = unsafe {
            epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as libc::c_int,
                timeout_ms,
            )
        };

        events.clear();

        if n < 0 {
            let error = io::Error::last_os_error();

            if error.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }

            return Err(error);
        }

        unsafe {
            self.events.set_len(n as usize);
        }

        let hangup = (EPOLLERR | EPOLLHUP) as u32;

        for event in &self.events {
            events.push(PollEvent {
                fd: event.u64 as RawFd,
                readable: event.events & (EPOLLIN as u32 | hangup) != 0,
                writable: event.events & (EPOLLOUT as u32 | hangup) != 0,
            });
        }

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epoll);
        }
    }
}
