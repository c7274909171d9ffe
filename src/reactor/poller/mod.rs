mod epoll;

pub(crate) use epoll::{DEFAULT_EVENT_CAPACITY, EpollPoller as Poller, PollEvent};
