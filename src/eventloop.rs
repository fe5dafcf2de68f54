//! The internal event-loop adapter, used whenever a
//! [`Context`](crate::context::Context) has not had a host-supplied
//! [`Callbacks`](crate::callbacks::Callbacks) installed. A single
//! [`Poller`] tracks per-fd interest for every active query and a flat
//! `fd -> query` table routes readiness back to the right query, with no
//! cross-references between queries, backends, and fds.
//!
//! Timeouts are not backed by OS timer descriptors (a Linux `timerfd` per
//! pending deadline would be the usual way): tracking deadlines as plain
//! `Instant`s and folding the next one into the poller's wait timeout gets
//! the same single-shot, poller-integrated behaviour without tying the
//! crate to a Linux-only primitive.

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsFd, BorrowedFd, RawFd};
use std::time::{Duration, Instant};

use polling::{Event, Events, Poller};

use crate::query::QueryId;

/// A bitmask over {readable, writable}, matching the `watch_fd(fd, events)`
/// primitive backends register interest through. An all-zero mask means
/// "deregister".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IoEvents {
    bits: u8,
}

impl IoEvents {
    pub const NONE: IoEvents = IoEvents { bits: 0 };
    pub const READABLE: IoEvents = IoEvents { bits: 0b01 };
    pub const WRITABLE: IoEvents = IoEvents { bits: 0b10 };

    pub fn readable(self) -> bool {
        self.bits & Self::READABLE.bits != 0
    }

    pub fn writable(self) -> bool {
        self.bits & Self::WRITABLE.bits != 0
    }

    pub fn is_none(self) -> bool {
        self.bits == 0
    }

    pub fn union(self, other: Self) -> Self {
        IoEvents {
            bits: self.bits | other.bits,
        }
    }
}

impl std::ops::BitOr for IoEvents {
    type Output = IoEvents;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Opaque handle to a registered timeout, returned by `watch_timeout` and
/// consumed by `drop_timeout`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeoutToken(u64);

impl TimeoutToken {
    /// Build a token from a host-chosen id. Only meaningful to a
    /// [`Callbacks`](crate::callbacks::Callbacks) implementation minting
    /// its own tokens for [`Context::set_callbacks`](crate::context::Context::set_callbacks);
    /// the internal [`EventLoop`] never calls this.
    pub fn new(id: u64) -> Self {
        TimeoutToken(id)
    }
}

struct RawFdSource(RawFd);

impl AsFd for RawFdSource {
    fn as_fd(&self) -> BorrowedFd<'_> {
        // Safety: the fd is owned by the backend that registered it for
        // the lifetime of the registration; we never close it ourselves.
        unsafe { BorrowedFd::borrow_raw(self.0) }
    }
}

struct Timer {
    token: TimeoutToken,
    query: QueryId,
    deadline: Instant,
}

/// One fd-readiness or timeout firing to hand to the engine.
pub(crate) struct DispatchEvent {
    pub query: QueryId,
    pub kind: DispatchKind,
}

pub(crate) enum DispatchKind {
    Io { fd: RawFd, events: IoEvents },
    Timeout(TimeoutToken),
}

pub(crate) struct EventLoop {
    poller: Poller,
    fd_owner: HashMap<RawFd, QueryId>,
    timers: Vec<Timer>,
    next_timer_id: u64,
}

impl EventLoop {
    pub fn new() -> io::Result<Self> {
        Ok(EventLoop {
            poller: Poller::new()?,
            fd_owner: HashMap::new(),
            timers: Vec::new(),
            next_timer_id: 0,
        })
    }

    pub fn watch_fd(&mut self, query: QueryId, fd: RawFd, events: IoEvents) -> io::Result<()> {
        if events.is_none() {
            if self.fd_owner.remove(&fd).is_some() {
                self.poller.delete(&RawFdSource(fd))?;
            }
            return Ok(());
        }

        let already_registered = self.fd_owner.insert(fd, query).is_some();
        let interest = if events.writable() {
            Event::all(fd as usize)
        } else {
            Event::readable(fd as usize)
        };

        if already_registered {
            self.poller.modify(&RawFdSource(fd), interest)
        } else {
            // Safety: the caller (a backend, via `QueryHandle::watch_fd`)
            // guarantees `fd` stays open and valid until it is
            // deregistered with `events = IoEvents::NONE`.
            unsafe { self.poller.add(&RawFdSource(fd), interest) }
        }
    }

    pub fn watch_timeout(&mut self, query: QueryId, duration: Duration) -> TimeoutToken {
        let token = TimeoutToken(self.next_timer_id);
        self.next_timer_id += 1;
        self.timers.push(Timer {
            token,
            query,
            deadline: Instant::now() + duration,
        });
        token
    }

    pub fn drop_timeout(&mut self, token: TimeoutToken) {
        self.timers.retain(|t| t.token != token);
    }

    /// Force-release every registration owned by `query`, for cancellation
    /// or forced termination.
    pub fn forget_query(&mut self, query: QueryId) {
        let dead: Vec<RawFd> = self
            .fd_owner
            .iter()
            .filter(|(_, owner)| **owner == query)
            .map(|(fd, _)| *fd)
            .collect();
        for fd in dead {
            self.fd_owner.remove(&fd);
            let _ = self.poller.delete(&RawFdSource(fd));
        }
        self.timers.retain(|t| t.query != query);
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Block until at least one fd becomes ready, a timeout fires, or
    /// `max_wait` elapses (when given), and return the resulting dispatch
    /// events.
    pub fn turn(&mut self, max_wait: Option<Duration>) -> io::Result<Vec<DispatchEvent>> {
        let now = Instant::now();
        let timer_wait = self.next_deadline().map(|d| d.saturating_duration_since(now));
        let wait = match (timer_wait, max_wait) {
            (Some(t), Some(m)) => Some(t.min(m)),
            (Some(t), None) => Some(t),
            (None, Some(m)) => Some(m),
            (None, None) => None,
        };

        let mut events = Events::new();
        self.poller.wait(&mut events, wait)?;

        let mut out = Vec::new();
        for ev in events.iter() {
            let fd = ev.key as RawFd;
            if let Some(&query) = self.fd_owner.get(&fd) {
                let mut flags = IoEvents::NONE;
                if ev.readable {
                    flags = flags.union(IoEvents::READABLE);
                }
                if ev.writable {
                    flags = flags.union(IoEvents::WRITABLE);
                }
                out.push(DispatchEvent {
                    query,
                    kind: DispatchKind::Io { fd, events: flags },
                });
            }
        }

        let now = Instant::now();
        let mut remaining = Vec::with_capacity(self.timers.len());
        for timer in self.timers.drain(..) {
            if timer.deadline <= now {
                out.push(DispatchEvent {
                    query: timer.query,
                    kind: DispatchKind::Timeout(timer.token),
                });
            } else {
                remaining.push(timer);
            }
        }
        self.timers = remaining;

        Ok(out)
    }

    pub fn is_idle(&self) -> bool {
        self.fd_owner.is_empty() && self.timers.is_empty()
    }

    /// Whether `query` currently owns any fd or timer registration. Used to
    /// tell a backend that returned without a result apart from one that
    /// legitimately went to sleep waiting on I/O, as opposed to a backend
    /// that registered nothing and never called finished/failed.
    pub fn has_registrations(&self, query: QueryId) -> bool {
        self.fd_owner.values().any(|&owner| owner == query) || self.timers.iter().any(|t| t.query == query)
    }
}

impl crate::callbacks::Callbacks for EventLoop {
    fn watch_fd(&mut self, query: QueryId, fd: RawFd, events: IoEvents) {
        if let Err(err) = EventLoop::watch_fd(self, query, fd, events) {
            log::warn!("query {query}: failed to register fd {fd}: {err}");
        }
    }

    fn watch_timeout(&mut self, query: QueryId, duration: Duration) -> TimeoutToken {
        EventLoop::watch_timeout(self, query, duration)
    }

    fn drop_timeout(&mut self, token: TimeoutToken) {
        EventLoop::drop_timeout(self, token)
    }
}
