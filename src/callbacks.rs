//! Host-supplied event-loop integration: an alternative to
//! the internal, `polling`-backed [`EventLoop`](crate::eventloop::EventLoop)
//! for callers who want to drive queries from their own event loop instead
//! of handing control to [`Context::resolve`](crate::context::Context::resolve).

use std::os::fd::RawFd;
use std::time::Duration;

use crate::eventloop::{IoEvents, TimeoutToken};
use crate::query::QueryId;

/// Implemented by a caller's own event-loop adapter and installed with
/// [`Context::set_callbacks`](crate::context::Context::set_callbacks).
///
/// Once installed, every `watch_fd`/`watch_timeout`/`drop_timeout` call a
/// backend makes is forwarded here instead of to the internal event loop.
/// The host is responsible for calling
/// [`Context::dispatch_fd`](crate::context::Context::dispatch_fd) and
/// [`Context::dispatch_timeout`](crate::context::Context::dispatch_timeout)
/// when it observes the corresponding readiness or firing.
pub trait Callbacks {
    /// Register (or, with `events = IoEvents::NONE`, deregister) interest
    /// in a file descriptor on behalf of `query`.
    fn watch_fd(&mut self, query: QueryId, fd: RawFd, events: IoEvents);

    /// Arm a one-shot timeout for `query`. The returned token is opaque to
    /// the host; it only needs to hand it back to `dispatch_timeout` once
    /// the timeout fires, minting it with [`TimeoutToken::new`] from
    /// whatever bookkeeping the host already does.
    fn watch_timeout(&mut self, query: QueryId, duration: Duration) -> TimeoutToken;

    /// Cancel a previously-armed timeout.
    fn drop_timeout(&mut self, token: TimeoutToken);
}
