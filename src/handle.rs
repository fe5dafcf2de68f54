//! The query handle: an opaque token through which a backend reads inputs
//! and emits outputs for exactly one query. A fresh [`QueryHandle`] is
//! constructed by the engine for each call into the active backend and
//! borrows everything the backend is allowed to touch, so exclusive,
//! scoped access is enforced by the borrow checker rather than by
//! convention.

use std::net::IpAddr;
use std::os::fd::RawFd;
use std::time::Duration;

use crate::callbacks::Callbacks;
use crate::eventloop::{IoEvents, TimeoutToken};
use crate::error::Error;
use crate::query::QueryId;
use crate::request::{DnsRequest, Family, ForwardRequest, Protocol, ReverseRequest, SockType};
use crate::response::{Path, Response};

/// What the backend decided, recorded by `finished`/`failed` and read back
/// by the engine once the call into the backend returns.
pub(crate) enum Outcome {
    Finished,
    Failed(Error),
}

pub struct QueryHandle<'q> {
    pub(crate) query_id: QueryId,
    pub(crate) forward: Option<&'q ForwardRequest>,
    pub(crate) reverse: Option<&'q ReverseRequest>,
    pub(crate) dns: Option<&'q DnsRequest>,
    pub(crate) clamp_ttl: Option<i64>,
    pub(crate) response: &'q mut Response,
    pub(crate) io: &'q mut dyn Callbacks,
    pub(crate) outcome: &'q mut Option<Outcome>,
}

impl<'q> QueryHandle<'q> {
    // ---- inputs -----------------------------------------------------

    /// The node name of a forward request, if any was given.
    pub fn nodename(&self) -> Option<&str> {
        self.forward.and_then(|f| f.nodename.as_deref())
    }

    /// The service name of a forward request, if any was given.
    pub fn servname(&self) -> Option<&str> {
        self.forward.and_then(|f| f.servname.as_deref())
    }

    /// The family filter of a forward or reverse request.
    pub fn family(&self) -> Family {
        self.forward
            .map(|f| f.family)
            .or(self.reverse.map(|r| r.family))
            .unwrap_or(Family::Unspec)
    }

    /// The socket type filter of a forward request.
    pub fn socktype(&self) -> SockType {
        self.forward.map(|f| f.socktype).unwrap_or(SockType::Unspec)
    }

    /// The protocol filter of a forward request.
    pub fn protocol(&self) -> Protocol {
        self.forward.map(|f| f.protocol).unwrap_or(Protocol::Unspec)
    }

    /// The numeric port implied by a forward request's service name, or 0
    /// if there is none or it isn't a bare number (no `/etc/services`-style
    /// name lookup is attempted).
    pub fn resolved_port(&self) -> u16 {
        self.servname().and_then(|s| s.parse().ok()).unwrap_or(0)
    }

    /// `true` if the caller set the default-loopback flag on a forward
    /// request.
    pub fn default_loopback(&self) -> bool {
        self.forward.map(|f| f.default_loopback).unwrap_or(false)
    }

    /// `true` if the caller asked for SRV-based service discovery on a
    /// forward request.
    pub fn dns_srv_lookup(&self) -> bool {
        self.forward.map(|f| f.dns_srv_lookup).unwrap_or(false)
    }

    /// The address of a reverse request.
    pub fn address(&self) -> Option<IpAddr> {
        self.reverse.map(|r| r.address)
    }

    /// The interface index of a reverse request.
    pub fn ifindex(&self) -> i32 {
        self.reverse.map(|r| r.ifindex).unwrap_or(0)
    }

    /// The port of a reverse request.
    pub fn port(&self) -> u16 {
        self.reverse.map(|r| r.port).unwrap_or(0)
    }

    /// The `(name, class, type)` of a raw DNS request.
    pub fn dns_query(&self) -> Option<(&str, u16, u16)> {
        self.dns.map(|d| (d.name.as_str(), d.class, d.qtype))
    }

    // ---- outputs ------------------------------------------------------

    /// Append a fully-specified path. TTL is clamped by the request's
    /// policy.
    pub fn add_path(&mut self, mut path: Path) {
        if let Some(clamp) = self.clamp_ttl {
            if clamp >= 0 {
                path.ttl = path.ttl.min(clamp);
            }
        }
        self.response.append_path(path);
    }

    /// Append an address-only path (shorthand for a path with unspecified
    /// transport fields).
    pub fn add_address(&mut self, family: Family, address: IpAddr, ifindex: i32) {
        debug_assert!(family.matches(&address));
        self.add_path(Path::address_only(address, ifindex));
    }

    /// Set the canonical name and/or resolved service name. Either may be
    /// `None` to leave that field untouched.
    pub fn add_name_info(&mut self, canonical: Option<String>, service: Option<String>) {
        self.response.set_canonical_name(canonical);
        self.response.set_service_name(service);
    }

    /// Store the raw wire-format DNS answer (DNS-mode queries only).
    pub fn set_dns_answer(&mut self, bytes: Vec<u8>) {
        self.response.set_dns_answer(bytes);
    }

    /// Declare success. The engine advances to the next stage.
    pub fn finished(&mut self) {
        *self.outcome = Some(Outcome::Finished);
    }

    /// Declare failure. The engine may fall through to the next backend.
    pub fn failed(&mut self, err: Error) {
        *self.outcome = Some(Outcome::Failed(err));
    }

    // ---- I/O ------------------------------------------------------------

    /// Register (or, with `events = IoEvents::NONE`, deregister) interest
    /// in a file descriptor.
    pub fn watch_fd(&mut self, fd: RawFd, events: IoEvents) {
        self.io.watch_fd(self.query_id, fd, events);
    }

    /// Arm a one-shot timeout, returning a token usable with
    /// [`QueryHandle::drop_timeout`].
    pub fn watch_timeout(&mut self, duration: Duration) -> TimeoutToken {
        self.io.watch_timeout(self.query_id, duration)
    }

    /// Cancel a previously-armed timeout.
    pub fn drop_timeout(&mut self, token: TimeoutToken) {
        self.io.drop_timeout(token);
    }
}
