use std::net::IpAddr;

use crate::error::Error;
use crate::request::{Family, Protocol, SockType};

/// One connectable endpoint.
///
/// `socktype`/`protocol`/`port`/`priority`/`weight` are left at their
/// `Unspec`/zero defaults for address-only paths (produced by
/// [`QueryHandle::add_address`](crate::handle::QueryHandle::add_address)),
/// per the invariant that service-level fields are undefined exactly when
/// the originating request was address-only.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub family: Family,
    pub address: IpAddr,
    pub ifindex: i32,
    pub socktype: SockType,
    pub protocol: Protocol,
    pub port: u16,
    pub priority: u16,
    pub weight: u16,
    pub ttl: i64,
}

impl Path {
    /// Build a full path tuple, as a backend's `add_path` primitive would.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        address: IpAddr,
        ifindex: i32,
        socktype: SockType,
        protocol: Protocol,
        port: u16,
        priority: u16,
        weight: u16,
        ttl: i64,
    ) -> Self {
        Path {
            family: Family::of(&address),
            address,
            ifindex,
            socktype,
            protocol,
            port,
            priority,
            weight,
            ttl,
        }
    }

    /// Build an address-only path, as a backend's `add_address` shorthand
    /// would.
    pub fn address_only(address: IpAddr, ifindex: i32) -> Self {
        Path {
            family: Family::of(&address),
            address,
            ifindex,
            socktype: SockType::Unspec,
            protocol: Protocol::Unspec,
            port: 0,
            priority: 0,
            weight: 0,
            ttl: 0,
        }
    }
}

/// Terminal state of a [`Response`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The query has not yet reached a terminal state.
    Pending,
    /// The query finished with at least an empty, well-formed result.
    Success,
    /// The query finished without a usable result.
    Failed,
}

/// The accumulated output of one query.
///
/// A [`Path`] may only be appended while the query is running; once
/// [`Response::status`] leaves [`Status::Pending`] the response is
/// immutable (enforced by the engine, which stops calling the mutating
/// methods once the query is terminal, rather than by a runtime check
/// here).
#[derive(Clone, Debug, Default)]
pub struct Response {
    canonical_name: Option<String>,
    service_name: Option<String>,
    paths: Vec<Path>,
    dns_answer: Option<Vec<u8>>,
    status: ResponseStatus,
}

#[derive(Clone, Debug, Default)]
enum ResponseStatus {
    #[default]
    Pending,
    Success,
    Failed(ErrorDetail),
}

#[derive(Clone, Debug)]
struct ErrorDetail {
    backend: String,
    message: String,
}

impl Response {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the canonical name. Setting it twice is permitted;
    /// the later value replaces the earlier one.
    pub(crate) fn set_canonical_name(&mut self, name: Option<String>) {
        if name.is_some() {
            self.canonical_name = name;
        }
    }

    pub(crate) fn set_service_name(&mut self, name: Option<String>) {
        if name.is_some() {
            self.service_name = name;
        }
    }

    pub(crate) fn append_path(&mut self, path: Path) {
        self.paths.push(path);
    }

    pub(crate) fn set_dns_answer(&mut self, bytes: Vec<u8>) {
        self.dns_answer = Some(bytes);
    }

    pub(crate) fn mark_success(&mut self) {
        self.status = ResponseStatus::Success;
    }

    pub(crate) fn mark_failed(&mut self, backend: &str, err: &Error) {
        self.status = ResponseStatus::Failed(ErrorDetail {
            backend: backend.to_string(),
            message: err.to_string(),
        });
    }

    /// The canonical name, if any backend set one.
    pub fn canonical_name(&self) -> Option<&str> {
        self.canonical_name.as_deref()
    }

    /// The resolved service name, if any backend set one.
    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// Paths in backend emission order (chain order, then emission order
    /// within each backend); the engine never reorders or deduplicates
    /// them.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    /// The raw wire-format DNS answer, set only by DNS-mode queries.
    pub fn dns_answer(&self) -> Option<&[u8]> {
        self.dns_answer.as_deref()
    }

    /// Terminal status of the query.
    pub fn status(&self) -> Status {
        match self.status {
            ResponseStatus::Pending => Status::Pending,
            ResponseStatus::Success => Status::Success,
            ResponseStatus::Failed(_) => Status::Failed,
        }
    }

    /// `true` once the query has reached a terminal state.
    pub fn is_done(&self) -> bool {
        !matches!(self.status, ResponseStatus::Pending)
    }

    /// The name and message of the last-attempted backend, when
    /// [`Response::status`] is [`Status::Failed`].
    pub fn failure_detail(&self) -> Option<(&str, &str)> {
        match &self.status {
            ResponseStatus::Failed(detail) => Some((detail.backend.as_str(), detail.message.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_canonical_name_wins() {
        let mut response = Response::new();
        response.set_canonical_name(Some("first".into()));
        response.set_canonical_name(Some("second".into()));
        assert_eq!(response.canonical_name(), Some("second"));
    }

    #[test]
    fn setting_none_does_not_clear_an_existing_name() {
        let mut response = Response::new();
        response.set_canonical_name(Some("kept".into()));
        response.set_canonical_name(None);
        assert_eq!(response.canonical_name(), Some("kept"));
    }

    #[test]
    fn is_done_tracks_status() {
        let mut response = Response::new();
        assert!(!response.is_done());
        assert_eq!(response.status(), Status::Pending);
        response.mark_success();
        assert!(response.is_done());
        assert_eq!(response.status(), Status::Success);
    }

    #[test]
    fn failure_detail_reports_backend_and_message() {
        let mut response = Response::new();
        response.mark_failed("dns", &Error::Timeout);
        assert_eq!(response.failure_detail(), Some(("dns", "query timed out")));
    }
}
