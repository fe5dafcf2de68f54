//! Supplies loopback addresses when the caller asked for default-loopback
//! behavior on an empty node name, or named `localhost` explicitly.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::fd::RawFd;

use crate::backend::Backend;
use crate::error::Error;
use crate::eventloop::IoEvents;
use crate::handle::QueryHandle;
use crate::request::{Family, RequestKind};

pub(super) struct LoopbackBackend;

impl Backend for LoopbackBackend {
    fn name(&self) -> &'static str {
        "loopback"
    }

    fn supports(&self, kind: RequestKind) -> bool {
        matches!(kind, RequestKind::Forward)
    }

    fn setup_forward(&mut self, query: &mut QueryHandle<'_>) {
        let node = query.nodename();
        let wants_loopback = (node.map(str::is_empty).unwrap_or(true) && query.default_loopback())
            || node.map(|n| n.eq_ignore_ascii_case("localhost")).unwrap_or(false);
        if !wants_loopback {
            query.failed(Error::BackendFailed {
                backend: "loopback".into(),
                message: "node name is neither empty-with-default-loopback nor \"localhost\"".into(),
            });
            return;
        }
        let family = query.family();
        if !matches!(family, Family::Inet6) {
            query.add_address(Family::Inet, Ipv4Addr::LOCALHOST.into(), 0);
        }
        if !matches!(family, Family::Inet) {
            query.add_address(Family::Inet6, Ipv6Addr::LOCALHOST.into(), 0);
        }
        query.finished();
    }

    fn dispatch(&mut self, _query: &mut QueryHandle<'_>, _fd: RawFd, _events: IoEvents) {
        unreachable!("loopback never registers I/O");
    }

    fn cleanup(&mut self, _query: &mut QueryHandle<'_>) {}
}
