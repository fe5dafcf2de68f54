//! Supplies the IPv4/IPv6 wildcard addresses for an empty node name.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::fd::RawFd;

use crate::backend::Backend;
use crate::error::Error;
use crate::eventloop::IoEvents;
use crate::handle::QueryHandle;
use crate::request::{Family, RequestKind};

pub(super) struct AnyBackend;

impl Backend for AnyBackend {
    fn name(&self) -> &'static str {
        "any"
    }

    fn supports(&self, kind: RequestKind) -> bool {
        matches!(kind, RequestKind::Forward)
    }

    fn setup_forward(&mut self, query: &mut QueryHandle<'_>) {
        let wants_wildcard = query.nodename().map(str::is_empty).unwrap_or(true) && !query.default_loopback();
        if !wants_wildcard {
            query.failed(Error::BackendFailed {
                backend: "any".into(),
                message: "a node name or default-loopback was given, not the empty-node wildcard case".into(),
            });
            return;
        }
        let family = query.family();
        if !matches!(family, Family::Inet6) {
            query.add_address(Family::Inet, Ipv4Addr::UNSPECIFIED.into(), 0);
        }
        if !matches!(family, Family::Inet) {
            query.add_address(Family::Inet6, Ipv6Addr::UNSPECIFIED.into(), 0);
        }
        query.finished();
    }

    fn dispatch(&mut self, _query: &mut QueryHandle<'_>, _fd: RawFd, _events: IoEvents) {
        unreachable!("any never registers I/O");
    }

    fn cleanup(&mut self, _query: &mut QueryHandle<'_>) {}
}
