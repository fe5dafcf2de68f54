//! Resolves a node name that matches the local machine's own hostname to
//! loopback addresses, the way a libc stub resolver would via
//! `/etc/hosts`-free `gethostname(3)` matching.

use std::os::fd::RawFd;

use crate::backend::Backend;
use crate::eventloop::IoEvents;
use crate::handle::QueryHandle;
use crate::request::{Family, RequestKind};

pub(super) struct HostnameBackend;

impl Backend for HostnameBackend {
    fn name(&self) -> &'static str {
        "hostname"
    }

    fn supports(&self, kind: RequestKind) -> bool {
        matches!(kind, RequestKind::Forward)
    }

    fn setup_forward(&mut self, query: &mut QueryHandle<'_>) {
        let matches_local = query
            .nodename()
            .filter(|n| !n.is_empty())
            .and_then(|node| local_hostname().map(|local| (node, local)))
            .map(|(node, local)| local.eq_ignore_ascii_case(node))
            .unwrap_or(false);

        if matches_local {
            let family = query.family();
            if !matches!(family, Family::Inet6) {
                query.add_address(Family::Inet, std::net::Ipv4Addr::LOCALHOST.into(), 0);
            }
            if !matches!(family, Family::Inet) {
                query.add_address(Family::Inet6, std::net::Ipv6Addr::LOCALHOST.into(), 0);
            }
        }
        query.finished();
    }

    fn dispatch(&mut self, _query: &mut QueryHandle<'_>, _fd: RawFd, _events: IoEvents) {
        unreachable!("hostname never registers I/O");
    }

    fn cleanup(&mut self, _query: &mut QueryHandle<'_>) {}
}

fn local_hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // Safety: `buf` is valid for `buf.len()` bytes and outlives the call.
    let ret = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if ret != 0 {
        return None;
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..len]).ok().map(str::to_string)
}
