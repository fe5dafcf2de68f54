//! Looks a node name up in a hosts file (`/etc/hosts` by default; the
//! first chain-entry setting overrides the path, mainly for tests).

use std::fs;
use std::net::IpAddr;
use std::os::fd::RawFd;
use std::str::FromStr;

use crate::backend::Backend;
use crate::eventloop::IoEvents;
use crate::handle::QueryHandle;
use crate::request::RequestKind;
use crate::response::Path;

const DEFAULT_HOSTS_PATH: &str = "/etc/hosts";

pub(super) struct HostsBackend {
    path: String,
}

impl HostsBackend {
    pub(super) fn new(settings: &[String]) -> Self {
        HostsBackend {
            path: settings.first().cloned().unwrap_or_else(|| DEFAULT_HOSTS_PATH.to_string()),
        }
    }
}

impl Backend for HostsBackend {
    fn name(&self) -> &'static str {
        "hosts"
    }

    fn supports(&self, kind: RequestKind) -> bool {
        matches!(kind, RequestKind::Forward)
    }

    fn setup_forward(&mut self, query: &mut QueryHandle<'_>) {
        if let Some(node) = query.nodename().map(str::to_string).filter(|n| !n.is_empty()) {
            match fs::read_to_string(&self.path) {
                Ok(contents) => {
                    let family = query.family();
                    let socktype = query.socktype();
                    let protocol = query.protocol();
                    let port = query.resolved_port();
                    for raw_line in contents.lines() {
                        let line = raw_line.split('#').next().unwrap_or("").trim();
                        if line.is_empty() {
                            continue;
                        }
                        let mut fields = line.split_whitespace();
                        let Some(addr_field) = fields.next() else { continue };
                        let Ok(address) = IpAddr::from_str(addr_field) else { continue };
                        if !family.matches(&address) {
                            continue;
                        }
                        if fields.any(|candidate| candidate.eq_ignore_ascii_case(&node)) {
                            query.add_path(Path::new(address, 0, socktype, protocol, port, 0, 0, 0));
                        }
                    }
                }
                Err(err) => log::debug!("hosts backend: could not read {}: {err}", self.path),
            }
        }
        query.finished();
    }

    fn dispatch(&mut self, _query: &mut QueryHandle<'_>, _fd: RawFd, _events: IoEvents) {
        unreachable!("hosts never registers I/O");
    }

    fn cleanup(&mut self, _query: &mut QueryHandle<'_>) {}
}
