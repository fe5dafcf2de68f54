//! Resolves a node name that is already a numeric address literal,
//! bypassing DNS entirely.

use std::net::IpAddr;
use std::os::fd::RawFd;
use std::str::FromStr;

use crate::backend::Backend;
use crate::eventloop::IoEvents;
use crate::handle::QueryHandle;
use crate::request::RequestKind;
use crate::response::Path;

pub(super) struct NumericHostBackend;

impl Backend for NumericHostBackend {
    fn name(&self) -> &'static str {
        "numerichost"
    }

    fn supports(&self, kind: RequestKind) -> bool {
        matches!(kind, RequestKind::Forward)
    }

    fn setup_forward(&mut self, query: &mut QueryHandle<'_>) {
        if let Some(node) = query.nodename() {
            if let Ok(address) = IpAddr::from_str(node) {
                if query.family().matches(&address) {
                    let path = Path::new(
                        address,
                        0,
                        query.socktype(),
                        query.protocol(),
                        query.resolved_port(),
                        0,
                        0,
                        0,
                    );
                    query.add_path(path);
                }
            }
        }
        query.finished();
    }

    fn dispatch(&mut self, _query: &mut QueryHandle<'_>, _fd: RawFd, _events: IoEvents) {
        unreachable!("numerichost never registers I/O");
    }

    fn cleanup(&mut self, _query: &mut QueryHandle<'_>) {}
}
