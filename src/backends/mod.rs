//! The built-in backend registry: a closed, build-time-known set of
//! [`Backend`](crate::backend::Backend) implementations selected by name
//! from a chain string, rather than plugins loaded dynamically by name at
//! run time.

mod any;
mod dns;
mod hostname;
mod hosts;
mod loopback;
mod numerichost;

use crate::backend::Backend;

/// Construct a fresh backend instance by chain-entry name, or `None` if
/// the name does not match any built-in backend.
pub(crate) fn create(name: &str, settings: &[String]) -> Option<Box<dyn Backend>> {
    match name {
        "any" => Some(Box::new(any::AnyBackend)),
        "loopback" => Some(Box::new(loopback::LoopbackBackend)),
        "numerichost" => Some(Box::new(numerichost::NumericHostBackend)),
        "hosts" => Some(Box::new(hosts::HostsBackend::new(settings))),
        "hostname" => Some(Box::new(hostname::HostnameBackend)),
        "dns" => Some(Box::new(dns::DnsBackend::new(settings))),
        _ => None,
    }
}
