//! The backend plugin contract, expressed as a trait.
//!
//! Every built-in backend implements [`Backend`]. Rather than a
//! `dlopen`+`dlsym` plugin model, backends here are a static registry, a
//! closed variant set known at build time, selected by name from a chain
//! string; see [`parse_chain`].

use std::os::fd::RawFd;

use crate::eventloop::IoEvents;
use crate::handle::QueryHandle;
use crate::request::RequestKind;

/// A pluggable resolution source.
///
/// `setup_forward`/`setup_reverse`/`setup_dns` are optional: any may be
/// absent, meaning the backend does not service that request kind.
/// [`Backend::supports`] tells the engine which kinds are implemented, and
/// the engine never calls a `setup_*` method unless `supports` said yes
/// for that kind, so the `unreachable!` default bodies below are never
/// actually reached.
///
/// A backend's own struct fields *are* its private state block: a
/// size-parameterized `new_priv`/`get_priv` pair would collapse into
/// ordinary Rust ownership here, since the engine gives each backend
/// exclusive `&mut self` access for the lifetime of its activation.
pub trait Backend: Send {
    /// Stable backend name, as it appears in a chain string.
    fn name(&self) -> &'static str;

    /// Whether this backend services the given request kind.
    fn supports(&self, kind: RequestKind) -> bool;

    /// Begin servicing a forward (node/service) request.
    fn setup_forward(&mut self, query: &mut QueryHandle<'_>) {
        let _ = query;
        unreachable!("{} does not support forward queries", self.name());
    }

    /// Begin servicing a reverse (address-to-name) request.
    fn setup_reverse(&mut self, query: &mut QueryHandle<'_>) {
        let _ = query;
        unreachable!("{} does not support reverse queries", self.name());
    }

    /// Begin servicing a raw DNS request.
    fn setup_dns(&mut self, query: &mut QueryHandle<'_>) {
        let _ = query;
        unreachable!("{} does not support dns queries", self.name());
    }

    /// Resume work after a registered fd became ready or a registered
    /// timeout fired (`fd` and `events` are both zeroed for a timeout
    /// firing; the backend distinguishes by its own bookkeeping of which
    /// token it armed).
    fn dispatch(&mut self, query: &mut QueryHandle<'_>, fd: RawFd, events: IoEvents);

    /// Release everything this activation registered or allocated. Called
    /// exactly once per query-backend activation, whether it finished,
    /// failed, or was force-terminated.
    fn cleanup(&mut self, query: &mut QueryHandle<'_>);
}

/// One entry of a parsed backend chain string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendSpec {
    pub name: String,
    pub mandatory: bool,
    pub settings: Vec<String>,
}

/// Parse a comma-separated backend chain string into ordered specs.
///
/// Each entry is colon-separated settings; the first setting is the
/// backend name, optionally prefixed with `+` to mark it mandatory. Empty
/// entries (from a leading, trailing, or doubled comma) are skipped.
pub fn parse_chain(spec: &str) -> Vec<BackendSpec> {
    spec.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut settings = entry.split(':').map(str::to_string);
            let first = settings.next().unwrap_or_default();
            let (mandatory, name) = match first.strip_prefix('+') {
                Some(rest) => (true, rest.to_string()),
                None => (false, first),
            };
            BackendSpec {
                name,
                mandatory,
                settings: settings.collect(),
            }
        })
        .collect()
}

/// The default backend chain.
pub const DEFAULT_CHAIN: &str = "any,loopback,numerichost,hosts,hostname,+dns";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_chain() {
        let specs = parse_chain("any,loopback,numerichost");
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].name, "any");
        assert!(!specs[0].mandatory);
    }

    #[test]
    fn parses_mandatory_marker() {
        let specs = parse_chain("unix,any,+dns");
        assert!(!specs[1].mandatory);
        assert!(specs[2].mandatory);
        assert_eq!(specs[2].name, "dns");
    }

    #[test]
    fn parses_settings_after_colon() {
        let specs = parse_chain("dns:timeout=5:tries=2");
        assert_eq!(specs[0].name, "dns");
        assert_eq!(specs[0].settings, vec!["timeout=5", "tries=2"]);
    }

    #[test]
    fn skips_empty_entries() {
        let specs = parse_chain(",any,,loopback,");
        assert_eq!(specs.len(), 2);
    }

    #[test]
    fn default_chain_ends_with_mandatory_dns() {
        let specs = parse_chain(DEFAULT_CHAIN);
        assert!(specs.last().unwrap().mandatory);
        assert_eq!(specs.last().unwrap().name, "dns");
    }
}
