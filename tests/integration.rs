//! Integration tests for netresolve.
//!
//! The `local_backends` tests only exercise backends that never touch the
//! network. The `dns_backend` tests make real DNS queries and are marked
//! `#[ignore]`; run them with `cargo test -- --ignored`.

mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use netresolve::{Context, Request};

mod local_backends {
    use super::*;

    #[test]
    fn empty_node_resolves_to_wildcard_via_any() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("any");
        let response = context.resolve(Request::forward(None::<&str>, None::<&str>)).unwrap();
        let addresses: Vec<IpAddr> = response.paths().iter().map(|p| p.address).collect();
        assert!(addresses.contains(&IpAddr::V4(Ipv4Addr::UNSPECIFIED)));
    }

    #[test]
    fn empty_node_resolves_to_loopback_when_requested() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("loopback");
        let response = context
            .resolve(Request::forward(None::<&str>, None::<&str>).default_loopback(true))
            .unwrap();
        assert!(response.paths().iter().any(|p| p.address.is_loopback()));
    }

    #[test]
    fn localhost_is_loopback_without_the_flag() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("loopback");
        let response = context.resolve(Request::forward(Some("localhost"), None::<&str>)).unwrap();
        assert!(response.paths().iter().any(|p| p.address.is_loopback()));
    }

    #[test]
    fn numeric_literal_bypasses_lookup() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("numerichost");
        let response = context.resolve(Request::forward(Some("203.0.113.7"), None::<&str>)).unwrap();
        assert_eq!(response.paths().len(), 1);
        assert_eq!(response.paths()[0].address, IpAddr::from_str("203.0.113.7").unwrap());
    }

    #[test]
    fn hosts_file_entry_is_found() {
        common::init_logging();
        let path = common::write_hosts_file("203.0.113.9 widget.example widget\n");
        let chain = format!("hosts:{}", path.display());
        let mut context = Context::new().unwrap().with_backend_chain(&chain);
        let response = context.resolve(Request::forward(Some("widget"), None::<&str>)).unwrap();
        assert!(response.paths().iter().any(|p| p.address == IpAddr::from_str("203.0.113.9").unwrap()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn hosts_file_skips_comments_and_unrelated_names() {
        common::init_logging();
        let path = common::write_hosts_file("# a comment\n203.0.113.9 someone-else\n");
        let chain = format!("hosts:{}", path.display());
        let mut context = Context::new().unwrap().with_backend_chain(&chain);
        let response = context.resolve(Request::forward(Some("widget"), None::<&str>)).unwrap();
        assert!(response.paths().is_empty());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn unknown_node_through_a_purely_local_chain_finishes_with_no_paths() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("any,loopback,numerichost");
        let response = context.resolve(Request::forward(Some("not-a-real-host.invalid"), None::<&str>)).unwrap();
        assert!(response.paths().is_empty());
    }

    #[test]
    fn any_fails_when_a_nodename_is_given() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("any");
        let response = context.resolve(Request::forward(Some("widget"), None::<&str>)).unwrap();
        assert_eq!(response.status(), netresolve::Status::Failed);
        let (backend, _) = response.failure_detail().expect("failure detail");
        assert_eq!(backend, "any");
    }

    #[test]
    fn mandatory_backend_unavailable_fails_the_whole_chain() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("+nosuchbackend,any");
        let response = context.resolve(Request::forward(None::<&str>, None::<&str>)).unwrap();
        assert_eq!(response.status(), netresolve::Status::Failed);
    }
}

mod dns_backend {
    use super::*;

    #[test]
    #[ignore = "requires network"]
    fn forward_lookup_of_a_well_known_name_has_an_address() {
        common::init_logging();
        let mut context = Context::new().unwrap();
        let response = context.resolve(Request::forward(Some("example.com"), None::<&str>)).unwrap();
        assert!(!response.paths().is_empty(), "expected at least one A/AAAA record");
    }

    #[test]
    #[ignore = "requires network"]
    fn reverse_lookup_of_a_well_known_address_has_a_name() {
        common::init_logging();
        let address = IpAddr::from_str("93.184.216.34").unwrap();
        let mut context = Context::new().unwrap().with_backend_chain("+dns");
        let response = context.resolve(Request::reverse(address, 0, 0)).unwrap();
        assert!(response.canonical_name().is_some());
    }

    #[test]
    #[ignore = "requires network"]
    fn raw_dns_query_returns_a_wire_answer() {
        common::init_logging();
        let mut context = Context::new().unwrap().with_backend_chain("+dns");
        let response = context.resolve(Request::dns("example.com", 1, 16)).unwrap();
        assert!(response.dns_answer().is_some());
    }
}
