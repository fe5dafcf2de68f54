//! Textual serialization of a [`Response`]: a line-oriented format, one
//! line per path (`family addr%ifindex socktype protocol port priority
//! weight ttl`), then a trailing blank line. A DNS-mode response (one
//! carrying a raw wire answer instead of a path list) is rendered as a
//! hex dump of that answer.

use std::fmt::Write as _;

use crate::request::{Family, Protocol, SockType};
use crate::response::{Path, Response};

fn family_token(family: Family) -> &'static str {
    match family {
        Family::Unspec => "unspec",
        Family::Inet => "inet",
        Family::Inet6 => "inet6",
    }
}

fn socktype_token(socktype: SockType) -> &'static str {
    match socktype {
        SockType::Unspec => "unspec",
        SockType::Stream => "stream",
        SockType::Dgram => "dgram",
    }
}

fn protocol_token(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Unspec => "unspec",
        Protocol::Tcp => "tcp",
        Protocol::Udp => "udp",
    }
}

fn write_path(out: &mut String, path: &Path) {
    let _ = writeln!(
        out,
        "{} {}%{} {} {} {} {} {} {}",
        family_token(path.family),
        path.address,
        path.ifindex,
        socktype_token(path.socktype),
        protocol_token(path.protocol),
        path.port,
        path.priority,
        path.weight,
        path.ttl,
    );
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(s, "{byte:02x}");
    }
    s
}

/// Render a response in the line-oriented text format described above.
pub fn serialize(response: &Response) -> String {
    let mut out = String::new();

    if let Some(name) = response.canonical_name() {
        let _ = writeln!(out, "canonical {name}");
    }
    if let Some(name) = response.service_name() {
        let _ = writeln!(out, "service {name}");
    }

    if let Some(answer) = response.dns_answer() {
        let _ = writeln!(out, "dns {}", hex_encode(answer));
    } else {
        for path in response.paths() {
            write_path(&mut out, path);
        }
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Protocol, SockType};
    use std::net::Ipv4Addr;

    #[test]
    fn renders_one_path_per_line() {
        let mut response = Response::new();
        response.append_path(Path::new(
            Ipv4Addr::new(93, 184, 216, 34).into(),
            0,
            SockType::Stream,
            Protocol::Tcp,
            80,
            0,
            0,
            300,
        ));
        response.mark_success();
        let text = serialize(&response);
        assert!(text.contains("inet 93.184.216.34%0 stream tcp 80 0 0 300"));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn renders_dns_answer_as_hex() {
        let mut response = Response::new();
        response.set_dns_answer(vec![0xde, 0xad, 0xbe, 0xef]);
        response.mark_success();
        let text = serialize(&response);
        assert!(text.contains("dns deadbeef"));
    }

    #[test]
    fn empty_response_is_just_the_trailing_blank_line() {
        let mut response = Response::new();
        response.mark_success();
        assert_eq!(serialize(&response), "\n");
    }
}
