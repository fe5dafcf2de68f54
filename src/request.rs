use std::net::IpAddr;
use std::time::Duration;

/// Address family filter/selector used throughout the request and path
/// types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    /// No family preference; both IPv4 and IPv6 are acceptable.
    Unspec,
    /// IPv4 only.
    Inet,
    /// IPv6 only.
    Inet6,
}

impl Family {
    pub(crate) fn of(address: &IpAddr) -> Self {
        match address {
            IpAddr::V4(_) => Family::Inet,
            IpAddr::V6(_) => Family::Inet6,
        }
    }

    pub(crate) fn matches(self, address: &IpAddr) -> bool {
        matches!(
            (self, address),
            (Family::Unspec, _) | (Family::Inet, IpAddr::V4(_)) | (Family::Inet6, IpAddr::V6(_))
        )
    }
}

/// Socket type of a [`Path`](crate::response::Path), when the request was
/// more than an address-only lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SockType {
    /// Unspecified; left to the caller to choose.
    Unspec,
    /// `SOCK_STREAM`.
    Stream,
    /// `SOCK_DGRAM`.
    Dgram,
}

/// Transport protocol of a [`Path`](crate::response::Path).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Unspecified.
    Unspec,
    /// TCP.
    Tcp,
    /// UDP.
    Udp,
}

/// Discriminates the three kinds of query a [`Context`](crate::context::Context)
/// can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Node/service forward lookup.
    Forward,
    /// Address-to-name reverse lookup.
    Reverse,
    /// Raw DNS class/type query.
    Dns,
}

/// Inputs specific to a forward (node/service) lookup.
#[derive(Clone, Debug, Default)]
pub struct ForwardRequest {
    pub nodename: Option<String>,
    pub servname: Option<String>,
    pub family: Family,
    pub socktype: SockType,
    pub protocol: Protocol,
    pub dns_srv_lookup: bool,
    pub default_loopback: bool,
}

impl Default for Family {
    fn default() -> Self {
        Family::Unspec
    }
}

impl Default for SockType {
    fn default() -> Self {
        SockType::Unspec
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Unspec
    }
}

/// Inputs specific to a reverse (address-to-name) lookup.
#[derive(Clone, Debug)]
pub struct ReverseRequest {
    pub family: Family,
    pub address: IpAddr,
    pub ifindex: i32,
    pub port: u16,
}

/// Inputs specific to a raw DNS record query.
#[derive(Clone, Debug)]
pub struct DnsRequest {
    pub name: String,
    pub class: u16,
    pub qtype: u16,
}

/// The kind-specific payload of a [`Request`].
#[derive(Clone, Debug)]
pub enum Payload {
    Forward(ForwardRequest),
    Reverse(ReverseRequest),
    Dns(DnsRequest),
}

/// Immutable inputs of one query.
///
/// Construct one with [`Request::forward`], [`Request::reverse`], or
/// [`Request::dns`], then tune the common timeout/TTL fields with the
/// builder methods before handing it to a [`Context`](crate::context::Context).
#[derive(Clone, Debug)]
pub struct Request {
    pub payload: Payload,
    pub timeout: Option<Duration>,
    pub partial_timeout: Option<Duration>,
    pub clamp_ttl: Option<i64>,
}

impl Request {
    fn new(payload: Payload) -> Self {
        Request {
            payload,
            timeout: None,
            partial_timeout: None,
            clamp_ttl: None,
        }
    }

    /// Start a forward lookup for `nodename`/`servname`, both optional
    /// (an empty node name drives the `any`/`loopback` boundary behaviors).
    pub fn forward(nodename: Option<impl Into<String>>, servname: Option<impl Into<String>>) -> Self {
        Self::new(Payload::Forward(ForwardRequest {
            nodename: nodename.map(Into::into),
            servname: servname.map(Into::into),
            ..Default::default()
        }))
    }

    /// Start a reverse lookup of `address`.
    pub fn reverse(address: IpAddr, ifindex: i32, port: u16) -> Self {
        Self::new(Payload::Reverse(ReverseRequest {
            family: Family::of(&address),
            address,
            ifindex,
            port,
        }))
    }

    /// Start a raw DNS query for `name` of the given `class`/`qtype`.
    pub fn dns(name: impl Into<String>, class: u16, qtype: u16) -> Self {
        Self::new(Payload::Dns(DnsRequest {
            name: name.into(),
            class,
            qtype,
        }))
    }

    /// Restrict the address family considered by forward/reverse backends.
    pub fn family(mut self, family: Family) -> Self {
        match &mut self.payload {
            Payload::Forward(f) => f.family = family,
            Payload::Reverse(r) => r.family = family,
            Payload::Dns(_) => {}
        }
        self
    }

    /// Request SRV-based service discovery instead of a plain A/AAAA
    /// lookup (forward requests only).
    pub fn dns_srv_lookup(mut self, value: bool) -> Self {
        if let Payload::Forward(f) = &mut self.payload {
            f.dns_srv_lookup = value;
        }
        self
    }

    /// Set the default-loopback flag (forward requests only); see the
    /// `any`/`loopback` boundary behaviors on [`Request::forward`].
    pub fn default_loopback(mut self, value: bool) -> Self {
        if let Payload::Forward(f) = &mut self.payload {
            f.default_loopback = value;
        }
        self
    }

    /// Override the socket type sought (forward requests only).
    pub fn socktype(mut self, socktype: SockType) -> Self {
        if let Payload::Forward(f) = &mut self.payload {
            f.socktype = socktype;
        }
        self
    }

    /// Override the transport protocol sought (forward requests only).
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        if let Payload::Forward(f) = &mut self.payload {
            f.protocol = protocol;
        }
        self
    }

    /// Override the total query timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the partial-success timeout.
    pub fn partial_timeout(mut self, timeout: Duration) -> Self {
        self.partial_timeout = Some(timeout);
        self
    }

    /// Clamp emitted path TTLs to at most `seconds`.
    pub fn clamp_ttl(mut self, seconds: i64) -> Self {
        self.clamp_ttl = Some(seconds);
        self
    }

    /// Which [`RequestKind`] this request is.
    pub fn kind(&self) -> RequestKind {
        match &self.payload {
            Payload::Forward(_) => RequestKind::Forward,
            Payload::Reverse(_) => RequestKind::Reverse,
            Payload::Dns(_) => RequestKind::Dns,
        }
    }

    pub(crate) fn as_forward(&self) -> Option<&ForwardRequest> {
        match &self.payload {
            Payload::Forward(f) => Some(f),
            _ => None,
        }
    }

    pub(crate) fn as_reverse(&self) -> Option<&ReverseRequest> {
        match &self.payload {
            Payload::Reverse(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn as_dns(&self) -> Option<&DnsRequest> {
        match &self.payload {
            Payload::Dns(d) => Some(d),
            _ => None,
        }
    }
}
