//! The DNS backend: concurrent A/AAAA/SRV/PTR/raw queries over a c-ares
//! stub resolver channel, adapted onto the engine's `watch_fd`/
//! `watch_timeout` primitives instead of c-ares's own event loop
//! integration sample.
//!
//! c-ares tells us which sockets to watch through a socket-state
//! callback and drives its own state machine forward through
//! `process_fd`; both need to cross into `FnOnce(...) + Send + 'static`
//! closures the channel stores internally, so results are buffered
//! through an `Arc<Mutex<_>>` rather than passed back by return value.
//! A query's SRV lookup resolved to hostnames is followed by a second
//! round of A/AAAA lookups per target, which is how multiple SRV
//! records end up as multiple paths rather than only the first.

use std::net::IpAddr;
use std::os::fd::RawFd;
use std::sync::{Arc, Mutex};

use crate::backend::Backend;
use crate::error::Error;
use crate::eventloop::{IoEvents, TimeoutToken};
use crate::handle::QueryHandle;
use crate::request::{Family, Protocol, RequestKind, SockType};
use crate::response::Path;

enum Completion {
    A(Result<c_ares::AResults, c_ares::Error>),
    Aaaa(Result<c_ares::AAAAResults, c_ares::Error>),
    Srv(Result<c_ares::SRVResults, c_ares::Error>),
    SrvTarget {
        port: u16,
        priority: u16,
        weight: u16,
        socktype: SockType,
        protocol: Protocol,
        result: Result<c_ares::AResults, c_ares::Error>,
    },
    SrvTarget6 {
        port: u16,
        priority: u16,
        weight: u16,
        socktype: SockType,
        protocol: Protocol,
        result: Result<c_ares::AAAAResults, c_ares::Error>,
    },
    Host(Result<c_ares::HostResults, c_ares::Error>),
    Raw(Result<Vec<u8>, c_ares::Error>),
}

#[derive(Default)]
struct SharedState {
    fd_events: Vec<(c_ares::Socket, bool, bool)>,
    completions: Vec<Completion>,
}

enum Mode {
    Idle,
    Forward,
    ForwardSrv,
    Reverse,
    Raw,
}

pub(super) struct DnsBackend {
    channel: Option<c_ares::Channel>,
    shared: Arc<Mutex<SharedState>>,
    servers: Vec<String>,
    pending: u32,
    mode: Mode,
    timeout_token: Option<TimeoutToken>,
}

impl DnsBackend {
    pub(super) fn new(settings: &[String]) -> Self {
        let servers = settings
            .iter()
            .filter_map(|s| s.strip_prefix("server=").map(str::to_string))
            .collect();
        DnsBackend {
            channel: None,
            shared: Arc::new(Mutex::new(SharedState::default())),
            servers,
            pending: 0,
            mode: Mode::Idle,
            timeout_token: None,
        }
    }

    fn open_channel(&mut self) -> bool {
        let mut options = c_ares::Options::new();
        let shared = Arc::clone(&self.shared);
        options.set_socket_state_callback(move |fd, readable, writable| {
            shared.lock().unwrap().fd_events.push((fd, readable, writable));
        });
        let mut channel = match c_ares::Channel::with_options(options) {
            Ok(channel) => channel,
            Err(err) => {
                log::warn!("dns backend: failed to open resolver channel: {err}");
                return false;
            }
        };
        if !self.servers.is_empty() {
            let servers: Vec<&str> = self.servers.iter().map(String::as_str).collect();
            if let Err(err) = channel.set_servers(&servers) {
                log::warn!("dns backend: failed to set servers {servers:?}: {err}");
            }
        }
        self.channel = Some(channel);
        true
    }

    fn drain_fd_events(&mut self, query: &mut QueryHandle<'_>) {
        let events = std::mem::take(&mut self.shared.lock().unwrap().fd_events);
        for (fd, readable, writable) in events {
            let mut flags = IoEvents::NONE;
            if readable {
                flags = flags | IoEvents::READABLE;
            }
            if writable {
                flags = flags | IoEvents::WRITABLE;
            }
            query.watch_fd(fd as RawFd, flags);
        }
    }

    fn rearm_timeout(&mut self, query: &mut QueryHandle<'_>) {
        let Some(channel) = self.channel.as_ref() else { return };
        if let Some(token) = self.timeout_token.take() {
            query.drop_timeout(token);
        }
        if let Some(duration) = channel.timeout() {
            self.timeout_token = Some(query.watch_timeout(duration));
        }
    }

    fn process_completions(&mut self, query: &mut QueryHandle<'_>) {
        loop {
            let next = self.shared.lock().unwrap().completions.pop();
            let Some(completion) = next else { break };

            match completion {
                Completion::A(result) => {
                    self.pending = self.pending.saturating_sub(1);
                    match result {
                        Ok(results) => {
                            let socktype = query.socktype();
                            let protocol = query.protocol();
                            let port = query.resolved_port();
                            for rec in results.iter() {
                                query.add_path(Path::new(
                                    IpAddr::V4(rec.ipv4()),
                                    0,
                                    socktype,
                                    protocol,
                                    port,
                                    0,
                                    0,
                                    rec.ttl() as i64,
                                ));
                            }
                        }
                        Err(err) => log::debug!("dns backend: A lookup failed: {err}"),
                    }
                }
                Completion::Aaaa(result) => {
                    self.pending = self.pending.saturating_sub(1);
                    match result {
                        Ok(results) => {
                            let socktype = query.socktype();
                            let protocol = query.protocol();
                            let port = query.resolved_port();
                            for rec in results.iter() {
                                query.add_path(Path::new(
                                    IpAddr::V6(rec.ipv6()),
                                    0,
                                    socktype,
                                    protocol,
                                    port,
                                    0,
                                    0,
                                    rec.ttl() as i64,
                                ));
                            }
                        }
                        Err(err) => log::debug!("dns backend: AAAA lookup failed: {err}"),
                    }
                }
                Completion::Srv(result) => {
                    self.pending = self.pending.saturating_sub(1);
                    match result {
                        Ok(results) => {
                            let family = query.family();
                            let socktype = query.socktype();
                            let protocol = query.protocol();
                            for rec in results.iter() {
                                let host = rec.host().to_string();
                                let port = rec.port();
                                let priority = rec.priority();
                                let weight = rec.weight();
                                if !matches!(family, Family::Inet6) {
                                    self.pending += 1;
                                    let shared = Arc::clone(&self.shared);
                                    self.channel.as_mut().unwrap().query_a(&host, move |result| {
                                        shared.lock().unwrap().completions.push(Completion::SrvTarget {
                                            port,
                                            priority,
                                            weight,
                                            socktype,
                                            protocol,
                                            result,
                                        });
                                    });
                                }
                                if !matches!(family, Family::Inet) {
                                    self.pending += 1;
                                    let shared = Arc::clone(&self.shared);
                                    self.channel.as_mut().unwrap().query_aaaa(&host, move |result| {
                                        shared.lock().unwrap().completions.push(Completion::SrvTarget6 {
                                            port,
                                            priority,
                                            weight,
                                            socktype,
                                            protocol,
                                            result,
                                        });
                                    });
                                }
                            }
                        }
                        Err(err) => log::debug!("dns backend: SRV lookup failed: {err}"),
                    }
                }
                Completion::SrvTarget {
                    port,
                    priority,
                    weight,
                    socktype,
                    protocol,
                    result,
                } => {
                    self.pending = self.pending.saturating_sub(1);
                    if let Ok(results) = result {
                        for rec in results.iter() {
                            query.add_path(Path::new(
                                IpAddr::V4(rec.ipv4()),
                                0,
                                socktype,
                                protocol,
                                port,
                                priority,
                                weight,
                                rec.ttl() as i64,
                            ));
                        }
                    }
                }
                Completion::SrvTarget6 {
                    port,
                    priority,
                    weight,
                    socktype,
                    protocol,
                    result,
                } => {
                    self.pending = self.pending.saturating_sub(1);
                    if let Ok(results) = result {
                        for rec in results.iter() {
                            query.add_path(Path::new(
                                IpAddr::V6(rec.ipv6()),
                                0,
                                socktype,
                                protocol,
                                port,
                                priority,
                                weight,
                                rec.ttl() as i64,
                            ));
                        }
                    }
                }
                Completion::Host(result) => {
                    self.pending = self.pending.saturating_sub(1);
                    match result {
                        Ok(results) => query.add_name_info(Some(results.hostname().to_string()), None),
                        Err(err) => {
                            query.failed(Error::BackendFailed {
                                backend: "dns".into(),
                                message: err.to_string(),
                            });
                            return;
                        }
                    }
                }
                Completion::Raw(result) => {
                    self.pending = 0;
                    match result {
                        Ok(bytes) => {
                            query.set_dns_answer(bytes);
                            query.finished();
                        }
                        Err(err) => query.failed(Error::WireFormat(err.to_string())),
                    }
                    return;
                }
            }
        }

        if self.pending == 0 && !matches!(self.mode, Mode::Raw) {
            query.finished();
        }
    }
}

impl Backend for DnsBackend {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn supports(&self, kind: RequestKind) -> bool {
        matches!(kind, RequestKind::Forward | RequestKind::Reverse | RequestKind::Dns)
    }

    fn setup_forward(&mut self, query: &mut QueryHandle<'_>) {
        if !self.open_channel() {
            query.failed(Error::BackendUnavailable("dns".into()));
            return;
        }
        let Some(node) = query.nodename().map(str::to_string).filter(|n| !n.is_empty()) else {
            query.finished();
            return;
        };

        let family = query.family();
        if query.dns_srv_lookup() {
            self.mode = Mode::ForwardSrv;
            let service = query.servname().unwrap_or("").to_string();
            let proto = if matches!(query.protocol(), Protocol::Udp) { "udp" } else { "tcp" };
            let srv_name = format!("_{service}._{proto}.{node}");
            self.pending = 1;
            let shared = Arc::clone(&self.shared);
            self.channel.as_mut().unwrap().query_srv(&srv_name, move |result| {
                shared.lock().unwrap().completions.push(Completion::Srv(result));
            });
        } else {
            self.mode = Mode::Forward;
            self.pending = 0;
            if !matches!(family, Family::Inet6) {
                self.pending += 1;
                let shared = Arc::clone(&self.shared);
                self.channel.as_mut().unwrap().query_a(&node, move |result| {
                    shared.lock().unwrap().completions.push(Completion::A(result));
                });
            }
            if !matches!(family, Family::Inet) {
                self.pending += 1;
                let shared = Arc::clone(&self.shared);
                self.channel.as_mut().unwrap().query_aaaa(&node, move |result| {
                    shared.lock().unwrap().completions.push(Completion::Aaaa(result));
                });
            }
        }

        self.drain_fd_events(query);
        self.rearm_timeout(query);
        self.process_completions(query);
    }

    fn setup_reverse(&mut self, query: &mut QueryHandle<'_>) {
        if !self.open_channel() {
            query.failed(Error::BackendUnavailable("dns".into()));
            return;
        }
        let Some(address) = query.address() else {
            query.failed(Error::InputInvalid("reverse query missing an address".into()));
            return;
        };

        self.mode = Mode::Reverse;
        self.pending = 1;
        let shared = Arc::clone(&self.shared);
        self.channel.as_mut().unwrap().get_host_by_address(&address, move |result| {
            shared.lock().unwrap().completions.push(Completion::Host(result));
        });

        self.drain_fd_events(query);
        self.rearm_timeout(query);
        self.process_completions(query);
    }

    fn setup_dns(&mut self, query: &mut QueryHandle<'_>) {
        if !self.open_channel() {
            query.failed(Error::BackendUnavailable("dns".into()));
            return;
        }
        let Some((name, class, qtype)) = query.dns_query().map(|(n, c, t)| (n.to_string(), c, t)) else {
            query.failed(Error::InputInvalid("dns query missing a name".into()));
            return;
        };

        self.mode = Mode::Raw;
        self.pending = 1;
        let shared = Arc::clone(&self.shared);
        self.channel.as_mut().unwrap().query(&name, class, qtype, move |result| {
            let owned = result.map(<[u8]>::to_vec);
            shared.lock().unwrap().completions.push(Completion::Raw(owned));
        });

        self.drain_fd_events(query);
        self.rearm_timeout(query);
        self.process_completions(query);
    }

    fn dispatch(&mut self, query: &mut QueryHandle<'_>, fd: RawFd, events: IoEvents) {
        if let Some(channel) = self.channel.as_mut() {
            let read_fd = if fd >= 0 && events.readable() { fd as c_ares::Socket } else { c_ares::SOCKET_BAD };
            let write_fd = if fd >= 0 && events.writable() { fd as c_ares::Socket } else { c_ares::SOCKET_BAD };
            channel.process_fd(read_fd, write_fd);
        }
        self.drain_fd_events(query);
        self.rearm_timeout(query);
        self.process_completions(query);
    }

    fn cleanup(&mut self, query: &mut QueryHandle<'_>) {
        if let Some(token) = self.timeout_token.take() {
            query.drop_timeout(token);
        }
        // Dropping the channel cancels outstanding requests; their
        // callbacks may still fire synchronously into `shared`, but
        // nothing drains it again after this point.
        self.channel = None;
    }
}
