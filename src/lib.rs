//! A pluggable, single-threaded name-resolution engine.
//!
//! [`Context`] drives forward (node/service), reverse (address-to-name),
//! and raw DNS queries through an ordered chain of [`Backend`]
//! implementations: `any`/`loopback`/`numerichost`/`hosts`/`hostname` for
//! the cheap, local cases, and `dns` for real network lookups via a
//! c-ares stub resolver. Use [`Context::resolve`] to run one query to
//! completion, or [`Context::query`] plus [`Context::pump`] to interleave
//! several.
//!
//! ```no_run
//! use netresolve::{Context, Request};
//!
//! # fn main() -> netresolve::Result<()> {
//! let mut context = Context::new()?;
//! let response = context.resolve(Request::forward(Some("example.com"), None::<&str>))?;
//! for path in response.paths() {
//!     println!("{}", path.address);
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
mod backends;
mod callbacks;
mod context;
mod error;
mod eventloop;
mod handle;
mod query;
mod request;
mod response;
pub mod serialize;

pub use backend::{parse_chain, Backend, BackendSpec, DEFAULT_CHAIN};
pub use callbacks::Callbacks;
pub use context::Context;
pub use error::{Error, Result};
pub use eventloop::{IoEvents, TimeoutToken};
pub use handle::QueryHandle;
pub use query::QueryId;
pub use request::{
    DnsRequest, Family, ForwardRequest, Payload, Protocol, Request, RequestKind, ReverseRequest, SockType,
};
pub use response::{Path, Response, Status};
