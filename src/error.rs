use std::net::IpAddr;

/// Errors produced by the resolution engine or by an individual backend.
///
/// A failed terminal [`Response`](crate::response::Response) carries the
/// kind of the last-attempted backend and a human-readable message, per the
/// error propagation policy: backend-level failures are recovered locally
/// by falling through to the next chain entry, and only surface here once
/// the whole chain (or a mandatory backend) has given up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request fields are inconsistent, e.g. an address whose length does
    /// not match its family.
    #[error("invalid request: {0}")]
    InputInvalid(String),

    /// A named backend could not be loaded, or is missing a required entry
    /// point for the request kind it was asked to service.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A backend reported failure for this query.
    #[error("backend '{backend}' failed: {message}")]
    BackendFailed {
        /// Name of the backend that failed.
        backend: String,
        /// Backend-supplied failure detail.
        message: String,
    },

    /// The total or partial-success deadline elapsed before the query could
    /// terminate with any paths.
    #[error("query timed out")]
    Timeout,

    /// A stub-resolver answer could not be parsed as a well-formed DNS
    /// packet.
    #[error("malformed DNS wire answer: {0}")]
    WireFormat(String),

    /// The query was cancelled by its owning [`Context`](crate::context::Context).
    #[error("query cancelled")]
    Cancelled,
}

impl Error {
    /// Build an [`Error::InputInvalid`] describing a family/address-length
    /// mismatch.
    pub fn address_family_mismatch(address: &IpAddr) -> Self {
        Error::InputInvalid(format!(
            "address {address} does not match its declared family"
        ))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
