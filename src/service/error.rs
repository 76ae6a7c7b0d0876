//! Error taxonomy for the external comparison service.
//!
//! The variants map one-to-one onto the retry classifier's decision table:
//! `Transport` and `Recoverable` always retry, `EmptyResponse` is resolved
//! through the load probe, `Fatal` aborts, and anything else aborts as an
//! unclassified failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Low-level transport failure (DNS, connection reset, timeout).
    #[error("connection error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered but asked us to come back later (429/5xx).
    #[error("recoverable service error: {0}")]
    Recoverable(String),

    /// The service answered but returned nothing parseable. Ambiguous:
    /// either the service is shedding load or the request will never
    /// succeed — the load probe decides which.
    #[error("service returned an empty response")]
    EmptyResponse,

    /// The service rejected the request in a way no retry can fix.
    #[error("fatal service error: {0}")]
    Fatal(String),

    /// Local failure while preparing the request (e.g. reading an artifact).
    #[error("internal error: {0}")]
    Internal(#[from] std::io::Error),
}
