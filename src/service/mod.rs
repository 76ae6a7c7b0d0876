//! Interface to the external comparison service.
//!
//! The runner only sees the [`CompareService`] trait; [`HttpCompareClient`]
//! is the production implementation.

pub mod client;
pub mod error;
pub mod probe;
pub mod types;

use std::time::Duration;

use crate::artifacts::ArtifactSet;

pub use client::HttpCompareClient;
pub use error::ServiceError;
pub use probe::{LoadMonitor, LoadStatus, ProbeReading};
pub use types::{CompareConfig, ComparisonResult, RawMatch, SessionUrl};

/// The three operations consumed from the external comparison service.
#[allow(async_fn_in_trait)]
pub trait CompareService {
    /// Upload the artifacts and wait for the service to finish processing,
    /// returning the session URL for the comparison run.
    async fn create_session(
        &self,
        config: &CompareConfig,
        artifacts: &ArtifactSet,
        events: &dyn SessionEvents,
    ) -> Result<SessionUrl, ServiceError>;

    /// Fetch and parse the comparison result for a session URL.
    async fn fetch_result(&self, url: &SessionUrl) -> Result<ComparisonResult, ServiceError>;

    /// Lightweight round-trip probe; returns the measured latency.
    async fn probe(&self) -> Result<Duration, ServiceError>;
}

/// Hook points fired while a session is being created. Implementations
/// only observe; they must not influence the session itself.
pub trait SessionEvents {
    fn upload_started(&self);
    fn upload_finished(&self);
    fn processing_started(&self);
    fn processing_finished(&self);
}

/// Event sink for callers that don't observe session phases.
pub struct NoopEvents;

impl SessionEvents for NoopEvents {
    fn upload_started(&self) {}
    fn upload_finished(&self) {}
    fn processing_started(&self) {}
    fn processing_finished(&self) {}
}
