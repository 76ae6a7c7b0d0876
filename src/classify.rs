//! Maps a failed attempt onto an explicit retry decision.
//!
//! Transient transport failures and recoverable service errors always
//! retry; fatal errors abort; an empty response is ambiguous and is
//! resolved through the load probe. Anything unrecognized aborts — never
//! retry on an unclassified condition.

use std::fmt;

use tracing::{debug, error};

use crate::service::probe::{LoadMonitor, LoadStatus, ProbeReading};
use crate::service::{CompareService, ServiceError};

/// Outcome of classifying one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Retry,
    Abort(AbortReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AbortReason {
    /// The service is responsive, so the emptiness was not load-induced;
    /// this request will never finish.
    NeverFinishing(ProbeReading),
    Fatal,
    Unknown,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NeverFinishing(reading) => {
                write!(f, "service is not under load ({reading}), job will never finish")
            }
            AbortReason::Fatal => write!(f, "fatal service error"),
            AbortReason::Unknown => write!(f, "unclassified error"),
        }
    }
}

/// Decide whether the attempt loop should continue after `error`.
///
/// Probes the service only for the ambiguous empty-response case.
pub async fn classify<S: CompareService>(
    error: &ServiceError,
    monitor: &mut LoadMonitor,
    service: &S,
) -> Decision {
    match error {
        ServiceError::Transport(_) | ServiceError::Recoverable(_) => Decision::Retry,
        ServiceError::EmptyResponse => {
            let reading = monitor.measure(service).await;
            match reading.status {
                LoadStatus::Normal => Decision::Abort(AbortReason::NeverFinishing(reading)),
                LoadStatus::UnderLoad => {
                    debug!("service is under load ({reading}), retrying");
                    Decision::Retry
                }
                LoadStatus::Down => {
                    debug!("service is down ({reading}), retrying");
                    Decision::Retry
                }
            }
        }
        ServiceError::Fatal(_) => Decision::Abort(AbortReason::Fatal),
        other => {
            error!("unknown error: {other}");
            Decision::Abort(AbortReason::Unknown)
        }
    }
}
