//! simcheck — drives one similarity-comparison job against an external
//! comparison service through a bounded, load-aware retry loop.

pub mod artifacts;
pub mod backoff;
pub mod classify;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod job;
pub mod logging;
pub mod materialize;
pub mod service;
pub mod store;
pub mod ui;
