//! Optional line-delimited JSON sink for per-run summaries.
//!
//! Purely observational; a write failure never affects the run outcome.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::job::{JobId, JobStatus};
use crate::service::ProbeReading;

/// Structured summary appended after a run finishes, success or failure.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub job_id: JobId,
    pub status: JobStatus,
    pub num_files: usize,
    pub avg_file_size: u64,
    pub num_attempts: u32,
    pub probe: Option<ProbeReading>,
    pub duration_secs: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

pub fn append(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(summary).map_err(io::Error::other)?;
    writeln!(file, "{line}")
}
