use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::types::{LineMatch, SessionUrl};

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique submission identifier (ours, not the one the service echoes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks the lifecycle status of a job.
///
/// Flow: QUEUED → UPLOADING → PROCESSING → PARSING → COMPLETED | FAILED.
/// Retrying is not a stored status; it is a loop condition between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Uploading,
    Processing,
    Parsing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "QUEUED"),
            JobStatus::Uploading => write!(f, "UPLOADING"),
            JobStatus::Processing => write!(f, "PROCESSING"),
            JobStatus::Parsing => write!(f, "PARSING"),
            JobStatus::Completed => write!(f, "COMPLETED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One similarity-comparison job.
///
/// Owned exclusively by the runner for the duration of one run; mutated
/// only through its state transitions and persisted via [`crate::store::JobStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Comparison language passed through to the service.
    pub language: String,
    /// Matches seen in more than this many submissions are ignored.
    pub max_until_ignored: u32,
    /// Upper bound on matches the service reports back.
    pub max_displayed_matches: u32,
    pub created_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    /// Set exactly once, on the terminal transition.
    pub completion_date: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            status: JobStatus::Queued,
            language: language.into(),
            max_until_ignored: 10,
            max_displayed_matches: 250,
            created_at: Utc::now(),
            start_date: None,
            completion_date: None,
        }
    }
}

/// Category of a submitted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    /// The artifacts being compared. A job needs at least one of these.
    Files,
    /// Shared template/skeleton code excluded from matching.
    BaseFiles,
}

impl SubmissionKind {
    /// Directory name for this category under the job's artifact directory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            SubmissionKind::Files => "files",
            SubmissionKind::BaseFiles => "base_files",
        }
    }
}

/// A single submitted artifact, belonging to exactly one job. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub job_id: JobId,
    /// The identifier the comparison service echoes back in results.
    pub submission_id: String,
    pub name: String,
    pub kind: SubmissionKind,
}

impl Submission {
    pub fn new(job_id: JobId, name: impl Into<String>, kind: SubmissionKind) -> Self {
        let name = name.into();
        Self {
            id: SubmissionId::new(),
            job_id,
            submission_id: name.clone(),
            name,
            kind,
        }
    }
}

/// Kinds of audit events a run can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Queued,
    Uploading,
    Processing,
    Parsing,
    Completed,
    Failed,
    Retry,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Queued => write!(f, "QUEUED"),
            EventKind::Uploading => write!(f, "UPLOADING"),
            EventKind::Processing => write!(f, "PROCESSING"),
            EventKind::Parsing => write!(f, "PARSING"),
            EventKind::Completed => write!(f, "COMPLETED"),
            EventKind::Failed => write!(f, "FAILED"),
            EventKind::Retry => write!(f, "RETRY"),
            EventKind::Error => write!(f, "ERROR"),
        }
    }
}

/// Append-only audit record. Never mutated or deleted; the event trail is
/// the sole observability surface for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub kind: EventKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(job_id: JobId, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            job_id,
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Persisted head record for a completed comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: Uuid,
    pub job_id: JobId,
    pub url: SessionUrl,
}

/// Persisted pairing of two resolved submissions of the same job, derived
/// 1:1 from a raw match whose both identifiers resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub result_id: Uuid,
    pub first_submission: SubmissionId,
    pub second_submission: SubmissionId,
    pub first_percentage: f32,
    pub second_percentage: f32,
    pub lines_matched: u32,
    pub line_matches: Vec<LineMatch>,
}
