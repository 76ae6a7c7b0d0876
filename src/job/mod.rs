mod model;
mod runner;

pub use model::{
    EventKind, Job, JobEvent, JobId, JobStatus, MatchRecord, ResultRecord, Submission,
    SubmissionId, SubmissionKind,
};
pub use runner::JobRunner;
