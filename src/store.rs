//! Persistence collaborator for jobs, submissions, events and matches.
//!
//! The runner only depends on the [`JobStore`] trait; real deployments put
//! a database behind it. [`MemoryStore`] backs the CLI and the tests.
//! Every write is durable from the trait's point of view before the call
//! returns, which is what lets the event trail reconstruct an interrupted
//! run.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::job::{EventKind, Job, JobEvent, JobId, JobStatus, MatchRecord, ResultRecord, Submission};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
}

pub trait JobStore {
    fn job(&self, id: JobId) -> Result<Job, StoreError>;
    fn update(&self, job: &Job) -> Result<(), StoreError>;
    fn set_status(&self, id: JobId, status: JobStatus) -> Result<(), StoreError>;
    fn submissions(&self, id: JobId) -> Result<Vec<Submission>, StoreError>;
    fn record_event(&self, id: JobId, kind: EventKind, message: &str) -> Result<(), StoreError>;
    fn insert_result(
        &self,
        record: ResultRecord,
        matches: Vec<MatchRecord>,
    ) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    submissions: Vec<Submission>,
    events: Vec<JobEvent>,
    results: Vec<(ResultRecord, Vec<MatchRecord>)>,
}

/// In-memory store used by the CLI demo and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_job(&self, job: Job) {
        self.lock().jobs.insert(job.id, job);
    }

    pub fn add_submission(&self, submission: Submission) {
        self.lock().submissions.push(submission);
    }

    pub fn events(&self, id: JobId) -> Vec<JobEvent> {
        self.lock()
            .events
            .iter()
            .filter(|e| e.job_id == id)
            .cloned()
            .collect()
    }

    pub fn results(&self, id: JobId) -> Vec<(ResultRecord, Vec<MatchRecord>)> {
        self.lock()
            .results
            .iter()
            .filter(|(r, _)| r.job_id == id)
            .cloned()
            .collect()
    }

    // Poisoning cannot corrupt these plain collections.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl JobStore for MemoryStore {
    fn job(&self, id: JobId) -> Result<Job, StoreError> {
        self.lock()
            .jobs
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn update(&self, job: &Job) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(job.id)),
        }
    }

    fn set_status(&self, id: JobId, status: JobStatus) -> Result<(), StoreError> {
        let mut inner = self.lock();
        match inner.jobs.get_mut(&id) {
            Some(job) => {
                job.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn submissions(&self, id: JobId) -> Result<Vec<Submission>, StoreError> {
        Ok(self
            .lock()
            .submissions
            .iter()
            .filter(|s| s.job_id == id)
            .cloned()
            .collect())
    }

    fn record_event(&self, id: JobId, kind: EventKind, message: &str) -> Result<(), StoreError> {
        self.lock().events.push(JobEvent::new(id, kind, message));
        Ok(())
    }

    fn insert_result(
        &self,
        record: ResultRecord,
        matches: Vec<MatchRecord>,
    ) -> Result<(), StoreError> {
        self.lock().results.push((record, matches));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::SubmissionKind;

    #[test]
    fn job_roundtrip() {
        let store = MemoryStore::new();
        let mut job = Job::new("python");
        store.create_job(job.clone());

        job.status = JobStatus::Uploading;
        store.update(&job).unwrap();
        assert_eq!(store.job(job.id).unwrap().status, JobStatus::Uploading);

        store.set_status(job.id, JobStatus::Failed).unwrap();
        assert_eq!(store.job(job.id).unwrap().status, JobStatus::Failed);
    }

    #[test]
    fn unknown_job_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.job(JobId::new()),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update(&Job::new("c")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn events_are_append_only_and_scoped_to_the_job() {
        let store = MemoryStore::new();
        let job = Job::new("python");
        let other = Job::new("python");
        store.create_job(job.clone());
        store.create_job(other.clone());

        store
            .record_event(job.id, EventKind::Uploading, "Started uploading files")
            .unwrap();
        store.record_event(other.id, EventKind::Failed, "").unwrap();

        let events = store.events(job.id);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Uploading);
        assert_eq!(events[0].message, "Started uploading files");
    }

    #[test]
    fn submissions_are_scoped_to_the_job() {
        let store = MemoryStore::new();
        let job = Job::new("python");
        let other = Job::new("python");
        store.add_submission(Submission::new(job.id, "a.py", SubmissionKind::Files));
        store.add_submission(Submission::new(other.id, "b.py", SubmissionKind::Files));

        assert_eq!(store.submissions(job.id).unwrap().len(), 1);
    }
}
