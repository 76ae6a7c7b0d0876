//! The attempt-retry control loop driving one job.

use std::path::PathBuf;

use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::model::{EventKind, Job, JobId, JobStatus};
use crate::artifacts::ArtifactSet;
use crate::backoff::BackoffConfig;
use crate::classify::{classify, Decision};
use crate::diagnostics::{self, RunSummary};
use crate::materialize::materialize;
use crate::service::probe::LoadMonitor;
use crate::service::types::{CompareConfig, ComparisonResult, SessionUrl};
use crate::service::{CompareService, ServiceError, SessionEvents};
use crate::store::{JobStore, StoreError};

/// Drives one job through upload → process → parse against the comparison
/// service, retrying on the backoff schedule until success, abort, or
/// budget exhaustion.
pub struct JobRunner<S, T> {
    service: S,
    store: T,
    backoff: BackoffConfig,
    artifact_root: PathBuf,
    diagnostics_log: Option<PathBuf>,
}

/// Failures inside one attempt. Store failures escape `run` unchanged;
/// service failures go to the classifier.
enum AttemptError {
    Service(ServiceError),
    Store(StoreError),
}

impl From<ServiceError> for AttemptError {
    fn from(e: ServiceError) -> Self {
        AttemptError::Service(e)
    }
}

impl From<StoreError> for AttemptError {
    fn from(e: StoreError) -> Self {
        AttemptError::Store(e)
    }
}

/// Session hooks that persist the upload/processing transitions as they
/// happen, so the event trail tracks the remote run live.
struct SessionTrail<'a, T: JobStore> {
    store: &'a T,
    job_id: JobId,
}

impl<T: JobStore> SessionTrail<'_, T> {
    fn persist(&self, kind: EventKind, message: &str) {
        if let Err(e) = self.store.record_event(self.job_id, kind, message) {
            error!("failed to persist job event for {}: {e}", self.job_id);
        }
    }
}

impl<T: JobStore> SessionEvents for SessionTrail<'_, T> {
    fn upload_started(&self) {
        self.persist(EventKind::Uploading, "Started uploading files");
    }

    fn upload_finished(&self) {
        self.persist(EventKind::Uploading, "Finished uploading");
    }

    fn processing_started(&self) {
        if let Err(e) = self.store.set_status(self.job_id, JobStatus::Processing) {
            error!("failed to persist status for {}: {e}", self.job_id);
        }
        self.persist(
            EventKind::Processing,
            "Started generating similarity report",
        );
    }

    fn processing_finished(&self) {
        self.persist(EventKind::Processing, "Finished processing");
    }
}

impl<S: CompareService, T: JobStore> JobRunner<S, T> {
    pub fn new(service: S, store: T, backoff: BackoffConfig, artifact_root: PathBuf) -> Self {
        Self {
            service,
            store,
            backoff,
            artifact_root,
            diagnostics_log: None,
        }
    }

    pub fn with_diagnostics(mut self, path: PathBuf) -> Self {
        self.diagnostics_log = Some(path);
        self
    }

    pub fn store(&self) -> &T {
        &self.store
    }

    /// Run the job to a terminal state. Returns the session URL on
    /// success, `None` on failure or when the job was not runnable; `Err`
    /// only for failures in the persistence path itself.
    pub async fn run(&self, job_id: JobId) -> Result<Option<SessionUrl>, StoreError> {
        let mut job = self.store.job(job_id)?;

        // Only queued jobs are admitted, so a duplicate or stale trigger
        // is a no-op. Check-then-act: two near-simultaneous triggers can
        // both pass this read.
        if job.status != JobStatus::Queued {
            return Ok(None);
        }

        job.start_date = Some(Utc::now());
        self.store.update(&job)?;
        info!("starting job {job_id} with status {}", job.status);

        let artifacts = match ArtifactSet::collect(&self.artifact_root, job_id) {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!("failed to read artifacts for {job_id}: {e}");
                ArtifactSet::default()
            }
        };

        if artifacts.files.is_empty() {
            job.status = JobStatus::Failed;
            job.completion_date = Some(Utc::now());
            self.store.update(&job)?;
            self.store
                .record_event(job_id, EventKind::Failed, "No files supplied")?;
            return Ok(None);
        }

        let config = CompareConfig {
            language: job.language.clone(),
            max_until_ignored: job.max_until_ignored,
            max_displayed_matches: job.max_displayed_matches,
        };

        let mut monitor = LoadMonitor::default();
        let mut url: Option<SessionUrl> = None;
        let mut result: Option<ComparisonResult> = None;
        let mut attempts = 0;

        for attempt in self.backoff.schedule() {
            attempts = attempt.number;

            match self
                .attempt_once(&mut job, &mut url, &config, &artifacts)
                .await
            {
                Ok(parsed) => {
                    result = Some(parsed);
                    break;
                }
                Err(AttemptError::Store(e)) => return Err(e),
                Err(AttemptError::Service(err)) => {
                    match classify(&err, &mut monitor, &self.service).await {
                        Decision::Retry => {
                            let message = format!(
                                "(Attempt {}) Error: {} | Retrying in {} seconds",
                                attempt.number,
                                err,
                                attempt.wait.as_secs()
                            );
                            warn!("{message}");
                            self.store
                                .record_event(job_id, EventKind::Retry, &message)?;
                            sleep(attempt.wait).await;
                        }
                        Decision::Abort(reason) => {
                            warn!("giving up on job {job_id}: {reason}");
                            break;
                        }
                    }
                }
            }
        }

        // No more processing of the job will occur past this point.
        job.completion_date = Some(Utc::now());

        let outcome = match &result {
            None => {
                job.status = JobStatus::Failed;
                self.store.update(&job)?;
                self.store.record_event(job_id, EventKind::Failed, "")?;
                None
            }
            Some(parsed) => {
                let submissions = self.store.submissions(job_id)?;
                let (record, matches) = materialize(job_id, parsed, &submissions);
                self.store.insert_result(record, matches)?;
                self.store.record_event(job_id, EventKind::Completed, "")?;
                job.status = JobStatus::Completed;
                self.store.update(&job)?;
                Some(parsed.url.clone())
            }
        };

        self.write_diagnostics(&job, &artifacts, attempts, &monitor);
        Ok(outcome)
    }

    /// One pass through the pipeline. A session URL from an earlier
    /// attempt is reused; a parse failure never re-uploads.
    async fn attempt_once(
        &self,
        job: &mut Job,
        url: &mut Option<SessionUrl>,
        config: &CompareConfig,
        artifacts: &ArtifactSet,
    ) -> Result<ComparisonResult, AttemptError> {
        let session = match url {
            Some(existing) => existing.clone(),
            None => {
                job.status = JobStatus::Uploading;
                self.store.update(job)?;

                let trail = SessionTrail {
                    store: &self.store,
                    job_id: job.id,
                };
                let fresh = self
                    .service
                    .create_session(config, artifacts, &trail)
                    .await?;
                info!("generated session url: {fresh}");
                *url = Some(fresh.clone());
                fresh
            }
        };

        job.status = JobStatus::Parsing;
        self.store.update(job)?;
        self.store
            .record_event(job.id, EventKind::Parsing, "Start parsing report")?;

        let result = self.service.fetch_result(&session).await?;
        let message = format!(
            "Result finished parsing: {} matches detected",
            result.matches.len()
        );
        info!("{message}");
        self.store
            .record_event(job.id, EventKind::Parsing, &message)?;

        Ok(result)
    }

    fn write_diagnostics(
        &self,
        job: &Job,
        artifacts: &ArtifactSet,
        attempts: u32,
        monitor: &LoadMonitor,
    ) {
        let Some(path) = &self.diagnostics_log else {
            return;
        };
        let duration_secs = match (job.start_date, job.completion_date) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        };
        let summary = RunSummary {
            job_id: job.id,
            status: job.status,
            num_files: artifacts.file_count(),
            avg_file_size: artifacts.average_file_size(),
            num_attempts: attempts,
            probe: monitor.last_reading(),
            duration_secs,
            completed_at: Utc::now(),
        };
        if let Err(e) = diagnostics::append(path, &summary) {
            warn!("failed to append run summary: {e}");
        }
    }
}
