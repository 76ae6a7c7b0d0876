use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use simcheck::artifacts::ArtifactSet;
use simcheck::backoff::BackoffConfig;
use simcheck::cli::{Cli, Command};
use simcheck::config::SimcheckConfig;
use simcheck::job::{Job, JobId, JobRunner, Submission, SubmissionKind};
use simcheck::logging;
use simcheck::service::types::{CompareConfig, ComparisonResult, LineMatch, RawMatch, SessionUrl};
use simcheck::service::{
    CompareService, HttpCompareClient, LoadMonitor, ServiceError, SessionEvents,
};
use simcheck::store::MemoryStore;
use simcheck::ui::{self, JobProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = SimcheckConfig::load()?;

    match cli.command {
        Command::Run {
            job_id,
            language,
            artifact_root,
        } => run(config, job_id.into(), language, artifact_root).await,
        Command::Probe => probe(config).await,
        Command::Demo => demo().await,
    }
}

async fn run(
    config: SimcheckConfig,
    job_id: JobId,
    language: Option<String>,
    artifact_root: Option<PathBuf>,
) -> Result<()> {
    let artifact_root = artifact_root.unwrap_or_else(|| config.artifact_root.clone());
    let language = language.unwrap_or_else(|| config.language.clone());

    let store = MemoryStore::new();
    let mut job = Job::new(language);
    job.id = job_id;
    store.create_job(job);
    register_submissions(&store, &artifact_root, job_id)?;

    let service = HttpCompareClient::new(config.service_url.clone());
    let mut runner = JobRunner::new(service, store, config.retry.backoff(), artifact_root);
    if let Some(log) = &config.diagnostics_log {
        runner = runner.with_diagnostics(log.clone());
    }

    let progress = JobProgress::start(&format!("Running job {job_id}"));
    let outcome = runner.run(job_id).await?;
    progress.complete(outcome.as_ref());
    ui::print_events(&runner.store().events(job_id));
    Ok(())
}

/// Register one submission per artifact so result identifiers can be
/// resolved back to what was uploaded.
fn register_submissions(store: &MemoryStore, root: &Path, job_id: JobId) -> Result<()> {
    let artifacts = ArtifactSet::collect(root, job_id)?;
    let named = |paths: &[PathBuf], kind: SubmissionKind| -> Vec<Submission> {
        paths
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .map(|name| Submission::new(job_id, name, kind))
            .collect()
    };
    for submission in named(&artifacts.files, SubmissionKind::Files)
        .into_iter()
        .chain(named(&artifacts.base_files, SubmissionKind::BaseFiles))
    {
        store.add_submission(submission);
    }
    Ok(())
}

async fn probe(config: SimcheckConfig) -> Result<()> {
    let client = HttpCompareClient::new(config.service_url.clone());
    let mut monitor = LoadMonitor::default();
    let reading = monitor.measure(&client).await;
    println!("service load: {} ({reading})", reading.status);
    Ok(())
}

/// Offline walkthrough: a stub service fails twice, then succeeds, so the
/// retry loop and the event trail can be seen end to end.
async fn demo() -> Result<()> {
    let root = std::env::temp_dir().join("simcheck-demo");
    let job = Job::new("python");
    let job_id = job.id;

    let dir = root.join(job_id.to_string()).join("files");
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("alice.py"), "def mean(xs):\n    return sum(xs) / len(xs)\n")?;
    std::fs::write(dir.join("bob.py"), "def mean(v):\n    return sum(v) / len(v)\n")?;

    let store = MemoryStore::new();
    store.create_job(job);
    store.add_submission(Submission::new(job_id, "alice.py", SubmissionKind::Files));
    store.add_submission(Submission::new(job_id, "bob.py", SubmissionKind::Files));

    let backoff = BackoffConfig {
        min_delay: Duration::from_millis(300),
        max_delay: Duration::from_secs(2),
        base_range: (1.5, 2.5),
        max_total: Duration::from_secs(30),
        first_instant: true,
    };
    let service = DemoService {
        failures_left: AtomicU32::new(2),
    };
    let runner = JobRunner::new(service, store, backoff, root);

    println!("Demo: two simulated service hiccups, then success.\n");
    let progress = JobProgress::start(&format!("Running job {job_id}"));
    let outcome = runner.run(job_id).await?;
    progress.complete(outcome.as_ref());
    ui::print_events(&runner.store().events(job_id));
    Ok(())
}

/// Stub comparison service backing the demo.
struct DemoService {
    failures_left: AtomicU32,
}

fn demo_url() -> SessionUrl {
    SessionUrl::parse("http://compare.example/results/1234/0").expect("static demo url is valid")
}

impl CompareService for DemoService {
    async fn create_session(
        &self,
        _config: &CompareConfig,
        _artifacts: &ArtifactSet,
        events: &dyn SessionEvents,
    ) -> Result<SessionUrl, ServiceError> {
        events.upload_started();
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(ServiceError::Recoverable("simulated service hiccup".into()));
        }
        events.upload_finished();
        events.processing_started();
        events.processing_finished();
        Ok(demo_url())
    }

    async fn fetch_result(&self, url: &SessionUrl) -> Result<ComparisonResult, ServiceError> {
        Ok(ComparisonResult {
            url: url.clone(),
            matches: vec![RawMatch {
                first: "alice.py".into(),
                second: "bob.py".into(),
                first_percentage: 88.0,
                second_percentage: 91.0,
                lines_matched: 2,
                line_matches: vec![LineMatch {
                    first: (1, 2),
                    second: (1, 2),
                }],
            }],
        })
    }

    async fn probe(&self) -> Result<Duration, ServiceError> {
        Ok(Duration::from_millis(20))
    }
}
