use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};

use super::error::ServiceError;
use super::types::{CompareConfig, ComparisonResult, SessionUrl};
use super::{CompareService, SessionEvents};
use crate::artifacts::ArtifactSet;

/// HTTP client for the comparison service.
///
/// Session creation is two calls: a multipart upload that returns the
/// session URL as plain text, then a blocking readiness wait on that URL.
/// The session event hooks bracket the two phases.
pub struct HttpCompareClient {
    client: Client,
    base_url: String,
}

impl HttpCompareClient {
    /// Create a client for the given service base URL (also what tests
    /// point at a mock server).
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(600))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl CompareService for HttpCompareClient {
    async fn create_session(
        &self,
        config: &CompareConfig,
        artifacts: &ArtifactSet,
        events: &dyn SessionEvents,
    ) -> Result<SessionUrl, ServiceError> {
        let mut form = Form::new()
            .text("language", config.language.clone())
            .text("max_until_ignored", config.max_until_ignored.to_string())
            .text(
                "max_displayed_matches",
                config.max_displayed_matches.to_string(),
            );
        for path in &artifacts.base_files {
            form = form.part("base_files", file_part(path).await?);
        }
        for path in &artifacts.files {
            form = form.part("files", file_part(path).await?);
        }

        events.upload_started();
        let response = self
            .client
            .post(format!("{}/sessions", self.base_url))
            .multipart(form)
            .send()
            .await?;
        events.upload_finished();

        if let Some(err) = error_for_status(response.status()) {
            return Err(err);
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        let url = SessionUrl::parse(&body).ok_or_else(|| {
            ServiceError::Fatal(format!("service returned an invalid session url: {body:?}"))
        })?;

        // The service holds this request open until processing is done.
        events.processing_started();
        let ready = self
            .client
            .get(format!("{}/ready", url.as_str()))
            .send()
            .await?;
        if let Some(err) = error_for_status(ready.status()) {
            return Err(err);
        }
        events.processing_finished();

        Ok(url)
    }

    async fn fetch_result(&self, url: &SessionUrl) -> Result<ComparisonResult, ServiceError> {
        let response = self.client.get(url.as_str()).send().await?;
        if let Some(err) = error_for_status(response.status()) {
            return Err(err);
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }
        serde_json::from_str(&body)
            .map_err(|e| ServiceError::Fatal(format!("malformed comparison result: {e}")))
    }

    async fn probe(&self) -> Result<Duration, ServiceError> {
        let started = Instant::now();
        let response = self
            .client
            .get(format!("{}/ping", self.base_url))
            .send()
            .await?;
        if let Some(err) = error_for_status(response.status()) {
            return Err(err);
        }
        Ok(started.elapsed())
    }
}

async fn file_part(path: &Path) -> Result<Part, ServiceError> {
    let bytes = tokio::fs::read(path).await?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("artifact")
        .to_string();
    Ok(Part::bytes(bytes).file_name(name))
}

fn error_for_status(status: StatusCode) -> Option<ServiceError> {
    if status.is_success() {
        return None;
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Some(ServiceError::Recoverable(format!(
            "service returned status {status}"
        )));
    }
    Some(ServiceError::Fatal(format!(
        "service rejected request with status {status}"
    )))
}
