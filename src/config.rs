//! Configuration loaded from `simcheck.toml`.
//!
//! Values missing from the file fall back to defaults. The environment
//! variable `SIMCHECK_SERVICE_URL` takes precedence over the file for the
//! service endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::backoff::BackoffConfig;
use crate::error::SimcheckError;

#[derive(Debug, Clone, Deserialize)]
pub struct SimcheckConfig {
    /// Base URL of the comparison service.
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Root of the on-disk artifact layout (`<root>/<job_id>/<category>/`).
    #[serde(default = "default_artifact_root")]
    pub artifact_root: PathBuf,

    /// Comparison language used when a job doesn't specify one.
    #[serde(default = "default_language")]
    pub language: String,

    /// Line-delimited JSON run summaries land here when set.
    #[serde(default)]
    pub diagnostics_log: Option<PathBuf>,

    #[serde(default)]
    pub retry: RetrySettings,
}

/// Retry schedule knobs, `[retry]` in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,

    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,

    /// Range the per-step growth factor is drawn from.
    #[serde(default = "default_base_range")]
    pub base_range: (f64, f64),

    /// Total wait budget; the run fails permanently once it is spent.
    #[serde(default = "default_max_total_secs")]
    pub max_total_secs: u64,

    #[serde(default = "default_first_instant")]
    pub first_instant: bool,
}

fn default_service_url() -> String {
    "http://localhost:7900".to_string()
}

fn default_artifact_root() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_language() -> String {
    "python".to_string()
}

fn default_min_delay_secs() -> u64 {
    30
}

fn default_max_delay_secs() -> u64 {
    1800
}

fn default_base_range() -> (f64, f64) {
    (1.5, 2.5)
}

fn default_max_total_secs() -> u64 {
    21_600
}

fn default_first_instant() -> bool {
    true
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            base_range: default_base_range(),
            max_total_secs: default_max_total_secs(),
            first_instant: default_first_instant(),
        }
    }
}

impl Default for SimcheckConfig {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            artifact_root: default_artifact_root(),
            language: default_language(),
            diagnostics_log: None,
            retry: RetrySettings::default(),
        }
    }
}

impl RetrySettings {
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            min_delay: Duration::from_secs(self.min_delay_secs),
            max_delay: Duration::from_secs(self.max_delay_secs),
            base_range: self.base_range,
            max_total: Duration::from_secs(self.max_total_secs),
            first_instant: self.first_instant,
        }
    }
}

impl SimcheckConfig {
    /// Load `simcheck.toml` from the current directory, falling back to
    /// defaults if the file does not exist.
    pub fn load() -> Result<Self, SimcheckError> {
        Self::load_from(Path::new("simcheck.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, SimcheckError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<SimcheckConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment takes precedence over the file for the endpoint.
        if let Ok(url) = std::env::var("SIMCHECK_SERVICE_URL")
            && !url.is_empty()
        {
            config.service_url = url;
        }

        Ok(config)
    }
}
