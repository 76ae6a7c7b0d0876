//! Load probe for the comparison service.
//!
//! A single opaque failure symptom (an empty response) can mean either
//! "the service is overloaded and shedding work" or "this request will
//! never succeed". Comparing a fresh probe latency against a rolling
//! average turns that into a three-way signal the retry classifier can
//! act on.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::CompareService;

/// Classification of the service's current responsiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Normal,
    UnderLoad,
    Down,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Normal => write!(f, "NORMAL"),
            LoadStatus::UnderLoad => write!(f, "UNDER_LOAD"),
            LoadStatus::Down => write!(f, "DOWN"),
        }
    }
}

/// One load measurement: classification plus the latencies behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProbeReading {
    pub status: LoadStatus,
    pub latency: Duration,
    pub average: Duration,
}

impl fmt::Display for ProbeReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ms vs. {}ms avg",
            self.latency.as_millis(),
            self.average.as_millis()
        )
    }
}

/// Pure classification of a fresh sample against the rolling average.
pub fn classify_sample(latency: Duration, average: Duration, threshold: f64) -> LoadStatus {
    if latency.as_secs_f64() > average.as_secs_f64() * threshold {
        LoadStatus::UnderLoad
    } else {
        LoadStatus::Normal
    }
}

/// Rolling-average latency monitor.
///
/// The window is seeded with a short burst of probes before the first
/// judgement so a lone slow sample isn't compared against itself.
pub struct LoadMonitor {
    window: VecDeque<Duration>,
    capacity: usize,
    threshold: f64,
    last: Option<ProbeReading>,
}

/// Samples taken to establish a baseline before the first classification.
const SEED_SAMPLES: usize = 3;

impl Default for LoadMonitor {
    fn default() -> Self {
        Self::new(20, 2.0)
    }
}

impl LoadMonitor {
    pub fn new(capacity: usize, threshold: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            threshold,
            last: None,
        }
    }

    /// Issue a probe and classify the service's load.
    pub async fn measure<S: CompareService>(&mut self, service: &S) -> ProbeReading {
        while self.window.len() < SEED_SAMPLES {
            match service.probe().await {
                Ok(latency) => self.push(latency),
                Err(_) => return self.record(LoadStatus::Down, Duration::ZERO),
            }
        }
        match service.probe().await {
            Ok(latency) => {
                let status = classify_sample(latency, self.average(), self.threshold);
                let reading = self.record(status, latency);
                self.push(latency);
                reading
            }
            Err(_) => self.record(LoadStatus::Down, Duration::ZERO),
        }
    }

    /// The most recent reading, if any probe has run.
    pub fn last_reading(&self) -> Option<ProbeReading> {
        self.last
    }

    fn record(&mut self, status: LoadStatus, latency: Duration) -> ProbeReading {
        let reading = ProbeReading {
            status,
            latency,
            average: self.average(),
        };
        self.last = Some(reading);
        reading
    }

    fn push(&mut self, latency: Duration) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(latency);
    }

    fn average(&self) -> Duration {
        if self.window.is_empty() {
            return Duration::ZERO;
        }
        self.window.iter().sum::<Duration>() / self.window.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactSet;
    use crate::service::types::{CompareConfig, ComparisonResult, SessionUrl};
    use crate::service::{ServiceError, SessionEvents};
    use std::sync::Mutex;

    /// Probe-only stub; the session operations are never reached.
    struct ProbePlan {
        latencies_ms: Mutex<VecDeque<u64>>,
        down: bool,
    }

    impl ProbePlan {
        fn of(latencies_ms: &[u64]) -> Self {
            Self {
                latencies_ms: Mutex::new(latencies_ms.iter().copied().collect()),
                down: false,
            }
        }

        fn down() -> Self {
            Self {
                latencies_ms: Mutex::new(VecDeque::new()),
                down: true,
            }
        }
    }

    impl CompareService for ProbePlan {
        async fn create_session(
            &self,
            _config: &CompareConfig,
            _artifacts: &ArtifactSet,
            _events: &dyn SessionEvents,
        ) -> Result<SessionUrl, ServiceError> {
            unreachable!("probe stub")
        }

        async fn fetch_result(&self, _url: &SessionUrl) -> Result<ComparisonResult, ServiceError> {
            unreachable!("probe stub")
        }

        async fn probe(&self) -> Result<std::time::Duration, ServiceError> {
            if self.down {
                return Err(ServiceError::Recoverable("ping failed".into()));
            }
            let mut plan = self.latencies_ms.lock().unwrap();
            let ms = plan.pop_front().expect("probe plan exhausted");
            Ok(Duration::from_millis(ms))
        }
    }

    #[test]
    fn classify_sample_thresholds() {
        let avg = Duration::from_millis(100);
        assert_eq!(
            classify_sample(Duration::from_millis(100), avg, 2.0),
            LoadStatus::Normal
        );
        assert_eq!(
            classify_sample(Duration::from_millis(199), avg, 2.0),
            LoadStatus::Normal
        );
        assert_eq!(
            classify_sample(Duration::from_millis(300), avg, 2.0),
            LoadStatus::UnderLoad
        );
    }

    #[tokio::test]
    async fn steady_latency_reads_normal() {
        let service = ProbePlan::of(&[100, 100, 100, 100]);
        let mut monitor = LoadMonitor::default();
        let reading = monitor.measure(&service).await;
        assert_eq!(reading.status, LoadStatus::Normal);
        assert_eq!(reading.latency, Duration::from_millis(100));
        assert_eq!(reading.average, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn latency_spike_reads_under_load() {
        let service = ProbePlan::of(&[100, 100, 100, 350]);
        let mut monitor = LoadMonitor::default();
        let reading = monitor.measure(&service).await;
        assert_eq!(reading.status, LoadStatus::UnderLoad);
        assert_eq!(reading.latency, Duration::from_millis(350));
    }

    #[tokio::test]
    async fn unreachable_service_reads_down() {
        let service = ProbePlan::down();
        let mut monitor = LoadMonitor::default();
        let reading = monitor.measure(&service).await;
        assert_eq!(reading.status, LoadStatus::Down);
        assert_eq!(monitor.last_reading().unwrap().status, LoadStatus::Down);
    }

    #[tokio::test]
    async fn window_is_reused_across_measurements() {
        let service = ProbePlan::of(&[100, 100, 100, 100, 120]);
        let mut monitor = LoadMonitor::default();
        monitor.measure(&service).await;
        // Second measurement only needs one fresh sample.
        let reading = monitor.measure(&service).await;
        assert_eq!(reading.status, LoadStatus::Normal);
        assert_eq!(reading.latency, Duration::from_millis(120));
    }
}
