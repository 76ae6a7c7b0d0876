//! Terminal output — spinner while a run is in flight, styled outcome and
//! event trail afterwards.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::job::JobEvent;
use crate::service::SessionUrl;

/// Visual progress indicator for one job run.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl JobProgress {
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(label.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Stop the spinner and print the run outcome.
    pub fn complete(&self, outcome: Option<&SessionUrl>) {
        self.pb.finish_and_clear();
        match outcome {
            Some(url) => {
                println!("  {} Comparison ready: {url}", self.green.apply_to("✓"));
            }
            None => {
                println!(
                    "  {} Job failed — see the event trail below",
                    self.red.apply_to("✗")
                );
            }
        }
    }
}

/// Print the audit trail, one line per event.
pub fn print_events(events: &[JobEvent]) {
    let dim = Style::new().dim();
    let bold = Style::new().bold();
    for event in events {
        let ts = event.timestamp.format("%H:%M:%S%.3f");
        println!(
            "  {} {:<10} {}",
            dim.apply_to(ts),
            bold.apply_to(event.kind.to_string()),
            event.message
        );
    }
}
