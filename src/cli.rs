//! Command-line interface, clap derive style.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// simcheck — batch similarity-check job runner.
#[derive(Debug, Parser)]
#[command(name = "simcheck", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one comparison job from its artifact directory.
    Run {
        /// Job identifier; the artifacts are expected under
        /// `<artifact-root>/<job-id>/files/`.
        job_id: Uuid,

        /// Comparison language (overrides the configured default).
        #[arg(long)]
        language: Option<String>,

        /// Artifact root directory (overrides the configured default).
        #[arg(long)]
        artifact_root: Option<PathBuf>,
    },

    /// Measure the comparison service's current load.
    Probe,

    /// Run the built-in demonstration against a stub service.
    Demo,
}
