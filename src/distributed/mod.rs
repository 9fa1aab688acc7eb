// src/distributed/mod.rs

//! Export of a candidate set to an external distributed execution engine.
//!
//! - [`job`] builds and serializes the engine's job graph (tools + tasks).
//! - [`engine`] writes the job file, invokes the engine and interprets its
//!   exit status.
//!
//! This back end does no scheduling of its own: correctness depends entirely
//! on the exported dependency edges being complete and acyclic.

use std::path::PathBuf;

pub mod engine;
pub mod job;

pub use engine::{DistributedEngine, DistributedOutcome, ProcessEngine};
pub use job::{build_job, JobGraph, JobTask, JobTool};

/// How to reach the distributed engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedSettings {
    /// Engine executable.
    pub engine: String,
    /// Flags passed after the job file path.
    pub args: Vec<String>,
    /// Where the job graph is written before invoking the engine.
    pub job_file: PathBuf,
    pub group_prefix: String,
}

impl Default for DistributedSettings {
    fn default() -> Self {
        Self {
            engine: "xgConsole".to_string(),
            args: default_engine_args(),
            job_file: PathBuf::from(".buildgraph/job.json"),
            group_prefix: "buildgraph".to_string(),
        }
    }
}

/// Rebuild everything in the job, don't wait for a free agent, no banner.
pub fn default_engine_args() -> Vec<String> {
    ["/Rebuild", "/NoWait", "/NoLogo"]
        .into_iter()
        .map(String::from)
        .collect()
}
