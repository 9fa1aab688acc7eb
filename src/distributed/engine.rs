// src/distributed/engine.rs

use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::Result;

use super::job::JobGraph;
use super::DistributedSettings;

/// What the distributed engine made of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributedOutcome {
    /// The engine could not be started; the caller falls back to local execution.
    Unavailable,
    TasksFailed,
    TasksSucceeded,
}

/// Future returned by [`DistributedEngine::submit`].
pub type SubmitFuture<'a> = Pin<Box<dyn Future<Output = Result<DistributedOutcome>> + Send + 'a>>;

/// Trait abstracting the distributed engine so tests can substitute one.
pub trait DistributedEngine: Send + Sync {
    /// Hand `job` to the engine and block until it finishes.
    fn submit(&self, job: JobGraph, cancel: CancellationToken) -> SubmitFuture<'_>;
}

/// Engine reached by writing a job file and running an executable on it.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    settings: DistributedSettings,
}

impl ProcessEngine {
    pub fn new(settings: DistributedSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &DistributedSettings {
        &self.settings
    }

    async fn run(&self, job: JobGraph, cancel: CancellationToken) -> Result<DistributedOutcome> {
        let job_file = &self.settings.job_file;
        if let Err(err) = write_job_file(job_file, &job).await {
            warn!(error = %err, "could not write job file; distributed engine unavailable");
            return Ok(DistributedOutcome::Unavailable);
        }

        debug!(
            engine = %self.settings.engine,
            job_file = %job_file.display(),
            tasks = job.tasks.len(),
            "invoking distributed engine"
        );

        let mut cmd = Command::new(&self.settings.engine);
        cmd.arg(job_file)
            .args(&self.settings.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                if err.kind() == ErrorKind::NotFound {
                    info!(engine = %self.settings.engine, "distributed engine not found");
                } else {
                    info!(engine = %self.settings.engine, error = %err, "distributed engine could not be started");
                }
                return Ok(DistributedOutcome::Unavailable);
            }
        };

        tokio::select! {
            status = child.wait() => {
                let status = status.context("waiting for distributed engine")?;
                if status.success() {
                    info!(tasks = job.tasks.len(), "distributed engine finished all tasks");
                    Ok(DistributedOutcome::TasksSucceeded)
                } else {
                    warn!(exit_code = status.code().unwrap_or(-1), "distributed engine reported failed tasks");
                    Ok(DistributedOutcome::TasksFailed)
                }
            }
            _ = cancel.cancelled() => {
                warn!("cancellation requested; stopping distributed engine");
                if let Err(err) = child.kill().await {
                    warn!(error = %err, "failed to kill distributed engine");
                }
                Ok(DistributedOutcome::TasksFailed)
            }
        }
    }
}

async fn write_job_file(job_file: &Path, job: &JobGraph) -> Result<()> {
    if let Some(parent) = job_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating dir {:?}", parent))?;
    }
    tokio::fs::write(job_file, job.to_json()?)
        .await
        .with_context(|| format!("writing job file {:?}", job_file))?;
    Ok(())
}

impl DistributedEngine for ProcessEngine {
    fn submit(&self, job: JobGraph, cancel: CancellationToken) -> SubmitFuture<'_> {
        Box::pin(self.run(job, cancel))
    }
}
