// src/exec/backend.rs

//! Pluggable process launcher abstraction.
//!
//! The local executor talks to a `ProcessLauncher` instead of spawning
//! processes directly. This makes it easy to swap in a fake launcher in tests
//! while keeping the production implementation in [`task_runner`].
//!
//! [`task_runner`]: super::task_runner

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use crate::dag::item::normalize_path;
use crate::dag::{ActionGraph, ActionId};
use crate::exec::env::expand_env_vars;

use super::task_runner::run_process;

/// Everything needed to start one action's process, after `$(NAME)` expansion.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub action: ActionId,
    pub program: String,
    pub args: Vec<String>,
    /// Absolute; the root when the action names no directory.
    pub working_dir: PathBuf,
    pub status: String,
    /// Forward output at `info` rather than `debug`.
    pub log_locally: bool,
}

impl LaunchSpec {
    /// Build the spec for `id`, expanding environment tokens in the command,
    /// its arguments and its working directory.
    ///
    /// The working directory is expanded before it is resolved against `root`.
    pub fn from_action(graph: &ActionGraph, id: ActionId, root: &Path) -> Self {
        let action = graph.get(id);
        let working_dir = match &action.working_dir {
            Some(dir) => {
                let expanded = expand_env_vars(&dir.to_string_lossy());
                normalize_path(root, Path::new(&expanded))
            }
            None => root.to_path_buf(),
        };
        Self {
            action: id,
            program: expand_env_vars(action.command_path.as_deref().unwrap_or("")),
            args: action.arguments.iter().map(|a| expand_env_vars(a)).collect(),
            working_dir,
            status: action.status.clone(),
            log_locally: action.log_locally,
        }
    }
}

/// How a launched process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process ran; `-1` when it was terminated without an exit code.
    Exited(i32),
    /// The process could not be started (or waited on).
    LaunchFailed(String),
}

/// Future returned by a launcher; resolves when the process is gone.
pub type LaunchFuture = Pin<Box<dyn Future<Output = ProcessOutcome> + Send + 'static>>;

/// Trait abstracting how one action's process is started.
///
/// Production code uses [`RealProcessLauncher`]; tests can provide their own
/// implementation that doesn't spawn real processes. Dropping the returned
/// future must stop the process.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: LaunchSpec) -> LaunchFuture;
}

/// Real launcher used in production: spawns OS processes via tokio.
#[derive(Debug, Clone, Default)]
pub struct RealProcessLauncher;

impl ProcessLauncher for RealProcessLauncher {
    fn launch(&self, spec: LaunchSpec) -> LaunchFuture {
        Box::pin(run_process(spec))
    }
}
