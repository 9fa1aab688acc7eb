// src/exec/task_runner.rs

//! Individual action process runner.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use super::backend::{LaunchSpec, ProcessOutcome};

/// Run a single action process to completion, forwarding its output into
/// the log.
///
/// The child is killed if the returned future is dropped (cancellation).
pub async fn run_process(spec: LaunchSpec) -> ProcessOutcome {
    match run_process_inner(&spec).await {
        Ok(code) => ProcessOutcome::Exited(code),
        Err(err) => {
            let message = format!("{err:#}");
            error!(
                action = %spec.status,
                program = %spec.program,
                error = %message,
                "failed to launch action process"
            );
            ProcessOutcome::LaunchFailed(message)
        }
    }
}

async fn run_process_inner(spec: &LaunchSpec) -> Result<i32> {
    debug!(
        action = %spec.status,
        program = %spec.program,
        args = ?spec.args,
        working_dir = %spec.working_dir.display(),
        "starting action process"
    );

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args);
    cmd.current_dir(&spec.working_dir);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning '{}' for action '{}'", spec.program, spec.status))?;

    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, spec.status.clone(), spec.log_locally);
    }
    // Always consume stderr so buffers don't fill.
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, spec.status.clone(), spec.log_locally);
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of action '{}'", spec.status))?;

    let code = status.code().unwrap_or(-1);
    debug!(
        action = %spec.status,
        exit_code = code,
        success = status.success(),
        "action process exited"
    );

    Ok(code)
}

fn forward_lines<R>(stream: R, status: String, log_locally: bool)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if log_locally {
                info!(action = %status, "{}", line);
            } else {
                debug!(action = %status, "{}", line);
            }
        }
    });
}
