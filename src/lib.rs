// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod distributed;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::Manifest;
use crate::engine::{
    plan_pass, BuildSession, BuildSettings, BuildSummary, FrontEnd, ManifestFrontEnd, Orchestrator,
    SinglePass,
};
use crate::exec::{LaunchSpec, RealProcessLauncher};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::Backend;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - manifest loading and CLI overrides
/// - the build session and manifest front end
/// - the orchestrator with the real process launcher
/// - Ctrl-C and `--timeout` cancellation
///
/// Returns whether the build succeeded. Configuration, cycle and
/// producer-conflict problems are errors.
pub async fn run(args: CliArgs) -> Result<bool> {
    let manifest_path = PathBuf::from(&args.manifest);
    let mut manifest = load_and_validate(&manifest_path)?;
    apply_cli_overrides(&mut manifest, &args)?;

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let mut session = BuildSession::new(fs, manifest.root.clone())
        .with_case_insensitive(manifest.config.case_insensitive_paths);
    let mut front_end =
        ManifestFrontEnd::new(manifest.clone()).with_requested_outputs(args.outputs.clone());

    if args.dry_run {
        print_dry_run(&mut session, &mut front_end, &manifest)?;
        return Ok(true);
    }

    let settings = BuildSettings::from_manifest(&manifest);
    let orchestrator = Orchestrator::new(settings, RealProcessLauncher);

    let cancel = CancellationToken::new();

    // Ctrl-C → cancel the build.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; cancelling build");
            cancel.cancel();
        });
    }

    if let Some(secs) = args.timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(timeout_secs = secs, "build timed out; cancelling");
            cancel.cancel();
        });
    }

    let summary = orchestrator
        .run(&mut session, &mut front_end, &mut SinglePass, cancel)
        .await?;

    report_summary(&summary, manifest.config.report_tool_times);
    Ok(summary.success)
}

fn apply_cli_overrides(manifest: &mut Manifest, args: &CliArgs) -> Result<()> {
    if let Some(jobs) = args.jobs {
        if jobs == 0 {
            bail!("--jobs must be >= 1");
        }
        manifest.config.jobs = Some(jobs);
    }
    if args.delete_outdated {
        manifest.config.delete_outdated_outputs = true;
    }
    if args.local {
        manifest.distributed.enabled = false;
    }
    if let Some(policy) = args.producer_conflict {
        manifest.config.producer_conflict = policy;
    }
    Ok(())
}

/// Evaluate the graph once and print what would run.
fn print_dry_run(
    session: &mut BuildSession,
    front_end: &mut ManifestFrontEnd,
    manifest: &Manifest,
) -> Result<()> {
    let outputs = front_end.collect(session)?;
    let plan = plan_pass(session, &outputs, manifest.config.producer_conflict)?;
    let to_run: HashSet<_> = plan.to_run.iter().copied().collect();

    println!("buildgraph dry-run");
    println!("  root = {}", manifest.root.display());
    println!("  distributed.enabled = {}", manifest.distributed.enabled);
    println!(
        "  actions = {}, outdated = {}, to run = {}",
        plan.total_actions,
        plan.outdated_actions,
        plan.to_run.len()
    );
    println!();

    println!("candidates ({}):", plan.candidates.len());
    for &id in &plan.candidates {
        let action = session.graph.get(id);
        let marker = if to_run.contains(&id) { "run" } else { "up to date" };
        println!("  - [{marker}] {}", action.status);
        if !action.detailed_status.is_empty() && action.detailed_status != action.status {
            println!("      name: {}", action.detailed_status);
        }
        if let Some(command) = &action.command_path {
            println!("      cmd: {command} {}", action.joined_arguments());
        }
        if action.command_path.is_some() {
            let launch = LaunchSpec::from_action(&session.graph, id, session.root());
            println!("      working_dir: {}", launch.working_dir.display());
        }
    }

    Ok(())
}

fn report_summary(summary: &BuildSummary, report_tool_times: bool) {
    for pass in &summary.passes {
        for action in &pass.actions {
            if action.state.is_blocking_failure() {
                error!(action = %action.status, state = action.state.label(), "action did not succeed");
            }
        }
    }

    if report_tool_times && !summary.tool_times.is_empty() {
        info!("process time by tool:");
        for (tool, time) in summary.tool_times.iter() {
            info!(
                "  {tool}: {:.2}s over {} invocation(s)",
                time.total.as_secs_f64(),
                time.invocations
            );
        }
    }

    let backend = match summary.backend() {
        Backend::None => "none",
        Backend::Local => "local",
        Backend::Distributed => "distributed",
    };

    info!(
        passes = summary.passes.len(),
        total = summary.total_actions(),
        outdated = summary.outdated_actions(),
        executed = summary.executed_actions(),
        full_rebuild = summary.full_rebuild(),
        backend,
        elapsed = ?summary.elapsed,
        "{}",
        if summary.cancelled {
            "build cancelled"
        } else if summary.success {
            "build succeeded"
        } else {
            "build failed"
        }
    );
}
