// src/engine/orchestrator.rs

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Manifest;
use crate::dag::{prepare_outputs, ActionId, ActionRunState, OutdatedCache};
use crate::distributed::{build_job, DistributedEngine, DistributedOutcome, DistributedSettings, ProcessEngine};
use crate::errors::Result;
use crate::exec::{concurrency_budget, ExecutionReport, LocalExecutor, ProcessLauncher, ToolTimes};
use crate::types::{Backend, ProducerConflictPolicy};

use super::frontend::{FrontEnd, IterativePass};
use super::planner::{plan_pass, BuildPlan};
use super::session::BuildSession;

/// Serializes whole builds within the process so two runs never race on the
/// same produced items.
static BUILD_LOCK: Mutex<()> = Mutex::const_new(());

/// Knobs for one build, resolved from the manifest and CLI.
#[derive(Debug, Clone)]
pub struct BuildSettings {
    /// Local concurrency budget (>= 1).
    pub budget: usize,
    pub delete_outdated_outputs: bool,
    pub producer_conflict: ProducerConflictPolicy,
    /// `Some` when the distributed engine should be tried first.
    pub distributed: Option<DistributedSettings>,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            budget: concurrency_budget(1.0),
            delete_outdated_outputs: false,
            producer_conflict: ProducerConflictPolicy::default(),
            distributed: None,
        }
    }
}

impl BuildSettings {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let config = &manifest.config;
        let budget = config
            .jobs
            .unwrap_or_else(|| concurrency_budget(config.concurrency_multiplier));

        let distributed = manifest.distributed.enabled.then(|| {
            let section = &manifest.distributed;
            DistributedSettings {
                engine: section.engine.clone(),
                args: section.args.clone(),
                job_file: manifest.root.join(&section.job_file),
                group_prefix: section.group_prefix.clone(),
            }
        });

        Self {
            budget: budget.max(1),
            delete_outdated_outputs: config.delete_outdated_outputs,
            producer_conflict: config.producer_conflict,
            distributed,
        }
    }
}

/// Final state of one action in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSummary {
    pub status: String,
    pub state: ActionRunState,
}

/// What one pass evaluated and ran.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub success: bool,
    pub total_actions: usize,
    pub outdated_actions: usize,
    pub executed_actions: usize,
    pub full_rebuild: bool,
    pub backend: Backend,
    pub directories_created: usize,
    pub items_deleted: usize,
    /// Actions handed to a back end, in dependency order.
    pub actions: Vec<ActionSummary>,
}

/// Result of a whole (possibly multi-pass) build.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub success: bool,
    pub cancelled: bool,
    pub passes: Vec<PassSummary>,
    pub tool_times: ToolTimes,
    pub elapsed: Duration,
}

impl BuildSummary {
    /// Action count of the last pass.
    pub fn total_actions(&self) -> usize {
        self.passes.last().map_or(0, |p| p.total_actions)
    }

    /// Outdated count of the first pass.
    pub fn outdated_actions(&self) -> usize {
        self.passes.first().map_or(0, |p| p.outdated_actions)
    }

    /// Actions executed across all passes.
    pub fn executed_actions(&self) -> usize {
        self.passes.iter().map(|p| p.executed_actions).sum()
    }

    pub fn full_rebuild(&self) -> bool {
        self.passes.first().is_some_and(|p| p.full_rebuild)
    }

    /// Last back end that actually ran something.
    pub fn backend(&self) -> Backend {
        self.passes
            .iter()
            .rev()
            .map(|p| p.backend)
            .find(|b| *b != Backend::None)
            .unwrap_or(Backend::None)
    }
}

/// Drives passes over a [`BuildSession`]: collect, plan, prepare, dispatch,
/// then ask the iterative pass whether to go again.
///
/// Planning lives in [`plan_pass`](super::planner::plan_pass) and performs
/// no IO; this type owns the async side (processes, engine, cancellation).
pub struct Orchestrator<L: ProcessLauncher> {
    settings: BuildSettings,
    executor: LocalExecutor<L>,
    engine: Option<Box<dyn DistributedEngine>>,
}

impl<L: ProcessLauncher> std::fmt::Debug for Orchestrator<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("distributed", &self.engine.is_some())
            .finish_non_exhaustive()
    }
}

impl<L: ProcessLauncher> Orchestrator<L> {
    /// Uses a [`ProcessEngine`] when `settings.distributed` is set.
    pub fn new(settings: BuildSettings, launcher: L) -> Self {
        let engine = settings
            .distributed
            .clone()
            .map(|d| Box::new(ProcessEngine::new(d)) as Box<dyn DistributedEngine>);
        let executor = LocalExecutor::new(launcher, settings.budget);
        Self {
            settings,
            executor,
            engine,
        }
    }

    /// Replace (or install) the distributed engine.
    pub fn with_engine(mut self, engine: impl DistributedEngine + 'static) -> Self {
        self.engine = Some(Box::new(engine));
        self
    }

    /// Never use the distributed engine.
    pub fn local_only(mut self) -> Self {
        self.engine = None;
        self
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    /// Run passes until the iterative pass is satisfied or `cancel` fires.
    ///
    /// Cycle and producer-conflict errors abort before anything runs.
    /// Action failures do not produce an `Err`; they show up in the summary.
    pub async fn run(
        &self,
        session: &mut BuildSession,
        front_end: &mut dyn FrontEnd,
        iterative: &mut dyn IterativePass,
        cancel: CancellationToken,
    ) -> Result<BuildSummary> {
        let _guard = BUILD_LOCK.lock().await;
        let started = Instant::now();

        let mut passes = Vec::new();
        let mut tool_times = ToolTimes::default();
        let mut cancelled = false;

        loop {
            let pass = passes.len() + 1;
            debug!(pass, "starting build pass");

            let (summary, report) = self.run_pass(session, front_end, cancel.clone()).await?;
            tool_times.merge(&report.tool_times);
            let success = summary.success;
            passes.push(summary);

            if report.cancelled || cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let executed = report.executed();
            if !iterative.process_next(session, &executed, success)? {
                break;
            }
            info!(pass, "iterative pass requested another build pass");
        }

        let summary = BuildSummary {
            success: !cancelled && passes.iter().all(|p| p.success),
            cancelled,
            passes,
            tool_times,
            elapsed: started.elapsed(),
        };
        Ok(summary)
    }

    async fn run_pass(
        &self,
        session: &mut BuildSession,
        front_end: &mut dyn FrontEnd,
        cancel: CancellationToken,
    ) -> Result<(PassSummary, ExecutionReport)> {
        session.reset();
        let outputs = front_end.collect(session)?;

        let plan = plan_pass(session, &outputs, self.settings.producer_conflict)?;
        if plan.is_full_rebuild() {
            info!(actions = plan.total_actions, "every action is outdated; full rebuild");
        }

        let stats = prepare_outputs(
            &session.graph,
            &mut session.items,
            &plan.to_run,
            self.settings.delete_outdated_outputs,
        )?;
        debug!(
            directories_created = stats.directories_created,
            items_deleted = stats.items_deleted,
            "prepared outputs"
        );

        let (backend, success, report) = self.dispatch(session, &plan, cancel).await?;
        session.refresh_produced(&report.executed());

        let actions = report
            .states
            .iter()
            .map(|&(id, state)| ActionSummary {
                status: session.graph.get(id).status.clone(),
                state,
            })
            .collect();

        let summary = PassSummary {
            success,
            total_actions: plan.total_actions,
            outdated_actions: plan.outdated_actions,
            executed_actions: report.executed().len(),
            full_rebuild: plan.is_full_rebuild(),
            backend,
            directories_created: stats.directories_created,
            items_deleted: stats.items_deleted,
            actions,
        };
        Ok((summary, report))
    }

    async fn dispatch(
        &self,
        session: &mut BuildSession,
        plan: &BuildPlan,
        cancel: CancellationToken,
    ) -> Result<(Backend, bool, ExecutionReport)> {
        if plan.is_up_to_date() {
            info!("everything is up to date");
            return Ok((Backend::None, true, ExecutionReport::default()));
        }

        if let (Some(engine), Some(settings)) = (&self.engine, &self.settings.distributed) {
            let job = build_job(
                &session.graph,
                &session.items,
                &plan.to_run,
                &settings.group_prefix,
            );
            match engine.submit(job, cancel.clone()).await? {
                DistributedOutcome::Unavailable => {
                    info!("distributed engine unavailable; running locally");
                }
                outcome => {
                    let report = distributed_report(session, &plan.to_run, outcome, &cancel);
                    let success = outcome == DistributedOutcome::TasksSucceeded && !report.cancelled;
                    return Ok((Backend::Distributed, success, report));
                }
            }
        }

        let report = self
            .executor
            .execute(&session.graph, &session.items, &plan.to_run, cancel)
            .await?;
        let success = report.success();
        Ok((Backend::Local, success, report))
    }
}

/// Per-action states for a job the engine ran.
///
/// The engine only reports an overall verdict. On failure, produced items are
/// re-sampled and each action is judged by whether it is still outdated.
fn distributed_report(
    session: &mut BuildSession,
    actions: &[ActionId],
    outcome: DistributedOutcome,
    cancel: &CancellationToken,
) -> ExecutionReport {
    let cancelled = cancel.is_cancelled();

    let states = if outcome == DistributedOutcome::TasksSucceeded && !cancelled {
        actions.iter().map(|&id| (id, ActionRunState::Succeeded)).collect()
    } else {
        session.refresh_produced(actions);
        let mut outdated = OutdatedCache::new();
        actions
            .iter()
            .map(|&id| {
                let state = if outdated.is_outdated(&session.graph, &session.items, id) {
                    if cancelled {
                        ActionRunState::Cancelled
                    } else {
                        ActionRunState::Failed(-1)
                    }
                } else {
                    ActionRunState::Succeeded
                };
                (id, state)
            })
            .collect()
    };

    if outcome == DistributedOutcome::TasksFailed {
        warn!(actions = actions.len(), "distributed build reported failures");
    }

    ExecutionReport {
        states,
        tool_times: ToolTimes::default(),
        cancelled,
        peak_concurrency: 0,
    }
}
