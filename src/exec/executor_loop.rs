// src/exec/executor_loop.rs

//! Local executor: runs a candidate set as bounded-concurrency OS processes.

use std::time::{Duration, Instant};

use anyhow::anyhow;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{ActionGraph, ActionId, ActionOutcome, FileItemRegistry, RunScheduler, SchedulerStep};
use crate::errors::{BuildError, Result};
use crate::exec::backend::{LaunchSpec, ProcessLauncher, ProcessOutcome};
use crate::exec::report::{ExecutionReport, ToolTimes};

/// Concurrency budget derived from the machine: `max(1, logical_cores * multiplier)`.
pub fn concurrency_budget(multiplier: f64) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    ((cores as f64 * multiplier).floor() as usize).max(1)
}

type Completion = (ActionId, ProcessOutcome, Duration);

/// Drives a [`RunScheduler`] with real (or fake) processes.
///
/// Completion is event-driven: every launched process is a tokio task in a
/// `JoinSet`, and the loop wakes when one of them finishes. Sibling actions
/// keep running when one fails; only dependents of the failure are skipped.
pub struct LocalExecutor<L: ProcessLauncher> {
    launcher: L,
    budget: usize,
}

impl<L: ProcessLauncher> LocalExecutor<L> {
    pub fn new(launcher: L, budget: usize) -> Self {
        Self {
            launcher,
            budget: budget.max(1),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Run `candidates` (in dependency order) until every one is terminal or
    /// `cancel` fires.
    pub async fn execute(
        &self,
        graph: &ActionGraph,
        items: &FileItemRegistry,
        candidates: &[ActionId],
        cancel: CancellationToken,
    ) -> Result<ExecutionReport> {
        let mut scheduler = RunScheduler::new(graph, items, candidates, self.budget);
        let mut in_flight: JoinSet<Completion> = JoinSet::new();
        let mut tool_times = ToolTimes::default();
        let mut peak_concurrency = 0;
        let mut cancelled = false;

        info!(
            actions = scheduler.len(),
            budget = self.budget,
            "executing actions locally"
        );

        let mut step = scheduler.start();
        loop {
            self.apply_step(graph, items, &step, &mut in_flight);
            peak_concurrency = peak_concurrency.max(scheduler.running_count());

            if scheduler.is_finished() {
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let were_running = scheduler.cancel();
                    warn!(running = were_running.len(), "cancellation requested; stopping running actions");
                    in_flight.abort_all();
                    while in_flight.join_next().await.is_some() {}
                    cancelled = true;
                    break;
                }

                joined = in_flight.join_next() => {
                    let (id, outcome, elapsed) = match joined {
                        Some(Ok(completion)) => completion,
                        Some(Err(join_err)) => {
                            return Err(BuildError::Other(anyhow!("action task panicked: {join_err}")));
                        }
                        None => {
                            return Err(BuildError::Other(anyhow!(
                                "local executor stalled: nothing running but {} actions are unfinished",
                                scheduler.states().iter().filter(|(_, s)| !s.is_terminal()).count()
                            )));
                        }
                    };

                    let action = graph.get(id);
                    tool_times.record(&action.tool_name(), elapsed);

                    let outcome = match outcome {
                        ProcessOutcome::Exited(0) => ActionOutcome::Success,
                        ProcessOutcome::Exited(code) => {
                            error!(action = %action.status, exit_code = code, "action failed");
                            ActionOutcome::Failed(code)
                        }
                        ProcessOutcome::LaunchFailed(reason) => {
                            error!(action = %action.status, %reason, "action could not be launched");
                            ActionOutcome::Failed(-1)
                        }
                    };
                    debug!(action = %action.status, ?outcome, ?elapsed, "action finished");

                    step = scheduler.step_completion(id, outcome);
                }
            }
        }

        Ok(ExecutionReport {
            states: scheduler.states(),
            tool_times,
            cancelled,
            peak_concurrency,
        })
    }

    fn apply_step(
        &self,
        graph: &ActionGraph,
        items: &FileItemRegistry,
        step: &SchedulerStep,
        in_flight: &mut JoinSet<Completion>,
    ) {
        for &id in &step.newly_skipped {
            warn!(action = %graph.get(id).status, "skipped: a prerequisite failed");
        }

        for &id in &step.newly_scheduled {
            let spec = LaunchSpec::from_action(graph, id, items.root());
            if spec.log_locally {
                info!("{}", spec.status);
            } else {
                debug!("{}", spec.status);
            }

            let launch = self.launcher.launch(spec);
            in_flight.spawn(async move {
                let started = Instant::now();
                let outcome = launch.await;
                (id, outcome, started.elapsed())
            });
        }
    }
}
