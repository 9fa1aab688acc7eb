use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use crate::dag::action::ActionId;
use crate::dag::graph::ActionGraph;
use crate::dag::item::FileItemRegistry;
use crate::dag::run_state::{ActionOutcome, ActionRunState};
use crate::dag::scheduler_step::SchedulerStep;

#[derive(Debug, Clone)]
struct RunEntry {
    state: ActionRunState,
    /// In-set producers of this action's prerequisites.
    deps: Vec<ActionId>,
    /// In-set actions consuming this action's outputs.
    dependents: Vec<ActionId>,
    /// In-set producers that have not succeeded yet.
    pending: usize,
}

/// Pure state machine for one local execution run over a candidate set.
///
/// It is responsible for:
/// - deciding which actions are ready (budget free, in-set producers succeeded)
/// - marking actions as succeeded/failed on completion
/// - skipping dependents of failed actions without launching them
///
/// Producers outside the candidate set are up to date and never block.
/// Each completion only touches the finished action's dependents.
/// The scheduler performs no IO; `exec::LocalExecutor` drives it.
#[derive(Debug)]
pub struct RunScheduler {
    entries: HashMap<ActionId, RunEntry>,
    /// Candidate order, as given.
    order: Vec<ActionId>,
    /// Unscheduled actions whose in-set producers have all succeeded.
    ready: VecDeque<ActionId>,
    budget: usize,
    running: usize,
    terminal: usize,
}

impl RunScheduler {
    /// `candidates` should be in dependency order; `budget` is clamped to at least 1.
    pub fn new(
        graph: &ActionGraph,
        items: &FileItemRegistry,
        candidates: &[ActionId],
        budget: usize,
    ) -> Self {
        let in_set: HashSet<ActionId> = candidates.iter().copied().collect();
        let mut order = Vec::with_capacity(candidates.len());
        let mut entries: HashMap<ActionId, RunEntry> = HashMap::new();

        for &id in candidates {
            if entries.contains_key(&id) {
                continue;
            }
            let deps: Vec<ActionId> = graph
                .producer_dependencies(items, id)
                .into_iter()
                .filter(|dep| *dep != id && in_set.contains(dep))
                .collect();
            entries.insert(
                id,
                RunEntry {
                    state: ActionRunState::Unscheduled,
                    pending: deps.len(),
                    deps,
                    dependents: Vec::new(),
                },
            );
            order.push(id);
        }

        for &id in &order {
            let deps = entries.get(&id).map(|e| e.deps.clone()).unwrap_or_default();
            for dep in deps {
                if let Some(entry) = entries.get_mut(&dep) {
                    entry.dependents.push(id);
                }
            }
        }

        let ready = order
            .iter()
            .copied()
            .filter(|id| entries.get(id).is_some_and(|e| e.pending == 0))
            .collect();

        Self {
            entries,
            order,
            ready,
            budget: budget.max(1),
            running: 0,
            terminal: 0,
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn running_count(&self) -> usize {
        self.running
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn state_of(&self, id: ActionId) -> Option<ActionRunState> {
        self.entries.get(&id).map(|e| e.state)
    }

    /// Final (or current) state of every candidate, in candidate order.
    pub fn states(&self) -> Vec<(ActionId, ActionRunState)> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id).map(|e| (*id, e.state)))
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.terminal == self.order.len()
    }

    /// True once finished with every action succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.entries
            .values()
            .all(|e| e.state == ActionRunState::Succeeded)
    }

    /// Schedule the initial wave.
    pub fn start(&mut self) -> SchedulerStep {
        self.collect_ready()
    }

    /// Record the outcome of a running action and schedule whatever it unblocked.
    pub fn step_completion(&mut self, id: ActionId, outcome: ActionOutcome) -> SchedulerStep {
        let mut skipped = Vec::new();

        match self.entries.get_mut(&id) {
            Some(entry) if entry.state == ActionRunState::Running => {
                entry.state = outcome.into();
                self.running -= 1;
                self.terminal += 1;

                if let ActionOutcome::Failed(code) = outcome {
                    warn!(%id, exit_code = code, "action failed; skipping its dependents");
                    skipped = self.mark_dependents_skipped(id);
                } else {
                    debug!(%id, "action succeeded");
                    self.release_dependents(id);
                }
            }
            Some(entry) => {
                warn!(%id, state = entry.state.label(), "completion for action that is not running; ignoring");
            }
            None => {
                warn!(%id, "completion for action outside the candidate set; ignoring");
            }
        }

        let mut step = self.collect_ready();
        step.newly_skipped = skipped;
        step
    }

    /// Mark every action that has not finished as `Cancelled`.
    ///
    /// Returns the actions that were running, whose processes the caller must stop.
    pub fn cancel(&mut self) -> Vec<ActionId> {
        let mut were_running = Vec::new();
        for id in &self.order {
            if let Some(entry) = self.entries.get_mut(id) {
                match entry.state {
                    ActionRunState::Running => {
                        were_running.push(*id);
                        entry.state = ActionRunState::Cancelled;
                    }
                    ActionRunState::Unscheduled => entry.state = ActionRunState::Cancelled,
                    _ => {}
                }
            }
        }
        self.ready.clear();
        self.running = 0;
        self.terminal = self.order.len();
        info!(cancelled_running = were_running.len(), "run cancelled");
        were_running
    }

    /// Count down `succeeded`'s dependents and queue those with nothing left to wait on.
    fn release_dependents(&mut self, succeeded: ActionId) {
        let dependents = self
            .entries
            .get(&succeeded)
            .map(|e| e.dependents.clone())
            .unwrap_or_default();

        for id in dependents {
            if let Some(entry) = self.entries.get_mut(&id) {
                entry.pending = entry.pending.saturating_sub(1);
                if entry.pending == 0 && entry.state == ActionRunState::Unscheduled {
                    self.ready.push_back(id);
                }
            }
        }
    }

    /// Transitively mark unscheduled in-set dependents of `failed` as `Skipped`.
    fn mark_dependents_skipped(&mut self, failed: ActionId) -> Vec<ActionId> {
        let mut stack: Vec<ActionId> = self
            .entries
            .get(&failed)
            .map(|e| e.dependents.clone())
            .unwrap_or_default();
        let mut newly_skipped = Vec::new();

        while let Some(id) = stack.pop() {
            if let Some(entry) = self.entries.get_mut(&id) {
                if entry.state == ActionRunState::Unscheduled {
                    entry.state = ActionRunState::Skipped;
                    self.terminal += 1;
                    debug!(%id, upstream = %failed, "skipping action due to failed prerequisite");
                    newly_skipped.push(id);
                    stack.extend(entry.dependents.iter().copied());
                }
            }
        }

        newly_skipped
    }

    /// Start queued actions while the budget allows.
    fn collect_ready(&mut self) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        while self.running < self.budget {
            let Some(id) = self.ready.pop_front() else {
                break;
            };
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            if entry.state != ActionRunState::Unscheduled {
                continue;
            }
            entry.state = ActionRunState::Running;
            self.running += 1;
            step.newly_scheduled.push(id);
        }

        step.run_just_finished = self.is_finished();
        step
    }
}
