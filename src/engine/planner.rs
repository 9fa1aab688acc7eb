// src/engine/planner.rs

//! Pure graph evaluation for one pass: no processes, no writes.

use tracing::{debug, info};

use crate::dag::{detect_cycles, gather_transitive_prerequisites, ActionId, ExecutionOrder, ItemId, OutdatedCache};
use crate::errors::Result;
use crate::types::ProducerConflictPolicy;

use super::session::BuildSession;

/// What one pass has to do.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    /// Every registered action in dependency order.
    pub order: ExecutionOrder,
    /// Actions the requested outputs depend on, in dependency order.
    pub candidates: Vec<ActionId>,
    /// Outdated candidates with a command, in dependency order.
    pub to_run: Vec<ActionId>,
    pub total_actions: usize,
    pub outdated_actions: usize,
}

impl BuildPlan {
    /// Every registered action is outdated.
    pub fn is_full_rebuild(&self) -> bool {
        self.total_actions > 0 && self.outdated_actions == self.total_actions
    }

    pub fn is_up_to_date(&self) -> bool {
        self.to_run.is_empty()
    }
}

/// Link producers, reject cycles, gather the candidates of `outputs` and
/// decide which of them are stale.
pub fn plan_pass(
    session: &mut BuildSession,
    outputs: &[ItemId],
    policy: ProducerConflictPolicy,
) -> Result<BuildPlan> {
    session.graph.link_producers(&mut session.items, policy)?;

    let graph = &session.graph;
    let items = &session.items;

    let order = detect_cycles(graph, items)?;

    let mut candidates = gather_transitive_prerequisites(graph, items, outputs);
    order.sort(&mut candidates);

    let mut outdated = OutdatedCache::new();
    let mut to_run = graph.collect_actions_to_run(items, &mut outdated, outputs);
    order.sort(&mut to_run);

    // The counters cover the whole graph, not just the candidates.
    outdated.evaluate_all(graph, items);

    debug!(
        requested = outputs.len(),
        candidates = candidates.len(),
        "gathered transitive prerequisites"
    );
    info!(
        total = graph.len(),
        outdated = outdated.outdated_count(),
        to_run = to_run.len(),
        "evaluated action graph"
    );

    Ok(BuildPlan {
        order,
        candidates,
        to_run,
        total_actions: graph.len(),
        outdated_actions: outdated.outdated_count(),
    })
}
