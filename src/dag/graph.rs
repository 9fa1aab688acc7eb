// src/dag/graph.rs

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::dag::action::{Action, ActionId};
use crate::dag::item::{FileItemRegistry, ItemId};
use crate::dag::outdated::OutdatedCache;
use crate::errors::{BuildError, Result};
use crate::types::ProducerConflictPolicy;

/// The action collection of one build session.
///
/// Edges are implicit: action `B` depends on action `A` when one of `B`'s
/// prerequisite items is produced by `A`. Producer back-references live on
/// the items and are only valid after [`link_producers`](Self::link_producers).
#[derive(Debug, Default, Clone)]
pub struct ActionGraph {
    actions: Vec<Action>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the graph.
    pub fn register(&mut self, action: Action) -> ActionId {
        let id = ActionId(self.actions.len());
        self.actions.push(action);
        id
    }

    /// Panics if `id` did not come from this graph.
    pub fn get(&self, id: ActionId) -> &Action {
        &self.actions[id.0]
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ActionId> + '_ {
        (0..self.actions.len()).map(ActionId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.actions.iter().enumerate().map(|(i, a)| (ActionId(i), a))
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }

    /// Point every produced item back at the action producing it.
    ///
    /// Returns the number of links made.
    pub fn link_producers(
        &self,
        items: &mut FileItemRegistry,
        policy: ProducerConflictPolicy,
    ) -> Result<usize> {
        items.clear_producers();

        let mut links = 0;
        for (id, action) in self.iter() {
            for &item in &action.produced {
                match items.set_producer(item, id) {
                    Some(previous) if previous != id => {
                        let path = items.get(item).path.display().to_string();
                        let first = self.get(previous).status.clone();
                        let second = action.status.clone();
                        match policy {
                            ProducerConflictPolicy::Reject => {
                                return Err(BuildError::ProducerConflict { path, first, second });
                            }
                            ProducerConflictPolicy::LastWins => {
                                warn!(
                                    item = %path,
                                    previous = %first,
                                    producer = %second,
                                    "item declared by more than one action; last one wins"
                                );
                            }
                        }
                    }
                    _ => {}
                }
                links += 1;
            }
        }

        debug!(actions = self.len(), links, "linked producers");
        Ok(links)
    }

    /// Distinct actions producing the prerequisites of `id`, in prerequisite order.
    pub fn producer_dependencies(&self, items: &FileItemRegistry, id: ActionId) -> Vec<ActionId> {
        let mut seen = HashSet::new();
        self.get(id)
            .prerequisites
            .iter()
            .filter_map(|&item| items.get(item).producer())
            .filter(|producer| seen.insert(*producer))
            .collect()
    }

    /// Actions that must actually run to bring `outputs` up to date:
    /// the transitive closure, filtered to outdated actions that have a command.
    ///
    /// The graph must already be linked and checked for cycles.
    pub fn collect_actions_to_run(
        &self,
        items: &FileItemRegistry,
        outdated: &mut OutdatedCache,
        outputs: &[ItemId],
    ) -> Vec<ActionId> {
        crate::dag::closure::gather_transitive_prerequisites(self, items, outputs)
            .into_iter()
            .filter(|&id| outdated.is_outdated(self, items, id) && self.get(id).has_command())
            .collect()
    }
}
