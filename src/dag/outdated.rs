// src/dag/outdated.rs

//! Timestamp-based outdated-ness.
//!
//! An action is outdated iff:
//! - any produced item is missing or zero-length, or
//! - any prerequisite is produced by an outdated action, or
//! - any existing prerequisite is strictly newer than the oldest produced item.
//!
//! Results are memoized for one build snapshot: metadata is whatever the
//! registry sampled when the items were interned.

use std::collections::{HashMap, HashSet};
use std::time::SystemTime;

use tracing::debug;

use crate::dag::action::ActionId;
use crate::dag::graph::ActionGraph;
use crate::dag::item::FileItemRegistry;

/// Memoized outdated-ness for one snapshot, plus the outdated counter.
#[derive(Debug, Default, Clone)]
pub struct OutdatedCache {
    states: HashMap<ActionId, bool>,
    outdated_count: usize,
}

enum Frame {
    Enter(ActionId),
    Exit(ActionId, Option<SystemTime>),
}

impl OutdatedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct actions found outdated so far.
    pub fn outdated_count(&self) -> usize {
        self.outdated_count
    }

    /// Cached verdict, if `id` has been evaluated.
    pub fn get(&self, id: ActionId) -> Option<bool> {
        self.states.get(&id).copied()
    }

    pub fn evaluated(&self) -> usize {
        self.states.len()
    }

    /// Evaluate every action in the graph.
    pub fn evaluate_all(&mut self, graph: &ActionGraph, items: &FileItemRegistry) {
        for id in graph.ids() {
            self.is_outdated(graph, items, id);
        }
    }

    /// Outdated-ness of `root`, evaluating producers first as needed.
    ///
    /// Traversal uses an explicit stack. On a graph that skipped cycle
    /// detection, a producer still being evaluated counts as up to date
    /// rather than looping forever.
    pub fn is_outdated(&mut self, graph: &ActionGraph, items: &FileItemRegistry, root: ActionId) -> bool {
        if let Some(verdict) = self.get(root) {
            return verdict;
        }

        let mut in_progress: HashSet<ActionId> = HashSet::new();
        let mut stack = vec![Frame::Enter(root)];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(id) => {
                    if self.states.contains_key(&id) || !in_progress.insert(id) {
                        continue;
                    }

                    match last_execution_time(graph, items, id) {
                        Err(missing) => {
                            debug!(
                                action = %graph.get(id).status,
                                item = %missing,
                                "produced item doesn't exist or is empty"
                            );
                            self.record(id, true);
                        }
                        Ok(last_run) => {
                            stack.push(Frame::Exit(id, last_run));
                            for producer in graph.producer_dependencies(items, id) {
                                if !self.states.contains_key(&producer) {
                                    stack.push(Frame::Enter(producer));
                                }
                            }
                        }
                    }
                }
                Frame::Exit(id, last_run) => {
                    if self.states.contains_key(&id) {
                        continue;
                    }
                    let verdict = self.prerequisites_outdated(graph, items, id, last_run);
                    self.record(id, verdict);
                }
            }
        }

        self.get(root).unwrap_or(false)
    }

    fn prerequisites_outdated(
        &self,
        graph: &ActionGraph,
        items: &FileItemRegistry,
        id: ActionId,
        last_run: Option<SystemTime>,
    ) -> bool {
        let action = graph.get(id);

        for &prereq in &action.prerequisites {
            let item = items.get(prereq);

            if let Some(producer) = item.producer() {
                if producer != id && self.get(producer).unwrap_or(false) {
                    debug!(
                        action = %action.status,
                        item = %item.file_name(),
                        "prerequisite is produced by outdated action"
                    );
                    return true;
                }
            }

            if let (Some(modified), Some(last_run)) = (item.modified(), last_run) {
                if modified > last_run {
                    debug!(
                        action = %action.status,
                        item = %item.file_name(),
                        "prerequisite is newer than the last execution of the action"
                    );
                    return true;
                }
            }
        }

        false
    }

    fn record(&mut self, id: ActionId, outdated: bool) {
        if self.states.insert(id, outdated).is_none() && outdated {
            self.outdated_count += 1;
        }
    }
}

/// Oldest modification time among produced items, `None` when there are no
/// produced items (treated as never stale by age), or the name of the first
/// missing/empty produced item.
fn last_execution_time(
    graph: &ActionGraph,
    items: &FileItemRegistry,
    id: ActionId,
) -> Result<Option<SystemTime>, String> {
    let mut oldest: Option<SystemTime> = None;

    for &produced in &graph.get(id).produced {
        let item = items.get(produced);
        match item.modified() {
            Some(modified) if item.len() > 0 => {
                oldest = Some(oldest.map_or(modified, |o| o.min(modified)));
            }
            _ => return Err(item.file_name()),
        }
    }

    Ok(oldest)
}
