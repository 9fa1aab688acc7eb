// src/dag/closure.rs

//! Transitive closure of the actions needed for a set of outputs.

use std::collections::HashSet;

use crate::dag::action::ActionId;
use crate::dag::graph::ActionGraph;
use crate::dag::item::{FileItemRegistry, ItemId};

/// Every action transitively required to produce `outputs`, each exactly once,
/// in discovery order.
///
/// Uses an explicit worklist, so deep chains cannot overflow the stack.
/// Outputs without a producer (plain source files) contribute nothing.
pub fn gather_transitive_prerequisites(
    graph: &ActionGraph,
    items: &FileItemRegistry,
    outputs: &[ItemId],
) -> Vec<ActionId> {
    let mut gathered = Vec::new();
    let mut seen: HashSet<ActionId> = HashSet::new();
    let mut stack: Vec<ItemId> = outputs.iter().rev().copied().collect();

    while let Some(item) = stack.pop() {
        let Some(producer) = items.get(item).producer() else {
            continue;
        };
        if !seen.insert(producer) {
            continue;
        }

        gathered.push(producer);
        stack.extend(graph.get(producer).prerequisites.iter().rev().copied());
    }

    gathered
}
