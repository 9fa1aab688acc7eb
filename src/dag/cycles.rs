// src/dag/cycles.rs

//! Cycle detection over the producer/consumer relation.
//!
//! A successful check yields a topological [`ExecutionOrder`] (producers
//! before consumers); a failed one yields a [`CycleReport`] naming every
//! action that sits on a cycle plus one concrete cycle path.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::dag::action::ActionId;
use crate::dag::graph::ActionGraph;
use crate::dag::item::FileItemRegistry;
use crate::errors::{BuildError, Result};

/// Actions in dependency order: every producer precedes its consumers.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOrder {
    order: Vec<ActionId>,
    position: HashMap<ActionId, usize>,
}

impl ExecutionOrder {
    fn new(order: Vec<ActionId>) -> Self {
        let position = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self { order, position }
    }

    pub fn as_slice(&self) -> &[ActionId] {
        &self.order
    }

    pub fn position(&self, id: ActionId) -> Option<usize> {
        self.position.get(&id).copied()
    }

    /// Sort `ids` into dependency order.
    pub fn sort(&self, ids: &mut [ActionId]) {
        ids.sort_by_key(|id| self.position(*id).unwrap_or(usize::MAX));
    }
}

/// One action caught in a cycle, rendered for diagnostics.
#[derive(Debug, Clone)]
pub struct CycleMember {
    pub action: ActionId,
    pub status: String,
    pub command: String,
    pub arguments: String,
    pub prerequisites: Vec<String>,
    pub produced: Vec<String>,
}

/// Every cyclic action plus one explicit cycle through them.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub members: Vec<CycleMember>,
    /// Status texts along one cycle; first and last entries are the same action.
    pub path: Vec<String>,
}

impl CycleReport {
    pub fn member_ids(&self) -> Vec<ActionId> {
        self.members.iter().map(|m| m.action).collect()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for member in &self.members {
            writeln!(f, "Action: {}", member.command)?;
            writeln!(f, "\twith arguments: {}", member.arguments)?;
            for item in &member.prerequisites {
                writeln!(f, "\tdepends on: {item}")?;
            }
            for item in &member.produced {
                writeln!(f, "\tproduces:   {item}")?;
            }
            writeln!(f)?;
        }
        write!(f, "cycle: {}", self.path.join(" -> "))
    }
}

/// Check the linked graph for cycles.
///
/// Requires `ActionGraph::link_producers` to have run.
pub fn detect_cycles(graph: &ActionGraph, items: &FileItemRegistry) -> Result<ExecutionOrder> {
    let dag = dependency_graph(graph, items);

    match toposort(&dag, None) {
        Ok(order) => Ok(ExecutionOrder::new(order)),
        Err(_) => Err(BuildError::CycleDetected(describe_cycles(graph, items, &dag))),
    }
}

/// Edge direction: producer -> consumer.
fn dependency_graph(graph: &ActionGraph, items: &FileItemRegistry) -> DiGraphMap<ActionId, ()> {
    let mut dag: DiGraphMap<ActionId, ()> = DiGraphMap::new();

    for id in graph.ids() {
        dag.add_node(id);
    }
    for id in graph.ids() {
        for producer in graph.producer_dependencies(items, id) {
            dag.add_edge(producer, id, ());
        }
    }

    dag
}

fn describe_cycles(
    graph: &ActionGraph,
    items: &FileItemRegistry,
    dag: &DiGraphMap<ActionId, ()>,
) -> CycleReport {
    let cyclic_components: Vec<Vec<ActionId>> = tarjan_scc(dag)
        .into_iter()
        .filter(|scc| scc.len() > 1 || dag.contains_edge(scc[0], scc[0]))
        .collect();

    let mut member_ids: Vec<ActionId> = cyclic_components.iter().flatten().copied().collect();
    member_ids.sort();

    let path = cyclic_components
        .first()
        .map(|scc| {
            let set: HashSet<ActionId> = scc.iter().copied().collect();
            let start = scc.iter().copied().min().unwrap_or(scc[0]);
            cycle_path(dag, &set, start)
        })
        .unwrap_or_default()
        .into_iter()
        .map(|id| graph.get(id).status.clone())
        .collect();

    let path_of = |item| items.get(item).path.display().to_string();
    let members = member_ids
        .into_iter()
        .map(|id| {
            let action = graph.get(id);
            CycleMember {
                action: id,
                status: action.status.clone(),
                command: action.command_path.clone().unwrap_or_default(),
                arguments: action.joined_arguments(),
                prerequisites: action.prerequisites.iter().map(|&i| path_of(i)).collect(),
                produced: action.produced.iter().map(|&i| path_of(i)).collect(),
            }
        })
        .collect();

    CycleReport { members, path }
}

/// Shortest cycle through `start` inside one strongly connected component.
fn cycle_path(
    dag: &DiGraphMap<ActionId, ()>,
    component: &HashSet<ActionId>,
    start: ActionId,
) -> Vec<ActionId> {
    if dag.contains_edge(start, start) {
        return vec![start, start];
    }

    let mut parent: HashMap<ActionId, ActionId> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for next in dag.neighbors(node) {
            if !component.contains(&next) {
                continue;
            }
            if next == start {
                let mut path = vec![start];
                let mut current = node;
                while current != start {
                    path.push(current);
                    match parent.get(&current) {
                        Some(&p) => current = p,
                        None => break,
                    }
                }
                path.push(start);
                path.reverse();
                return path;
            }
            if !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    vec![start]
}
