// src/exec/report.rs

//! Results of a local execution run.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::dag::{ActionId, ActionRunState};

/// Accumulated process time for one tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolTime {
    pub total: Duration,
    pub invocations: usize,
}

/// Wall-clock process time per tool (command file stem).
#[derive(Debug, Clone, Default)]
pub struct ToolTimes {
    by_tool: BTreeMap<String, ToolTime>,
}

impl ToolTimes {
    pub fn record(&mut self, tool: &str, elapsed: Duration) {
        let entry = self.by_tool.entry(tool.to_string()).or_default();
        entry.total += elapsed;
        entry.invocations += 1;
    }

    pub fn get(&self, tool: &str) -> Option<ToolTime> {
        self.by_tool.get(tool).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ToolTime)> {
        self.by_tool.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.by_tool.is_empty()
    }

    pub fn merge(&mut self, other: &ToolTimes) {
        for (tool, time) in other.iter() {
            let entry = self.by_tool.entry(tool.to_string()).or_default();
            entry.total += time.total;
            entry.invocations += time.invocations;
        }
    }
}

/// Outcome of one [`LocalExecutor`](super::LocalExecutor) run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    /// Final state per candidate, in candidate order.
    pub states: Vec<(ActionId, ActionRunState)>,
    pub tool_times: ToolTimes,
    pub cancelled: bool,
    /// Highest number of simultaneously running actions observed.
    pub peak_concurrency: usize,
}

impl ExecutionReport {
    /// True iff nothing failed, was skipped or was cancelled.
    pub fn success(&self) -> bool {
        !self.cancelled
            && self
                .states
                .iter()
                .all(|(_, state)| *state == ActionRunState::Succeeded)
    }

    pub fn state_of(&self, id: ActionId) -> Option<ActionRunState> {
        self.states.iter().find(|(a, _)| *a == id).map(|(_, s)| *s)
    }

    /// Actions whose process actually ran to an exit code.
    pub fn executed(&self) -> Vec<ActionId> {
        self.states
            .iter()
            .filter(|(_, s)| matches!(s, ActionRunState::Succeeded | ActionRunState::Failed(_)))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn count(&self, wanted: fn(ActionRunState) -> bool) -> usize {
        self.states.iter().filter(|(_, s)| wanted(*s)).count()
    }
}
