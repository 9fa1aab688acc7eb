// src/dag/run_state.rs

//! Per-action state during one local execution run.

/// How a launched action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    /// Nonzero exit code, or `-1` when the process could not be launched or
    /// was terminated by a signal.
    Failed(i32),
}

/// Lifecycle of one candidate action:
/// `Unscheduled -> Running -> {Succeeded, Failed}`, or straight to
/// `Skipped` when an in-set prerequisite producer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRunState {
    Unscheduled,
    Running,
    Succeeded,
    Failed(i32),
    /// Never launched because a prerequisite producer failed (or was skipped).
    Skipped,
    /// Never finished because the run was cancelled.
    Cancelled,
}

impl ActionRunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ActionRunState::Unscheduled | ActionRunState::Running)
    }

    /// Terminal states that block dependents.
    pub fn is_blocking_failure(self) -> bool {
        matches!(
            self,
            ActionRunState::Failed(_) | ActionRunState::Skipped | ActionRunState::Cancelled
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ActionRunState::Unscheduled => "unscheduled",
            ActionRunState::Running => "running",
            ActionRunState::Succeeded => "succeeded",
            ActionRunState::Failed(_) => "failed",
            ActionRunState::Skipped => "skipped",
            ActionRunState::Cancelled => "cancelled",
        }
    }
}

impl From<ActionOutcome> for ActionRunState {
    fn from(outcome: ActionOutcome) -> Self {
        match outcome {
            ActionOutcome::Success => ActionRunState::Succeeded,
            ActionOutcome::Failed(code) => ActionRunState::Failed(code),
        }
    }
}
