// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the run scheduler.

use crate::dag::action::ActionId;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step a run and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Actions that were marked `Running` and must be launched now.
    pub newly_scheduled: Vec<ActionId>,
    /// Actions that were marked `Skipped` because a prerequisite producer
    /// failed.
    pub newly_skipped: Vec<ActionId>,
    /// Whether every candidate action is now terminal.
    pub run_just_finished: bool,
}
