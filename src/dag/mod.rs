// src/dag/mod.rs

//! Action graph: items, actions, graph algorithms and the local run state machine.
//!
//! - [`item`] interns paths into [`FileItem`]s with cached metadata.
//! - [`action`] defines the [`Action`] unit of work.
//! - [`graph`] holds the action collection and links producers.
//! - [`cycles`] proves acyclicity and yields an [`ExecutionOrder`].
//! - [`closure`] gathers the actions transitively needed for some outputs.
//! - [`outdated`] decides which actions are stale.
//! - [`prepare`] creates output directories and evicts stale outputs.
//! - [`scheduler`] contains the per-run state machine that decides which
//!   candidate actions are ready, and when dependents must be skipped.
//! - [`run_state`] and [`scheduler_step`] define its state and step types.

pub mod action;
pub mod closure;
pub mod cycles;
pub mod graph;
pub mod item;
pub mod outdated;
pub mod prepare;
pub mod run_state;
pub mod scheduler;
pub mod scheduler_step;

pub use action::{Action, ActionId};
pub use closure::gather_transitive_prerequisites;
pub use cycles::{detect_cycles, CycleReport, ExecutionOrder};
pub use graph::ActionGraph;
pub use item::{FileItem, FileItemRegistry, ItemId};
pub use outdated::OutdatedCache;
pub use prepare::{prepare_outputs, PrepareStats};
pub use run_state::{ActionOutcome, ActionRunState};
pub use scheduler::RunScheduler;
pub use scheduler_step::SchedulerStep;
