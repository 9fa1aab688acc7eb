// src/engine/mod.rs

//! Build orchestration.
//!
//! This module ties together:
//! - the build session (items + actions owned by one build)
//! - the front-end and iterative-pass seams
//! - pure per-pass planning ([`planner`])
//! - the async orchestrator that prepares outputs, dispatches to the local
//!   executor or the distributed engine, and loops over passes
//!   ([`orchestrator`])

pub mod frontend;
pub mod orchestrator;
pub mod planner;
pub mod session;

pub use frontend::{FrontEnd, IterativePass, ManifestFrontEnd, SinglePass};
pub use orchestrator::{ActionSummary, BuildSettings, BuildSummary, Orchestrator, PassSummary};
pub use planner::{plan_pass, BuildPlan};
pub use session::BuildSession;
