// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running action commands, using
//! `tokio::process::Command`, under a bounded concurrency budget.
//!
//! - [`backend`] provides the `ProcessLauncher` trait and the concrete
//!   `RealProcessLauncher`, which tests can replace with a fake.
//! - [`task_runner`] handles individual process execution.
//! - [`executor_loop`] owns the local executor loop that drives the run
//!   scheduler.
//! - [`env`] expands `$(NAME)` tokens before launch.
//! - [`report`] holds per-run results and per-tool timings.

pub mod backend;
pub mod env;
pub mod executor_loop;
pub mod report;
pub mod task_runner;

pub use backend::{LaunchFuture, LaunchSpec, ProcessLauncher, ProcessOutcome, RealProcessLauncher};
pub use executor_loop::{concurrency_budget, LocalExecutor};
pub use report::{ExecutionReport, ToolTime, ToolTimes};
