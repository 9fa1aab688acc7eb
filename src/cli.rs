// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::ProducerConflictPolicy;

/// Command-line arguments for `buildgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildgraph",
    version,
    about = "Run the stale subset of a declared action graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the build manifest (TOML).
    #[arg(long, value_name = "PATH", default_value = "Build.toml")]
    pub manifest: String,

    /// Requested outputs. Overrides `outputs = [...]` from the manifest.
    #[arg(value_name = "OUTPUT")]
    pub outputs: Vec<String>,

    /// Evaluate the graph and print what would run, without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Never export to the distributed engine, even if the manifest enables it.
    #[arg(long)]
    pub local: bool,

    /// Explicit concurrency budget for local execution.
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Abort the build after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Delete existing outputs of outdated actions before running them.
    #[arg(long)]
    pub delete_outdated: bool,

    /// How to treat two actions producing the same item (`reject` or `last_wins`).
    /// Overrides `producer_conflict` from the manifest.
    #[arg(long, value_name = "POLICY")]
    pub producer_conflict: Option<ProducerConflictPolicy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn producer_conflict_flag_accepts_both_spellings() {
        let args = CliArgs::try_parse_from(["buildgraph", "--producer-conflict", "last-wins"]).unwrap();
        assert_eq!(args.producer_conflict, Some(ProducerConflictPolicy::LastWins));

        let args = CliArgs::try_parse_from(["buildgraph", "--producer-conflict", "Reject"]).unwrap();
        assert_eq!(args.producer_conflict, Some(ProducerConflictPolicy::Reject));

        let args = CliArgs::try_parse_from(["buildgraph"]).unwrap();
        assert_eq!(args.producer_conflict, None);
    }

    #[test]
    fn unknown_producer_conflict_is_a_usage_error() {
        let err = CliArgs::try_parse_from(["buildgraph", "--producer-conflict", "first"]).unwrap_err();
        assert!(err.to_string().contains("invalid producer_conflict"), "{err}");
    }
}
