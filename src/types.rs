use std::str::FromStr;

use serde::Deserialize;

/// What to do when two actions declare the same produced item.
///
/// - `Reject`: fail the build at link time (default).
/// - `LastWins`: the action registered last becomes the producer; a warning
///   is logged for every overridden link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProducerConflictPolicy {
    #[default]
    Reject,
    LastWins,
}

impl FromStr for ProducerConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(ProducerConflictPolicy::Reject),
            "last_wins" | "last-wins" => Ok(ProducerConflictPolicy::LastWins),
            other => Err(format!(
                "invalid producer_conflict: {other} (expected \"reject\" or \"last_wins\")"
            )),
        }
    }
}

/// Which back end executed (or would execute) a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Nothing needed to run.
    None,
    /// Bounded local process scheduler.
    Local,
    /// Exported to the distributed engine.
    Distributed,
}
