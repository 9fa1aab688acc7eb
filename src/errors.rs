// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::dag::cycles::CycleReport;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Job graph serialization error: {0}")]
    JobSerialization(#[from] serde_json::Error),

    #[error("Action graph contains cycle!\n\n{0}")]
    CycleDetected(CycleReport),

    #[error("item '{path}' is produced by more than one action ('{first}' and '{second}')")]
    ProducerConflict {
        path: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
