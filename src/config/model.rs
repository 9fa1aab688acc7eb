// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::distributed::default_engine_args;
use crate::types::ProducerConflictPolicy;

/// Build manifest as read from a TOML file.
///
/// ```toml
/// outputs = ["bin/app"]
///
/// [config]
/// concurrency_multiplier = 1.5
///
/// [[generated]]
/// path = "gen/version.h"
/// content = "#define VERSION 3\n"
///
/// [action.compile_main]
/// command = "cc"
/// args = ["-c", "src/main.c", "-o", "obj/main.o"]
/// prerequisites = ["src/main.c", "gen/version.h"]
/// produces = ["obj/main.o"]
///
/// [action.link]
/// command = "cc"
/// args = ["obj/main.o", "-o", "bin/app"]
/// prerequisites = ["obj/main.o"]
/// produces = ["bin/app"]
/// ```
///
/// All sections are optional and have reasonable defaults; validation
/// requires at least one action.
#[derive(Debug, Clone, Deserialize)]
pub struct RawManifest {
    /// Requested outputs; empty means every produced item.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// `[config]` section.
    #[serde(default)]
    pub config: BuildSection,

    /// `[distributed]` section.
    #[serde(default)]
    pub distributed: DistributedSection,

    /// `[[generated]]` text files.
    #[serde(default)]
    pub generated: Vec<GeneratedFile>,

    /// All actions from `[action.<name>]`, keyed by name.
    #[serde(default)]
    pub action: BTreeMap<String, ActionConfig>,
}

/// A validated manifest. Construct via `Manifest::try_from(raw)` or the loader.
#[derive(Debug, Clone)]
pub struct Manifest {
    pub outputs: Vec<String>,
    pub config: BuildSection,
    pub distributed: DistributedSection,
    pub generated: Vec<GeneratedFile>,
    pub action: BTreeMap<String, ActionConfig>,
    /// Directory relative paths resolve against.
    pub root: PathBuf,
}

impl Manifest {
    pub(crate) fn new_unchecked(raw: RawManifest) -> Self {
        Self {
            outputs: raw.outputs,
            config: raw.config,
            distributed: raw.distributed,
            generated: raw.generated,
            action: raw.action,
            root: PathBuf::from("."),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Local concurrency budget is `max(1, logical_cores * multiplier)`.
    #[serde(default = "default_concurrency_multiplier")]
    pub concurrency_multiplier: f64,

    /// Explicit budget; overrides the multiplier.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Delete existing outputs of outdated actions before running them.
    #[serde(default)]
    pub delete_outdated_outputs: bool,

    /// Treat paths differing only in case as the same item.
    #[serde(default = "default_true")]
    pub case_insensitive_paths: bool,

    #[serde(default)]
    pub producer_conflict: ProducerConflictPolicy,

    /// Print accumulated per-tool process time after the build.
    #[serde(default)]
    pub report_tool_times: bool,

    /// Environment variables that must be set (e.g. toolchain locations).
    #[serde(default)]
    pub required_env: Vec<String>,
}

fn default_concurrency_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            concurrency_multiplier: default_concurrency_multiplier(),
            jobs: None,
            delete_outdated_outputs: false,
            case_insensitive_paths: true,
            producer_conflict: ProducerConflictPolicy::default(),
            report_tool_times: false,
            required_env: Vec::new(),
        }
    }
}

/// `[distributed]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributedSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default = "default_engine_args")]
    pub args: Vec<String>,

    #[serde(default = "default_job_file")]
    pub job_file: String,

    #[serde(default = "default_group_prefix")]
    pub group_prefix: String,
}

fn default_engine() -> String {
    "xgConsole".to_string()
}

fn default_job_file() -> String {
    ".buildgraph/job.json".to_string()
}

fn default_group_prefix() -> String {
    "buildgraph".to_string()
}

impl Default for DistributedSection {
    fn default() -> Self {
        Self {
            enabled: false,
            engine: default_engine(),
            args: default_engine_args(),
            job_file: default_job_file(),
            group_prefix: default_group_prefix(),
        }
    }
}

/// `[[generated]]` entry: a text file written only when its content changes.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedFile {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

/// `[action.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionConfig {
    /// Executable to run. Omit for actions that only group items.
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub prerequisites: Vec<String>,

    #[serde(default)]
    pub produces: Vec<String>,

    /// Status text; defaults to the action's name.
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub remotable: bool,

    #[serde(default)]
    pub log_locally: Option<bool>,
}

impl ActionConfig {
    pub fn effective_log_locally(&self) -> bool {
        self.log_locally.unwrap_or(true)
    }
}
