// src/dag/action.rs

//! A single build action: one external command with declared inputs/outputs.

use std::fmt;
use std::path::PathBuf;

use crate::dag::item::ItemId;

/// Index of an [`Action`] inside its `ActionGraph`.
///
/// Identity of an action is its registration slot, never its contents: two
/// actions with identical commands are still two actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub(crate) usize);

impl ActionId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// A unit of work.
///
/// Constructing an `Action` has no side effects; it only joins a graph
/// through `ActionGraph::register`.
#[derive(Debug, Clone)]
pub struct Action {
    pub prerequisites: Vec<ItemId>,
    pub produced: Vec<ItemId>,
    /// As written: may be relative to the root and hold `$(NAME)` tokens.
    pub working_dir: Option<PathBuf>,
    /// `None` for bookkeeping actions that only group items.
    pub command_path: Option<String>,
    pub arguments: Vec<String>,
    pub status: String,
    pub detailed_status: String,
    pub remotable: bool,
    /// Whether the local executor announces this action at `info` level.
    pub log_locally: bool,
}

impl Default for Action {
    fn default() -> Self {
        Self {
            prerequisites: Vec::new(),
            produced: Vec::new(),
            working_dir: None,
            command_path: None,
            arguments: Vec::new(),
            status: "...".to_string(),
            detailed_status: String::new(),
            remotable: false,
            log_locally: true,
        }
    }
}

impl Action {
    pub fn new(command_path: impl Into<String>) -> Self {
        Self {
            command_path: Some(command_path.into()),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_prerequisite(mut self, item: ItemId) -> Self {
        self.prerequisites.push(item);
        self
    }

    pub fn with_produced(mut self, item: ItemId) -> Self {
        self.produced.push(item);
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn remotable(mut self, remotable: bool) -> Self {
        self.remotable = remotable;
        self
    }

    pub fn log_locally(mut self, log_locally: bool) -> Self {
        self.log_locally = log_locally;
        self
    }

    pub fn has_command(&self) -> bool {
        self.command_path
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty())
    }

    /// File stem of the command, used to bucket per-tool timings.
    pub fn tool_name(&self) -> String {
        let command = self.command_path.as_deref().unwrap_or("");
        std::path::Path::new(command)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| command.to_string())
    }

    /// Arguments joined into one command-line string.
    ///
    /// Arguments containing whitespace or quotes are wrapped in double quotes.
    pub fn joined_arguments(&self) -> String {
        join_arguments(&self.arguments)
    }
}

/// Join arguments into one command line, quoting where needed.
pub fn join_arguments(args: &[String]) -> String {
    args.iter()
        .map(|arg| quote_argument(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_argument(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if arg.chars().any(|c| c.is_whitespace() || c == '"') {
        format!("\"{}\"", arg.replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_arguments_quotes_only_when_needed() {
        let action = Action::new("cc").with_args(["-c", "my file.c", "-DNAME=\"x\"", ""]);
        assert_eq!(
            action.joined_arguments(),
            r#"-c "my file.c" "-DNAME=\"x\"" """#
        );
    }

    #[test]
    fn tool_name_is_command_stem() {
        assert_eq!(Action::new("/usr/bin/cl.exe").tool_name(), "cl");
        assert_eq!(Action::default().tool_name(), "");
    }

    #[test]
    fn blank_command_counts_as_no_command() {
        assert!(!Action::new("  ").has_command());
        assert!(!Action::default().has_command());
        assert!(Action::new("ld").has_command());
    }
}
