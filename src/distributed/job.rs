// src/distributed/job.rs

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dag::action::join_arguments;
use crate::dag::{ActionGraph, ActionId, FileItemRegistry};
use crate::errors::Result;
use crate::exec::LaunchSpec;

/// The engine's job graph: one tool and one task per exported action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobGraph {
    pub tools: Vec<JobTool>,
    pub tasks: Vec<JobTask>,
}

/// How to invoke one action's command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobTool {
    pub name: String,
    pub allow_remote: bool,
    pub group_prefix: String,
    pub params: String,
    pub path: String,
    /// File names of the action's produced items.
    pub output_file_masks: Vec<String>,
}

/// One node of the job graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct JobTask {
    pub name: String,
    pub tool: String,
    pub working_dir: String,
    /// Task names of in-set producers of this action's prerequisites.
    pub depends_on: Vec<String>,
    pub skip_if_project_failed: bool,
}

impl JobGraph {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn task(&self, name: &str) -> Option<&JobTask> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

/// Serialize `candidates` (in dependency order) into a job graph.
///
/// Dependencies on producers outside the candidate set are dropped: those
/// actions are up to date and their outputs already exist.
pub fn build_job(
    graph: &ActionGraph,
    items: &FileItemRegistry,
    candidates: &[ActionId],
    group_prefix: &str,
) -> JobGraph {
    let mut task_names: HashMap<ActionId, String> = HashMap::new();
    for (index, &id) in candidates.iter().enumerate() {
        task_names.entry(id).or_insert_with(|| format!("Action{index}"));
    }

    let mut tools = Vec::with_capacity(candidates.len());
    let mut tasks = Vec::with_capacity(candidates.len());
    let mut exported: HashSet<ActionId> = HashSet::new();

    for (index, &id) in candidates.iter().enumerate() {
        if !exported.insert(id) {
            continue;
        }
        let action = graph.get(id);
        let spec = LaunchSpec::from_action(graph, id, items.root());
        let tool_name = format!("Tool{index}");

        tools.push(JobTool {
            name: tool_name.clone(),
            allow_remote: action.remotable,
            group_prefix: group_prefix.to_string(),
            params: join_arguments(&spec.args),
            path: spec.program,
            output_file_masks: action
                .produced
                .iter()
                .map(|&item| items.get(item).file_name())
                .collect(),
        });

        let depends_on = graph
            .producer_dependencies(items, id)
            .into_iter()
            .filter(|dep| *dep != id)
            .filter_map(|dep| task_names.get(&dep).cloned())
            .collect();

        tasks.push(JobTask {
            name: task_names.get(&id).cloned().unwrap_or_else(|| format!("Action{index}")),
            tool: tool_name,
            working_dir: spec.working_dir.display().to_string(),
            depends_on,
            skip_if_project_failed: true,
        });
    }

    JobGraph { tools, tasks }
}
