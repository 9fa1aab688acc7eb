mod common;

use std::fs;
use std::path::PathBuf;

use buildgraph::config::{load_and_validate, Manifest};
use buildgraph::distributed::build_job;
use buildgraph::engine::{FrontEnd, ManifestFrontEnd};
use buildgraph::errors::BuildError;
use buildgraph::exec::LaunchSpec;
use buildgraph::types::ProducerConflictPolicy;
use common::builders::{ActionConfigBuilder, ManifestBuilder, SessionBuilder};

fn write_manifest(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Build.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn config_error(contents: &str) -> String {
    let (_dir, path) = write_manifest(contents);
    match load_and_validate(&path) {
        Err(BuildError::ConfigError(msg)) => msg,
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_full_manifest_loads_with_defaults() {
    let (dir, path) = write_manifest(
        r##"
outputs = ["bin/app"]

[config]
concurrency_multiplier = 1.5
producer_conflict = "last_wins"

[[generated]]
path = "gen/version.h"
content = "#define V 1\n"

[action.compile]
command = "cc"
args = ["-c", "main.c"]
prerequisites = ["main.c", "gen/version.h"]
produces = ["main.o"]

[action.link]
command = "cc"
prerequisites = ["main.o"]
produces = ["bin/app"]
status = "Linking app"
log_locally = false
"##,
    );

    let manifest = load_and_validate(&path).unwrap();

    assert_eq!(manifest.root.as_path(), dir.path());
    assert_eq!(manifest.outputs, vec!["bin/app".to_string()]);
    assert_eq!(manifest.config.concurrency_multiplier, 1.5);
    assert_eq!(manifest.config.jobs, None);
    assert!(manifest.config.case_insensitive_paths);
    assert!(!manifest.config.delete_outdated_outputs);
    assert_eq!(manifest.config.producer_conflict, ProducerConflictPolicy::LastWins);
    assert!(!manifest.distributed.enabled);
    assert_eq!(manifest.distributed.args, vec!["/Rebuild", "/NoWait", "/NoLogo"]);
    assert_eq!(manifest.distributed.job_file, ".buildgraph/job.json");
    assert_eq!(manifest.generated.len(), 1);

    let link = &manifest.action["link"];
    assert_eq!(link.status.as_deref(), Some("Linking app"));
    assert!(!link.effective_log_locally());
    assert!(manifest.action["compile"].effective_log_locally());
}

#[test]
fn test_missing_manifest_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    match load_and_validate(dir.path().join("nope.toml")) {
        Err(BuildError::ConfigError(msg)) => assert!(msg.contains("manifest not found")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_invalid_toml_is_toml_error() {
    let (_dir, path) = write_manifest("[action.a\ncommand = ");
    assert!(matches!(load_and_validate(&path), Err(BuildError::TomlError(_))));
}

#[test]
fn test_manifest_without_actions_is_rejected() {
    let msg = config_error("outputs = []\n");
    assert!(msg.contains("at least one"));
}

#[test]
fn test_non_positive_multiplier_is_rejected() {
    let msg = config_error(
        "[config]\nconcurrency_multiplier = 0.0\n\n[action.a]\ncommand = \"cc\"\n",
    );
    assert!(msg.contains("concurrency_multiplier"));
}

#[test]
fn test_zero_jobs_is_rejected() {
    let msg = config_error("[config]\njobs = 0\n\n[action.a]\ncommand = \"cc\"\n");
    assert!(msg.contains("jobs"));
}

#[test]
fn test_empty_command_is_rejected() {
    let msg = config_error("[action.a]\ncommand = \"  \"\n");
    assert!(msg.contains("empty `command`"));
}

#[test]
fn test_missing_required_env_is_rejected() {
    let msg = config_error(
        "[config]\nrequired_env = [\"BUILDGRAPH_TEST_SURELY_UNSET_TOOLCHAIN\"]\n\n[action.a]\ncommand = \"cc\"\n",
    );
    assert!(msg.contains("BUILDGRAPH_TEST_SURELY_UNSET_TOOLCHAIN"));
}

#[test]
fn test_distributed_without_engine_is_rejected() {
    let msg = config_error(
        "[distributed]\nenabled = true\nengine = \"\"\n\n[action.a]\ncommand = \"cc\"\n",
    );
    assert!(msg.contains("[distributed].engine"));
}

#[test]
fn test_unknown_producer_conflict_policy_is_rejected() {
    let (_dir, path) = write_manifest(
        "[config]\nproducer_conflict = \"first_wins\"\n\n[action.a]\ncommand = \"cc\"\n",
    );
    assert!(matches!(load_and_validate(&path), Err(BuildError::TomlError(_))));
}

fn two_action_manifest() -> Manifest {
    ManifestBuilder::new()
        .with_action(
            "compile",
            ActionConfigBuilder::new("cc")
                .prerequisite("src/main.c")
                .produces("obj/main.o")
                .build(),
        )
        .with_action(
            "link",
            ActionConfigBuilder::new("ld")
                .prerequisite("obj/main.o")
                .produces("bin/app")
                .status("Linking")
                .build(),
        )
        .build()
}

#[test]
fn test_front_end_defaults_to_every_produced_item() {
    let (mut session, _fs) = SessionBuilder::new().build();
    let mut front_end = ManifestFrontEnd::new(two_action_manifest());

    let outputs = front_end.collect(&mut session).unwrap();

    let paths: Vec<_> = outputs
        .iter()
        .map(|&id| session.items.get(id).path.display().to_string())
        .collect();
    assert_eq!(paths, vec!["/work/obj/main.o", "/work/bin/app"]);

    let statuses: Vec<_> = session.graph.iter().map(|(_, a)| a.status.clone()).collect();
    assert_eq!(statuses, vec!["compile".to_string(), "Linking".to_string()]);
}

#[test]
fn test_front_end_requested_outputs_override_manifest() {
    let (mut session, _fs) = SessionBuilder::new().build();
    let mut front_end = ManifestFrontEnd::new(two_action_manifest())
        .with_requested_outputs(vec!["obj/main.o".to_string()]);

    let outputs = front_end.collect(&mut session).unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(session.items.get(outputs[0]).path, PathBuf::from("/work/obj/main.o"));
}

#[test]
fn test_front_end_paths_are_case_insensitive_by_default() {
    let (mut session, _fs) = SessionBuilder::new().build();
    let manifest = ManifestBuilder::new()
        .with_action(
            "a",
            ActionConfigBuilder::new("a").produces("Out/Lib.o").build(),
        )
        .with_action(
            "b",
            ActionConfigBuilder::new("b").prerequisite("out/lib.o").produces("b.out").build(),
        )
        .build();

    ManifestFrontEnd::new(manifest).collect(&mut session).unwrap();

    let (_, a) = session.graph.iter().next().unwrap();
    let (_, b) = session.graph.iter().nth(1).unwrap();
    assert_eq!(a.produced[0], b.prerequisites[0]);
}

#[test]
fn test_working_dir_tokens_expand_before_resolving() {
    // SAFETY: the variable name is unique to this test.
    unsafe { std::env::set_var("BUILDGRAPH_TEST_OBJ_ROOT", "/tmp/objroot") };
    let (mut session, _fs) = SessionBuilder::new().build();
    let manifest = ManifestBuilder::new()
        .with_action(
            "cc",
            ActionConfigBuilder::new("cc")
                .working_dir("$(BUILDGRAPH_TEST_OBJ_ROOT)/obj")
                .produces("a.o")
                .build(),
        )
        .build();

    ManifestFrontEnd::new(manifest).collect(&mut session).unwrap();
    let (id, _) = session.graph.iter().next().unwrap();

    let launch = LaunchSpec::from_action(&session.graph, id, session.root());
    assert_eq!(launch.working_dir, PathBuf::from("/tmp/objroot/obj"));
}

#[test]
fn test_local_and_distributed_agree_on_working_dir() {
    let (mut session, _fs) = SessionBuilder::new().build();
    let manifest = ManifestBuilder::new()
        .with_action("a", ActionConfigBuilder::new("a").produces("a.o").build())
        .with_action(
            "b",
            ActionConfigBuilder::new("b")
                .working_dir("sub/../obj")
                .produces("b.o")
                .build(),
        )
        .build();

    ManifestFrontEnd::new(manifest).collect(&mut session).unwrap();
    let ids: Vec<_> = session.graph.iter().map(|(id, _)| id).collect();
    let job = build_job(&session.graph, &session.items, &ids, "grp");

    let local: Vec<_> = ids
        .iter()
        .map(|&id| {
            LaunchSpec::from_action(&session.graph, id, session.root())
                .working_dir
                .display()
                .to_string()
        })
        .collect();
    let exported: Vec<_> = job.tasks.iter().map(|t| t.working_dir.clone()).collect();
    assert_eq!(local, vec!["/work".to_string(), "/work/obj".to_string()]);
    assert_eq!(exported, local);
}
