mod common;

use std::path::Path;

use buildgraph::dag::Action;
use buildgraph::distributed::{
    build_job, DistributedEngine, DistributedOutcome, DistributedSettings, JobGraph, ProcessEngine,
};
use buildgraph::engine::plan_pass;
use buildgraph::types::ProducerConflictPolicy;
use common::builders::{add_action, SessionBuilder};
use common::with_timeout;
use tokio_util::sync::CancellationToken;

#[test]
fn test_dependencies_restricted_to_exported_actions() {
    // a.out is up to date, so only `b` and `c` are exported; `b`'s
    // dependency on `a` must not appear in the job.
    let (mut session, _fs) = SessionBuilder::new()
        .file_at("a.in", "x", 1_000)
        .file_at("a.out", "x", 1_100)
        .file_at("b.in", "x", 1_200)
        .build();
    add_action(&mut session, "a", &["a.in"], &["a.out"]);
    add_action(&mut session, "b", &["a.out", "b.in"], &["b.out"]);
    add_action(&mut session, "c", &["b.out"], &["c.out"]);
    let c_out = session.item("c.out");

    let plan = plan_pass(&mut session, &[c_out], ProducerConflictPolicy::Reject).unwrap();
    assert_eq!(plan.to_run.len(), 2);

    let job = build_job(&session.graph, &session.items, &plan.to_run, "grp");

    assert_eq!(job.tools.len(), 2);
    assert_eq!(job.tasks.len(), 2);
    let b_task = &job.tasks[0];
    let c_task = &job.tasks[1];
    assert!(b_task.depends_on.is_empty());
    assert_eq!(c_task.depends_on, vec![b_task.name.clone()]);
    assert!(job.tasks.iter().all(|t| t.skip_if_project_failed));
    assert!(job.tasks.iter().all(|t| t.working_dir == "/work"));
    assert!(job.tools.iter().all(|t| t.group_prefix == "grp"));
}

#[test]
fn test_tool_carries_remotable_flag_and_quoted_params() {
    let (mut session, _fs) = SessionBuilder::new().build();
    let out = session.item("out dir/x.o");
    let id = session.register(
        Action::new("cc")
            .with_args(["-o", "out dir/x.o"])
            .with_produced(out)
            .with_working_dir("/work/sub")
            .remotable(true),
    );
    session
        .graph
        .link_producers(&mut session.items, ProducerConflictPolicy::Reject)
        .unwrap();

    let job = build_job(&session.graph, &session.items, &[id], "grp");

    let tool = &job.tools[0];
    assert!(tool.allow_remote);
    assert_eq!(tool.params, "-o \"out dir/x.o\"");
    assert_eq!(tool.output_file_masks, vec!["x.o".to_string()]);
    assert_eq!(job.tasks[0].working_dir, "/work/sub");
}

#[test]
fn test_job_json_uses_engine_field_names() {
    let (mut session, _fs) = SessionBuilder::new().build();
    let id = add_action(&mut session, "cc", &["a.c"], &["a.o"]);
    session
        .graph
        .link_producers(&mut session.items, ProducerConflictPolicy::Reject)
        .unwrap();

    let job = build_job(&session.graph, &session.items, &[id], "grp");
    let json = job.to_json().unwrap();

    for key in [
        "\"Tools\"",
        "\"Tasks\"",
        "\"AllowRemote\"",
        "\"GroupPrefix\"",
        "\"OutputFileMasks\"",
        "\"DependsOn\"",
        "\"SkipIfProjectFailed\"",
        "\"WorkingDir\"",
    ] {
        assert!(json.contains(key), "missing {key} in {json}");
    }

    let parsed: JobGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, job);
}

fn engine_settings(engine: &str, dir: &Path) -> DistributedSettings {
    DistributedSettings {
        engine: engine.to_string(),
        args: Vec::new(),
        job_file: dir.join("jobs/job.json"),
        group_prefix: "grp".to_string(),
    }
}

#[tokio::test]
async fn test_missing_engine_is_unavailable() {
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let engine = ProcessEngine::new(engine_settings(
            "/definitely/not/a/distributed-engine",
            dir.path(),
        ));

        let outcome = engine
            .submit(JobGraph { tools: vec![], tasks: vec![] }, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DistributedOutcome::Unavailable);
        assert!(dir.path().join("jobs/job.json").exists());
    })
    .await;
}

#[tokio::test]
async fn test_unwritable_job_file_is_unavailable() {
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        // `jobs` is a regular file, so the job file's directory can't be created.
        std::fs::write(dir.path().join("jobs"), "not a directory").unwrap();
        let engine = ProcessEngine::new(engine_settings("true", dir.path()));

        let outcome = engine
            .submit(JobGraph { tools: vec![], tasks: vec![] }, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome, DistributedOutcome::Unavailable);
    })
    .await;
}

#[cfg(unix)]
#[tokio::test]
async fn test_engine_exit_status_maps_to_outcome() {
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let empty = || JobGraph { tools: vec![], tasks: vec![] };

        let ok = ProcessEngine::new(engine_settings("true", dir.path()));
        assert_eq!(
            ok.submit(empty(), CancellationToken::new()).await.unwrap(),
            DistributedOutcome::TasksSucceeded
        );

        let failing = ProcessEngine::new(engine_settings("false", dir.path()));
        assert_eq!(
            failing.submit(empty(), CancellationToken::new()).await.unwrap(),
            DistributedOutcome::TasksFailed
        );
    })
    .await;
}
