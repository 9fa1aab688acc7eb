mod common;

use std::time::Duration;

use buildgraph::dag::ActionRunState;
use buildgraph::engine::{plan_pass, BuildSession};
use buildgraph::exec::LocalExecutor;
use buildgraph::types::ProducerConflictPolicy;
use common::builders::{add_action, SessionBuilder};
use common::{with_timeout, FakeLauncher};
use tokio_util::sync::CancellationToken;

fn plan_all(session: &mut BuildSession, outputs: &[&str]) -> Vec<buildgraph::dag::ActionId> {
    let outputs: Vec<_> = outputs.iter().map(|p| session.item(p)).collect();
    plan_pass(session, &outputs, ProducerConflictPolicy::Reject)
        .unwrap()
        .to_run
}

#[tokio::test]
async fn test_failure_skips_dependents_but_not_siblings() {
    common::init_tracing();
    with_timeout(async {
        let (mut session, _fs) = SessionBuilder::new().build();
        // A -> B -> C, plus an unrelated D.
        let a = add_action(&mut session, "a", &["a.in"], &["a.out"]);
        let b = add_action(&mut session, "b", &["a.out"], &["b.out"]);
        let c = add_action(&mut session, "c", &["b.out"], &["c.out"]);
        let d = add_action(&mut session, "d", &["d.in"], &["d.out"]);
        let to_run = plan_all(&mut session, &["c.out", "d.out"]);
        assert_eq!(to_run.len(), 4);

        let launcher = FakeLauncher::new().exit_code("a", 1).exit_code("d", 3);
        let executor = LocalExecutor::new(launcher.clone(), 4);

        let report = executor
            .execute(&session.graph, &session.items, &to_run, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.state_of(a), Some(ActionRunState::Failed(1)));
        assert_eq!(report.state_of(b), Some(ActionRunState::Skipped));
        assert_eq!(report.state_of(c), Some(ActionRunState::Skipped));
        assert_eq!(report.state_of(d), Some(ActionRunState::Failed(3)));
        assert!(!report.success());

        assert!(launcher.launched("a"));
        assert!(launcher.launched("d"));
        assert!(!launcher.launched("b"));
        assert!(!launcher.launched("c"));
        let mut executed = report.executed();
        executed.sort();
        assert_eq!(executed, vec![a, d]);
    })
    .await;
}

#[tokio::test]
async fn test_successful_sibling_keeps_running_after_failure() {
    with_timeout(async {
        let (mut session, _fs) = SessionBuilder::new().build();
        let a = add_action(&mut session, "a", &["a.in"], &["a.out"]);
        let b = add_action(&mut session, "b", &["a.out"], &["b.out"]);
        let d = add_action(&mut session, "d", &["d.in"], &["d.out"]);
        let d2 = add_action(&mut session, "d2", &["d.out"], &["d2.out"]);
        let to_run = plan_all(&mut session, &["b.out", "d2.out"]);

        let launcher = FakeLauncher::new().exit_code("a", 2);
        let report = LocalExecutor::new(launcher.clone(), 2)
            .execute(&session.graph, &session.items, &to_run, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.state_of(a), Some(ActionRunState::Failed(2)));
        assert_eq!(report.state_of(b), Some(ActionRunState::Skipped));
        assert_eq!(report.state_of(d), Some(ActionRunState::Succeeded));
        assert_eq!(report.state_of(d2), Some(ActionRunState::Succeeded));
        assert_eq!(launcher.launches().len(), 3);
    })
    .await;
}

#[tokio::test]
async fn test_concurrency_never_exceeds_budget() {
    with_timeout(async {
        let (mut session, _fs) = SessionBuilder::new().build();
        let mut outputs = Vec::new();
        for i in 0..10 {
            let out = format!("out{i}.o");
            add_action(&mut session, &format!("cc{i}"), &[format!("in{i}.c").as_str()], &[out.as_str()]);
            outputs.push(out);
        }
        let outputs: Vec<&str> = outputs.iter().map(String::as_str).collect();
        let to_run = plan_all(&mut session, &outputs);
        assert_eq!(to_run.len(), 10);

        let launcher = FakeLauncher::new().with_delay(Duration::from_millis(20));
        let report = LocalExecutor::new(launcher.clone(), 3)
            .execute(&session.graph, &session.items, &to_run, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(launcher.launches().len(), 10);
        assert!(launcher.peak_concurrency() <= 3, "peak was {}", launcher.peak_concurrency());
        assert!(report.peak_concurrency <= 3);
        assert!(report.peak_concurrency >= 1);
    })
    .await;
}

#[tokio::test]
async fn test_budget_of_one_serializes() {
    with_timeout(async {
        let (mut session, _fs) = SessionBuilder::new().build();
        add_action(&mut session, "x", &[], &["x.out"]);
        add_action(&mut session, "y", &[], &["y.out"]);
        add_action(&mut session, "z", &[], &["z.out"]);
        let to_run = plan_all(&mut session, &["x.out", "y.out", "z.out"]);

        let launcher = FakeLauncher::new();
        let report = LocalExecutor::new(launcher.clone(), 0)
            .execute(&session.graph, &session.items, &to_run, CancellationToken::new())
            .await
            .unwrap();

        assert!(report.success());
        assert_eq!(launcher.peak_concurrency(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_launch_failure_fails_action_and_skips_dependents() {
    with_timeout(async {
        let (mut session, _fs) = SessionBuilder::new().build();
        let a = add_action(&mut session, "a", &[], &["a.out"]);
        let b = add_action(&mut session, "b", &["a.out"], &["b.out"]);
        let to_run = plan_all(&mut session, &["b.out"]);

        let launcher = FakeLauncher::new().unlaunchable("a");
        let report = LocalExecutor::new(launcher, 2)
            .execute(&session.graph, &session.items, &to_run, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.state_of(a), Some(ActionRunState::Failed(-1)));
        assert_eq!(report.state_of(b), Some(ActionRunState::Skipped));
    })
    .await;
}

#[tokio::test]
async fn test_cancellation_marks_unfinished_actions_cancelled() {
    with_timeout(async {
        let (mut session, _fs) = SessionBuilder::new().build();
        let slow = add_action(&mut session, "slow", &[], &["slow.out"]);
        let after = add_action(&mut session, "after", &["slow.out"], &["after.out"]);
        let to_run = plan_all(&mut session, &["after.out"]);

        let launcher = FakeLauncher::new().with_delay(Duration::from_secs(30));
        let executor = LocalExecutor::new(launcher.clone(), 2);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let report = executor
            .execute(&session.graph, &session.items, &to_run, cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(!report.success());
        assert_eq!(report.state_of(slow), Some(ActionRunState::Cancelled));
        assert_eq!(report.state_of(after), Some(ActionRunState::Cancelled));
        assert!(launcher.launched("slow"));
        assert!(!launcher.launched("after"));
    })
    .await;
}

#[tokio::test]
async fn test_tool_times_are_keyed_by_command_stem() {
    with_timeout(async {
        let (mut session, _fs) = SessionBuilder::new().build();
        add_action(&mut session, "cc", &["a.c"], &["a.o"]);
        let to_run = plan_all(&mut session, &["a.o"]);

        let report = LocalExecutor::new(FakeLauncher::new(), 1)
            .execute(&session.graph, &session.items, &to_run, CancellationToken::new())
            .await
            .unwrap();

        let cc = report.tool_times.get("cc").unwrap();
        assert_eq!(cc.invocations, 1);
    })
    .await;
}
