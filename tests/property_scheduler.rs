mod common;

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use buildgraph::dag::{ActionOutcome, ActionRunState, RunScheduler};
use buildgraph::engine::plan_pass;
use buildgraph::types::ProducerConflictPolicy;
use common::builders::{add_action, SessionBuilder};
use proptest::prelude::*;

// Acyclic by construction: action N may only depend on outputs of 0..N-1.
fn dag_strategy(max_actions: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1..=max_actions).prop_flat_map(|n| {
        proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n).prop_map(
            |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, deps)| {
                        let set: HashSet<usize> =
                            deps.into_iter().filter(|_| i > 0).map(|d| d % i.max(1)).collect();
                        set.into_iter().collect()
                    })
                    .collect()
            },
        )
    })
}

proptest! {
    #[test]
    fn test_scheduler_terminates_within_budget(
        deps in dag_strategy(12),
        failing in proptest::collection::hash_set(0..12usize, 0..4),
        budget in 1..5usize,
    ) {
        let (mut session, _fs) = SessionBuilder::new().build();
        let mut names = HashMap::new();
        for (i, action_deps) in deps.iter().enumerate() {
            let inputs: Vec<String> = action_deps.iter().map(|d| format!("out{d}")).collect();
            let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            let id = add_action(&mut session, &format!("a{i}"), &inputs, &[format!("out{i}").as_str()]);
            names.insert(id, i);
        }
        let outputs: Vec<_> = (0..deps.len()).map(|i| session.item(format!("out{i}"))).collect();
        let plan = plan_pass(&mut session, &outputs, ProducerConflictPolicy::Reject).unwrap();
        prop_assert_eq!(plan.to_run.len(), deps.len());

        let mut scheduler = RunScheduler::new(&session.graph, &session.items, &plan.to_run, budget);
        let mut running: Vec<_> = scheduler.start().newly_scheduled;
        let mut steps = 0;

        while let Some(id) = running.pop() {
            prop_assert!(scheduler.running_count() <= budget);
            let outcome = if failing.contains(&names[&id]) {
                ActionOutcome::Failed(1)
            } else {
                ActionOutcome::Success
            };
            let step = scheduler.step_completion(id, outcome);
            running.extend(step.newly_scheduled);
            steps += 1;
            prop_assert!(steps <= deps.len());
        }

        prop_assert!(scheduler.is_finished());
        for (id, state) in scheduler.states() {
            prop_assert!(state.is_terminal());
            let i = names[&id];
            if state == ActionRunState::Succeeded {
                for &d in &deps[i] {
                    let dep_id = *names.iter().find(|(_, n)| **n == d).unwrap().0;
                    prop_assert_eq!(scheduler.state_of(dep_id), Some(ActionRunState::Succeeded));
                }
            }
        }
        prop_assert_eq!(
            scheduler.all_succeeded(),
            scheduler.states().iter().all(|(id, _)| !failing.contains(&names[id]))
        );
    }
}

#[test]
fn test_long_chain_steps_in_linear_time() {
    const LEN: usize = 20_000;
    let (mut session, _fs) = SessionBuilder::new().build();
    let mut ids = Vec::with_capacity(LEN);
    for i in 0..LEN {
        let input = i.checked_sub(1).map(|prev| format!("out{prev}"));
        let inputs: Vec<&str> = input.iter().map(String::as_str).collect();
        ids.push(add_action(&mut session, &format!("a{i}"), &inputs, &[format!("out{i}").as_str()]));
    }
    session
        .graph
        .link_producers(&mut session.items, ProducerConflictPolicy::Reject)
        .unwrap();

    let started = Instant::now();
    let mut scheduler = RunScheduler::new(&session.graph, &session.items, &ids, 8);
    let mut running = scheduler.start().newly_scheduled;
    let mut completed = 0;
    while let Some(id) = running.pop() {
        assert_eq!(scheduler.running_count(), 1);
        running.extend(scheduler.step_completion(id, ActionOutcome::Success).newly_scheduled);
        completed += 1;
    }

    assert_eq!(completed, LEN);
    assert!(scheduler.all_succeeded());
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "stepping {LEN} actions took {:?}",
        started.elapsed()
    );
}

#[test]
fn test_failure_midway_skips_rest_of_chain() {
    let (mut session, _fs) = SessionBuilder::new().build();
    let a = add_action(&mut session, "a", &[], &["a.out"]);
    let b = add_action(&mut session, "b", &["a.out"], &["b.out"]);
    let c = add_action(&mut session, "c", &["b.out"], &["c.out"]);
    let d = add_action(&mut session, "d", &[], &["d.out"]);
    session
        .graph
        .link_producers(&mut session.items, ProducerConflictPolicy::Reject)
        .unwrap();

    let mut scheduler = RunScheduler::new(&session.graph, &session.items, &[a, b, c, d], 4);
    assert_eq!(scheduler.start().newly_scheduled, vec![a, d]);

    let step = scheduler.step_completion(a, ActionOutcome::Failed(2));
    assert!(step.newly_scheduled.is_empty());
    let mut skipped = step.newly_skipped;
    skipped.sort();
    assert_eq!(skipped, vec![b, c]);
    assert!(!step.run_just_finished);

    let step = scheduler.step_completion(d, ActionOutcome::Success);
    assert!(step.run_just_finished);
    assert_eq!(scheduler.state_of(a), Some(ActionRunState::Failed(2)));
    assert_eq!(scheduler.state_of(d), Some(ActionRunState::Succeeded));
}
