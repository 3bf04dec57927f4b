//! End-to-end cascade scenarios against an on-disk store.

use chrono::{DateTime, Duration, Utc};
use tempfile::TempDir;
use tether_core::model::{Criteria, Item, Project, Status};
use tether_core::state::BlockerIndex;
use tether_core::{
    CascadeError, CompleteRequest, DropRequest, OpContext, ProjectStore, TaskState, WaitState,
    add_blocker, complete_item, compute_task_state, compute_wait_state, drop_item,
    run_time_check_sweep,
};

fn now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn task_state(project: &Project, id: &str) -> TaskState {
    let index = BlockerIndex::from_project(project);
    compute_task_state(project.task(id).unwrap(), &index)
}

fn wait_state(project: &Project, id: &str) -> WaitState {
    let index = BlockerIndex::from_project(project);
    compute_wait_state(project.wait(id).unwrap(), &index, now())
}

#[test]
fn completing_blocker_unblocks_dependent_and_persists() {
    let dir = TempDir::new().unwrap();
    let store = ProjectStore::new(dir.path());
    let mut project = store.create("web", "Website").unwrap();
    let t1 = project.add_task("design", now()).unwrap();
    let t2 = project.add_task("build", now()).unwrap();
    add_blocker(&mut project, &t2, &t1).unwrap();
    store.save(&project).unwrap();

    let mut project = store.load_for_item("web-2").unwrap();
    assert_eq!(task_state(&project, &t2), TaskState::Blocked);

    let effects =
        complete_item(&mut project, &t1, &CompleteRequest::default(), &OpContext::at(now()))
            .unwrap();
    store.save(&project).unwrap();

    assert_eq!(effects.unblocked, vec![t2.clone()]);
    let reloaded = store.load("WEB").unwrap();
    assert_eq!(task_state(&reloaded, &t2), TaskState::Ready);
}

#[test]
fn task_behind_manual_wait_is_waiting() {
    let mut project = Project::new("ab", "Alpha").unwrap();
    let w1 = project
        .add_wait(
            Criteria::Manual {
                question: "legal sign-off?".into(),
                check_after: None,
            },
            now(),
        )
        .unwrap();
    let t3 = project.add_task("launch", now()).unwrap();
    add_blocker(&mut project, &t3, &w1).unwrap();

    assert_eq!(task_state(&project, &t3), TaskState::Waiting);
    assert_eq!(wait_state(&project, &w1), WaitState::Actionable);

    let effects =
        complete_item(&mut project, &w1, &CompleteRequest::default(), &OpContext::at(now()))
            .unwrap();
    assert_eq!(effects.unblocked, vec![t3]);
}

#[test]
fn closing_edge_reports_full_cycle_path() {
    let mut project = Project::new("ab", "Alpha").unwrap();
    let t1 = project.add_task("one", now()).unwrap();
    let t2 = project.add_task("two", now()).unwrap();
    let t3 = project.add_task("three", now()).unwrap();
    add_blocker(&mut project, &t3, &t2).unwrap();
    add_blocker(&mut project, &t2, &t1).unwrap();

    let err = add_blocker(&mut project, &t1, &t3).unwrap_err();

    let CascadeError::DependencyCycle { path, .. } = err else {
        panic!("expected a cycle, got {err:?}");
    };
    assert_eq!(path, vec![t3.clone(), t2, t1.clone(), t3]);
    assert!(project.task(&t1).unwrap().blocked_by().is_empty());
}

#[test]
fn wait_activation_and_auto_complete_chain() {
    // T1 ← W2 (dormant until T1 is done) ← T3 (auto) ← T4 (auto)
    let mut project = Project::new("ab", "Alpha").unwrap();
    let t1 = project.add_task("collect data", now()).unwrap();
    let w2 = project
        .add_wait(
            Criteria::Manual {
                question: "numbers look right?".into(),
                check_after: None,
            },
            now(),
        )
        .unwrap();
    let t3 = project.add_task("publish", now()).unwrap();
    let t4 = project.add_task("announce", now()).unwrap();
    add_blocker(&mut project, &w2, &t1).unwrap();
    add_blocker(&mut project, &t3, &w2).unwrap();
    add_blocker(&mut project, &t4, &t3).unwrap();
    project.task_mut(&t3).unwrap().auto_complete = true;
    project.task_mut(&t4).unwrap().auto_complete = true;
    assert_eq!(wait_state(&project, &w2), WaitState::Dormant);

    let ctx = OpContext::at(now());
    let effects = complete_item(&mut project, &t1, &CompleteRequest::default(), &ctx).unwrap();
    assert_eq!(effects.activated, vec![w2.clone()]);
    assert!(effects.auto_completed.is_empty());

    let effects = complete_item(&mut project, &w2, &CompleteRequest::default(), &ctx).unwrap();
    assert_eq!(effects.auto_completed, vec![t3.clone(), t4.clone()]);
    assert_eq!(project.task(&t4).unwrap().status(), Status::Done);
}

#[test]
fn drop_policies_on_shared_dependents() {
    let build = || {
        let mut project = Project::new("ab", "Alpha").unwrap();
        let a = project.add_task("vendor A", now()).unwrap();
        let b = project.add_task("vendor B", now()).unwrap();
        let c = project.add_task("integrate", now()).unwrap();
        add_blocker(&mut project, &c, &a).unwrap();
        add_blocker(&mut project, &c, &b).unwrap();
        (project, a, b, c)
    };
    let ctx = OpContext::at(now());

    let (mut project, a, b, c) = build();
    let detach = DropRequest {
        reason: Some("vendor gone".into()),
        remove_deps: true,
        ..DropRequest::default()
    };
    let effects = drop_item(&mut project, &a, &detach, &ctx).unwrap();
    assert_eq!(project.task(&c).unwrap().blocked_by(), [b.clone()]);
    assert!(effects.unblocked.is_empty());
    assert_eq!(task_state(&project, &c), TaskState::Blocked);

    let (mut project, a, b, c) = build();
    let cascade = DropRequest {
        drop_deps: true,
        ..DropRequest::default()
    };
    let effects = drop_item(&mut project, &a, &cascade, &ctx).unwrap();
    assert_eq!(effects.dropped, vec![a, c.clone()]);
    assert_eq!(project.task(&b).unwrap().status(), Status::Open);
    assert_eq!(project.task(&c).unwrap().status(), Status::Dropped);
}

#[test]
fn sweep_twice_resolves_once() {
    let mut project = Project::new("ab", "Alpha").unwrap();
    let w = project
        .add_wait(
            Criteria::Time {
                after: now() - Duration::minutes(5),
            },
            now(),
        )
        .unwrap();
    let t = project.add_task("follow up", now()).unwrap();
    add_blocker(&mut project, &t, &w).unwrap();
    assert_eq!(wait_state(&project, &w), WaitState::Actionable);

    let ctx = OpContext::at(now());
    let first = run_time_check_sweep(&mut project, &ctx, None);
    let second = run_time_check_sweep(&mut project, &ctx, None);

    assert_eq!(first.resolved, vec![w]);
    assert_eq!(first.unblocked, vec![t]);
    assert!(second.resolved.is_empty());
}
