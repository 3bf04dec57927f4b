//! Fixed-point propagation after a status change.

use tracing::debug;

use super::{Effects, OpContext};
use crate::model::{Item, Project, Status};
use crate::state::{BlockerIndex, StateSnapshot, TaskState, WaitState};

/// Apply knock-on effects of a mutation and record them in `effects`.
///
/// `baseline` must be captured before the mutation. Auto-completion runs
/// in passes until a pass finds nothing new; each pass completes at least
/// one open task, so the loop ends after at most `tasks.len()` passes.
///
/// A task qualifies for auto-completion when it is open and opted in, every
/// blocker is now resolved, and at least one of those blockers was
/// unresolved in the baseline. Removing an edge never resolves anything, so
/// edge edits alone cannot complete a task.
pub(crate) fn propagate(
    project: &mut Project,
    baseline: &StateSnapshot,
    ctx: &OpContext,
    effects: &mut Effects,
) {
    let mut index = BlockerIndex::from_project(project);

    if ctx.options.auto_complete {
        let mut passes = 0usize;
        loop {
            let due: Vec<String> = project
                .tasks
                .iter()
                .filter(|t| t.is_open() && t.auto_complete && !t.blocked_by().is_empty())
                .filter(|t| t.blocked_by().iter().all(|b| index.is_resolved(b)))
                .filter(|t| {
                    t.blocked_by()
                        .iter()
                        .any(|b| !baseline.blockers.is_resolved(b))
                })
                .map(|t| t.id().to_string())
                .collect();

            if due.is_empty() {
                break;
            }
            passes += 1;

            for id in due {
                if let Some(task) = project.task_mut(&id) {
                    task.meta.mark_done(ctx.now);
                }
                index.set_status(&id, Status::Done);
                debug!(item = %id, pass = passes, "auto-completed");
                effects.auto_completed.push(id);
            }
        }
    }

    let after = StateSnapshot::capture_with(project, &index, ctx.now);

    let mut unblocked: Vec<String> = after
        .tasks
        .iter()
        .filter(|(_, state)| **state == TaskState::Ready)
        .filter(|(id, _)| baseline.task(id).is_some_and(|s| s != TaskState::Ready))
        .map(|(id, _)| id.clone())
        .collect();
    unblocked.sort();

    let mut activated: Vec<String> = after
        .waits
        .iter()
        .filter(|(_, state)| **state == WaitState::Actionable)
        .filter(|(id, _)| baseline.wait(id).is_some_and(|s| s != WaitState::Actionable))
        .map(|(id, _)| id.clone())
        .collect();
    activated.sort();

    if !unblocked.is_empty() || !activated.is_empty() {
        debug!(
            unblocked = unblocked.len(),
            activated = activated.len(),
            "propagation settled"
        );
    }

    effects.unblocked.extend(unblocked);
    effects.activated.extend(activated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineOptions;
    use chrono::{DateTime, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    /// AB-001 ← AB-002 ← AB-003 ← AB-004, all auto-complete except AB-001.
    fn chain() -> Project {
        let mut project = Project::new("ab", "Alpha").unwrap();
        let mut prev: Option<String> = None;
        for title in ["root", "a", "b", "c"] {
            let id = project.add_task(title, now()).unwrap();
            let task = project.task_mut(&id).unwrap();
            if let Some(p) = prev.take() {
                task.meta.blocked_by.push(p);
                task.auto_complete = true;
            }
            prev = Some(id);
        }
        project
    }

    #[test]
    fn chain_collapses_in_one_call() {
        let mut project = chain();
        let ctx = OpContext::at(now());
        let baseline = StateSnapshot::capture(&project, ctx.now);
        project.task_mut("AB-001").unwrap().meta.mark_done(now());

        let mut effects = Effects::default();
        propagate(&mut project, &baseline, &ctx, &mut effects);

        assert_eq!(effects.auto_completed, vec!["AB-002", "AB-003", "AB-004"]);
        assert!(project.tasks.iter().all(|t| t.status() == Status::Done));
        assert!(effects.unblocked.is_empty());
    }

    #[test]
    fn disabled_auto_complete_only_unblocks() {
        let mut project = chain();
        let options = EngineOptions {
            auto_complete: false,
            ..EngineOptions::default()
        };
        let ctx = OpContext::new(now(), options);
        let baseline = StateSnapshot::capture(&project, ctx.now);
        project.task_mut("AB-001").unwrap().meta.mark_done(now());

        let mut effects = Effects::default();
        propagate(&mut project, &baseline, &ctx, &mut effects);

        assert!(effects.auto_completed.is_empty());
        assert_eq!(effects.unblocked, vec!["AB-002"]);
        assert_eq!(project.task("AB-003").unwrap().status(), Status::Open);
    }

    #[test]
    fn nothing_changes_without_a_mutation() {
        let mut project = chain();
        let ctx = OpContext::at(now());
        let baseline = StateSnapshot::capture(&project, ctx.now);
        let before = project.clone();

        let mut effects = Effects::default();
        propagate(&mut project, &baseline, &ctx, &mut effects);

        assert!(effects.is_empty());
        assert_eq!(project, before);
    }

    #[test]
    fn already_satisfied_task_is_left_open() {
        let mut project = chain();
        project.task_mut("AB-001").unwrap().meta.mark_done(now());
        let extra = project.add_task("unrelated", now()).unwrap();
        let ctx = OpContext::at(now());
        let baseline = StateSnapshot::capture(&project, ctx.now);
        project.task_mut(&extra).unwrap().meta.mark_done(now());

        let mut effects = Effects::default();
        propagate(&mut project, &baseline, &ctx, &mut effects);

        assert!(effects.auto_completed.is_empty());
        assert_eq!(project.task("AB-002").unwrap().status(), Status::Open);
    }
}
