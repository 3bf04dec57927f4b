//! Resolution of time-based waits whose instant has passed.

use tracing::{debug, info};

use crate::cascade::propagate::propagate;
use crate::cascade::{Effects, OpContext};
use crate::model::{Criteria, Item, Project};
use crate::state::StateSnapshot;

/// IDs of open time-based waits due at `ctx.now`, in stored order.
pub fn due_time_waits(project: &Project, ctx: &OpContext) -> Vec<String> {
    project
        .waits
        .iter()
        .filter(|w| w.is_open())
        .filter(|w| matches!(w.criteria, Criteria::Time { after } if after <= ctx.now))
        .map(|w| w.id().to_string())
        .collect()
}

/// Resolve every due time-based wait, then cascade.
///
/// Each wait is resolved the way a manual completion would be, with
/// `resolution` as its text. Waits already done are not rescanned, so a
/// second sweep at the same instant returns empty effects.
pub fn run_time_check_sweep(
    project: &mut Project,
    ctx: &OpContext,
    resolution: Option<&str>,
) -> Effects {
    let mut effects = Effects::default();
    let mut due = due_time_waits(project, ctx);
    if due.is_empty() {
        debug!(prefix = %project.prefix, "no time-based waits due");
        return effects;
    }

    let baseline = StateSnapshot::capture(project, ctx.now);
    for id in &due {
        if let Some(wait) = project.wait_mut(id) {
            wait.meta.mark_done(ctx.now);
            wait.resolution = resolution.map(str::to_string);
        }
    }
    due.sort();
    info!(prefix = %project.prefix, resolved = due.len(), "time-based waits resolved");
    effects.resolved = due;

    propagate(project, &baseline, ctx, &mut effects);
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use chrono::{DateTime, Duration, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn sweep_resolves_due_waits_and_cascades() {
        let mut project = Project::new("ab", "Alpha").unwrap();
        let past = project
            .add_wait(Criteria::Time { after: now() - Duration::hours(1) }, now())
            .unwrap();
        let future = project
            .add_wait(Criteria::Time { after: now() + Duration::hours(1) }, now())
            .unwrap();
        let task = project.add_task("ship", now()).unwrap();
        project.task_mut(&task).unwrap().meta.blocked_by.push(past.clone());

        let ctx = OpContext::at(now());
        let effects = run_time_check_sweep(&mut project, &ctx, None);

        assert_eq!(effects.resolved, vec![past.clone()]);
        assert_eq!(effects.unblocked, vec![task]);
        assert_eq!(project.wait(&past).unwrap().status(), Status::Done);
        assert_eq!(project.wait(&future).unwrap().status(), Status::Open);

        let second = run_time_check_sweep(&mut project, &ctx, None);
        assert!(second.is_empty());
    }

    #[test]
    fn wait_due_exactly_now_is_resolved() {
        let mut project = Project::new("ab", "Alpha").unwrap();
        let w = project.add_wait(Criteria::Time { after: now() }, now()).unwrap();

        let effects = run_time_check_sweep(&mut project, &OpContext::at(now()), Some("elapsed"));

        assert_eq!(effects.resolved, vec![w.clone()]);
        assert_eq!(project.wait(&w).unwrap().resolution.as_deref(), Some("elapsed"));
    }

    #[test]
    fn manual_waits_are_never_swept() {
        let mut project = Project::new("ab", "Alpha").unwrap();
        project
            .add_wait(
                Criteria::Manual {
                    question: "approved?".into(),
                    check_after: Some(now() - Duration::days(1)),
                },
                now(),
            )
            .unwrap();

        let effects = run_time_check_sweep(&mut project, &OpContext::at(now()), None);
        assert!(effects.is_empty());
    }
}
