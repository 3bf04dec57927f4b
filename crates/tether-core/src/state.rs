//! Effective-state derivation.
//!
//! Effective state is never stored. It is recomputed from an item's stored
//! [`Status`], whether each of its blockers is resolved, and (for waits) the
//! current instant. Nothing here mutates; in particular a time-based wait
//! whose instant has passed is reported actionable, and only the sweep in
//! [`crate::sweep`] actually resolves it.

#![allow(clippy::must_use_candidate)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::model::{Criteria, Item, ItemKind, Project, Status, Task, Wait};

/// Derived state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Ready,
    Blocked,
    Waiting,
    Done,
    Dropped,
}

/// Derived state of a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    Actionable,
    Pending,
    Dormant,
    Done,
    Dropped,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ready => "ready",
            Self::Blocked => "blocked",
            Self::Waiting => "waiting",
            Self::Done => "done",
            Self::Dropped => "dropped",
        })
    }
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Actionable => "actionable",
            Self::Pending => "pending",
            Self::Dormant => "dormant",
            Self::Done => "done",
            Self::Dropped => "dropped",
        })
    }
}

/// Per-blocker facts the deriver needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockerInfo {
    pub kind: ItemKind,
    pub resolved: bool,
}

/// Project-wide map from item ID to kind and "is this resolved".
///
/// IDs missing from the index are orphan references: they count as
/// unresolved, with their kind taken from the ID suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockerIndex {
    entries: HashMap<String, BlockerInfo>,
}

impl BlockerIndex {
    pub fn from_project(project: &Project) -> Self {
        let tasks = project.tasks.iter().map(|t| (&t.meta, ItemKind::Task));
        let waits = project.waits.iter().map(|w| (&w.meta, ItemKind::Wait));
        let entries = tasks
            .chain(waits)
            .map(|(meta, kind)| {
                let info = BlockerInfo {
                    kind,
                    resolved: meta.status.is_resolved(),
                };
                (meta.id.clone(), info)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, id: &str) -> BlockerInfo {
        self.entries.get(id).copied().unwrap_or_else(|| BlockerInfo {
            kind: ItemKind::guess(id),
            resolved: false,
        })
    }

    pub fn is_resolved(&self, id: &str) -> bool {
        self.get(id).resolved
    }

    /// Record a status change made during a cascade.
    pub fn set_status(&mut self, id: &str, status: Status) {
        if let Some(info) = self.entries.get_mut(id) {
            info.resolved = status.is_resolved();
        }
    }

    /// Blockers of `blocked_by` that are still unresolved, in order.
    pub fn unresolved<'a>(&self, blocked_by: &'a [String]) -> Vec<&'a str> {
        blocked_by
            .iter()
            .filter(|b| !self.is_resolved(b))
            .map(String::as_str)
            .collect()
    }

    fn any_unresolved(&self, blocked_by: &[String], kind: Option<ItemKind>) -> bool {
        blocked_by.iter().any(|b| {
            let info = self.get(b);
            !info.resolved && kind.is_none_or(|k| k == info.kind)
        })
    }
}

/// Derive a task's effective state. First matching rule wins:
///
/// 1. done / dropped
/// 2. any unresolved *task* blocker → blocked
/// 3. any unresolved *wait* blocker → waiting
/// 4. ready
///
/// Blocked outranks waiting when both apply.
pub fn compute_task_state(task: &Task, index: &BlockerIndex) -> TaskState {
    match task.status() {
        Status::Done => TaskState::Done,
        Status::Dropped => TaskState::Dropped,
        Status::Open => {
            if index.any_unresolved(task.blocked_by(), Some(ItemKind::Task)) {
                TaskState::Blocked
            } else if index.any_unresolved(task.blocked_by(), Some(ItemKind::Wait)) {
                TaskState::Waiting
            } else {
                TaskState::Ready
            }
        }
    }
}

/// Derive a wait's effective state at `now`. First matching rule wins:
///
/// 1. done / dropped
/// 2. any unresolved blocker → dormant
/// 3. manual with `check_after` still ahead → pending
/// 4. time-based with `after` still ahead → pending
/// 5. actionable
pub fn compute_wait_state(wait: &Wait, index: &BlockerIndex, now: DateTime<Utc>) -> WaitState {
    match wait.status() {
        Status::Done => WaitState::Done,
        Status::Dropped => WaitState::Dropped,
        Status::Open => {
            if index.any_unresolved(wait.blocked_by(), None) {
                return WaitState::Dormant;
            }
            let not_yet = match &wait.criteria {
                Criteria::Manual { check_after, .. } => check_after.is_some_and(|at| at > now),
                Criteria::Time { after } => *after > now,
            };
            if not_yet {
                WaitState::Pending
            } else {
                WaitState::Actionable
            }
        }
    }
}

/// Effective states of every item in a project at one instant, plus the
/// blocker index they were derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    pub tasks: HashMap<String, TaskState>,
    pub waits: HashMap<String, WaitState>,
    pub blockers: BlockerIndex,
}

impl StateSnapshot {
    pub fn capture(project: &Project, now: DateTime<Utc>) -> Self {
        let index = BlockerIndex::from_project(project);
        Self::capture_with(project, &index, now)
    }

    pub fn capture_with(project: &Project, index: &BlockerIndex, now: DateTime<Utc>) -> Self {
        Self {
            tasks: project
                .tasks
                .iter()
                .map(|t| (t.meta.id.clone(), compute_task_state(t, index)))
                .collect(),
            waits: project
                .waits
                .iter()
                .map(|w| (w.meta.id.clone(), compute_wait_state(w, index, now)))
                .collect(),
            blockers: index.clone(),
        }
    }

    pub fn task(&self, id: &str) -> Option<TaskState> {
        self.tasks.get(id).copied()
    }

    pub fn wait(&self, id: &str) -> Option<WaitState> {
        self.waits.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn manual(question: &str, check_after: Option<DateTime<Utc>>) -> Criteria {
        Criteria::Manual {
            question: question.into(),
            check_after,
        }
    }

    /// T1, T2 (blocked by T1), W3 manual, T4 blocked by W3.
    fn fixture() -> Project {
        let mut project = Project::new("ab", "Alpha").unwrap();
        let t1 = project.add_task("one", now()).unwrap();
        let t2 = project.add_task("two", now()).unwrap();
        let w3 = project.add_wait(manual("approved?", None), now()).unwrap();
        let t4 = project.add_task("four", now()).unwrap();
        project.task_mut(&t2).unwrap().meta.blocked_by.push(t1);
        project.task_mut(&t4).unwrap().meta.blocked_by.push(w3);
        project
    }

    fn task_state(project: &Project, id: &str) -> TaskState {
        let index = BlockerIndex::from_project(project);
        compute_task_state(project.task(id).unwrap(), &index)
    }

    fn wait_state(project: &Project, id: &str, at: DateTime<Utc>) -> WaitState {
        let index = BlockerIndex::from_project(project);
        compute_wait_state(project.wait(id).unwrap(), &index, at)
    }

    #[test]
    fn unblocked_task_is_ready() {
        let project = fixture();
        assert_eq!(task_state(&project, "AB-001"), TaskState::Ready);
    }

    #[test]
    fn task_blocked_by_open_task_is_blocked() {
        let project = fixture();
        assert_eq!(task_state(&project, "AB-002"), TaskState::Blocked);
    }

    #[test]
    fn task_blocked_by_open_wait_is_waiting() {
        let project = fixture();
        assert_eq!(task_state(&project, "AB-004"), TaskState::Waiting);
        assert_eq!(wait_state(&project, "AB-003W", now()), WaitState::Actionable);
    }

    #[test]
    fn blocked_outranks_waiting() {
        let mut project = fixture();
        project.task_mut("AB-004").unwrap().meta.blocked_by.push("AB-001".into());
        assert_eq!(task_state(&project, "AB-004"), TaskState::Blocked);
    }

    #[test]
    fn resolved_blockers_do_not_block() {
        let mut project = fixture();
        project.task_mut("AB-001").unwrap().meta.status = Status::Dropped;
        project.wait_mut("AB-003W").unwrap().meta.status = Status::Done;
        assert_eq!(task_state(&project, "AB-002"), TaskState::Ready);
        assert_eq!(task_state(&project, "AB-004"), TaskState::Ready);
    }

    #[test]
    fn stored_status_wins_over_blockers() {
        let mut project = fixture();
        project.task_mut("AB-002").unwrap().meta.status = Status::Done;
        assert_eq!(task_state(&project, "AB-002"), TaskState::Done);
        project.task_mut("AB-002").unwrap().meta.status = Status::Dropped;
        assert_eq!(task_state(&project, "AB-002"), TaskState::Dropped);
    }

    #[test]
    fn orphan_blocker_counts_as_unresolved_of_its_suffix_kind() {
        let mut project = fixture();
        project.task_mut("AB-001").unwrap().meta.blocked_by.push("AB-077W".into());
        assert_eq!(task_state(&project, "AB-001"), TaskState::Waiting);
        project.task_mut("AB-001").unwrap().meta.blocked_by.push("AB-078".into());
        assert_eq!(task_state(&project, "AB-001"), TaskState::Blocked);
    }

    #[test]
    fn blocked_wait_is_dormant() {
        let mut project = fixture();
        project.wait_mut("AB-003W").unwrap().meta.blocked_by.push("AB-001".into());
        assert_eq!(wait_state(&project, "AB-003W", now()), WaitState::Dormant);
    }

    #[test]
    fn manual_wait_with_future_check_after_is_pending() {
        let mut project = fixture();
        let later = now() + Duration::days(2);
        project.wait_mut("AB-003W").unwrap().criteria = manual("approved?", Some(later));
        assert_eq!(wait_state(&project, "AB-003W", now()), WaitState::Pending);
        assert_eq!(wait_state(&project, "AB-003W", later), WaitState::Actionable);
    }

    #[test]
    fn time_wait_is_pending_then_actionable_not_resolved() {
        let mut project = fixture();
        let later = now() + Duration::hours(3);
        project.wait_mut("AB-003W").unwrap().criteria = Criteria::Time { after: later };
        assert_eq!(wait_state(&project, "AB-003W", now()), WaitState::Pending);

        let past_due = later + Duration::minutes(1);
        assert_eq!(wait_state(&project, "AB-003W", past_due), WaitState::Actionable);
        assert_eq!(project.wait("AB-003W").unwrap().meta.status, Status::Open);
    }

    #[test]
    fn snapshot_covers_every_item() {
        let project = fixture();
        let snapshot = StateSnapshot::capture(&project, now());
        assert_eq!(snapshot.tasks.len(), 3);
        assert_eq!(snapshot.waits.len(), 1);
        assert_eq!(snapshot.task("AB-002"), Some(TaskState::Blocked));
        assert_eq!(snapshot.wait("AB-003W"), Some(WaitState::Actionable));
        assert_eq!(snapshot.task("AB-999"), None);
    }

    #[test]
    fn index_set_status_tracks_cascade_changes() {
        let project = fixture();
        let mut index = BlockerIndex::from_project(&project);
        assert!(!index.is_resolved("AB-001"));
        index.set_status("AB-001", Status::Done);
        assert!(index.is_resolved("AB-001"));
        let blocked_by = vec!["AB-001".to_string(), "AB-003W".to_string()];
        assert_eq!(index.unresolved(&blocked_by), vec!["AB-003W"]);
    }
}
