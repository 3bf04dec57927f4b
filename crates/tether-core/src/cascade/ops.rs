//! Mutating operations on a loaded project.
//!
//! Each operation resolves IDs, validates, and only then mutates. A returned
//! error always means the project is exactly as it was passed in.

#![allow(clippy::module_name_repetitions)]

use std::collections::HashSet;

use tracing::{debug, info};

use super::propagate::propagate;
use super::{BatchEntry, BatchOutcome, Edge, Effects, OpContext};
use crate::error::CascadeError;
use crate::graph::{DependencyGraph, EdgeReversal, check_cycle};
use crate::model::{ItemId, Project, Status};
use crate::state::{BlockerIndex, StateSnapshot};

/// Options for [`complete_item`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteRequest {
    /// Complete despite unresolved blockers, stripping every blocker edge.
    pub force: bool,
    /// Resolution text recorded on waits. Ignored for tasks.
    pub resolution: Option<String>,
}

/// Options for [`drop_item`].
///
/// When the item has dependents exactly one of `drop_deps` and
/// `remove_deps` must be set. Setting both is always an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropRequest {
    pub reason: Option<String>,
    /// Drop every transitive dependent too, with the same reason.
    pub drop_deps: bool,
    /// Strip this item from each direct dependent's `blocked_by`.
    pub remove_deps: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DependentsPolicy {
    Leave,
    Drop,
    Detach,
}

/// Map caller input to a stored ID: exact match first, then loose parsing.
fn resolve(project: &Project, raw: &str) -> Result<String, CascadeError> {
    if project.contains(raw) {
        return Ok(raw.to_string());
    }
    project
        .resolve_id(raw)
        .ok_or_else(|| CascadeError::NotFound { id: raw.to_string() })
}

fn current_status(project: &Project, id: &str) -> Result<Status, CascadeError> {
    project
        .meta(id)
        .map(|m| m.status)
        .ok_or_else(|| CascadeError::NotFound { id: id.to_string() })
}

fn check_transition(id: &str, from: Status, to: Status) -> Result<(), CascadeError> {
    from.can_transition_to(to)
        .map_err(|_| CascadeError::InvalidTransition {
            id: id.to_string(),
            from,
            to,
        })
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

/// Mark one open item done and cascade.
///
/// # Errors
///
/// - [`CascadeError::NotFound`] if `raw_id` names nothing in the project.
/// - [`CascadeError::InvalidTransition`] if the item is not open.
/// - [`CascadeError::IncompleteBlockers`] if blockers are unresolved and
///   `request.force` is unset.
pub fn complete_item(
    project: &mut Project,
    raw_id: &str,
    request: &CompleteRequest,
    ctx: &OpContext,
) -> Result<Effects, CascadeError> {
    let id = resolve(project, raw_id)?;
    check_transition(&id, current_status(project, &id)?, Status::Done)?;

    let index = BlockerIndex::from_project(project);
    let unresolved: Vec<String> = project
        .meta(&id)
        .map(|m| index.unresolved(&m.blocked_by))
        .unwrap_or_default()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !unresolved.is_empty() && !request.force {
        return Err(CascadeError::IncompleteBlockers {
            id,
            blockers: unresolved,
        });
    }

    let baseline = StateSnapshot::capture_with(project, &index, ctx.now);
    let mut effects = Effects::default();

    if let Some(meta) = project.meta_mut(&id) {
        if request.force {
            for blocker in std::mem::take(&mut meta.blocked_by) {
                effects.removed_edges.push(Edge::new(id.clone(), blocker));
            }
        }
        meta.mark_done(ctx.now);
    }
    if let Some(wait) = project.wait_mut(&id) {
        wait.resolution.clone_from(&request.resolution);
    }

    info!(item = %id, forced = request.force, "completed");
    effects.completed.push(id);
    propagate(project, &baseline, ctx, &mut effects);
    Ok(effects)
}

/// Complete several items, isolating failures per ID.
///
/// IDs run in input order, so an earlier completion can satisfy a later
/// item's blockers. An ID already completed by an earlier entry's cascade
/// succeeds with no further effects.
///
/// # Errors
///
/// [`CascadeError::BatchFailed`] only when every ID failed. Partial failure
/// is reported through [`BatchOutcome::failures`].
pub fn complete_items<S: AsRef<str>>(
    project: &mut Project,
    raw_ids: &[S],
    request: &CompleteRequest,
    ctx: &OpContext,
) -> Result<BatchOutcome, CascadeError> {
    let mut outcome = BatchOutcome::default();
    let mut done_here: HashSet<String> = HashSet::new();

    for raw in raw_ids {
        let raw = raw.as_ref();
        let already = resolve(project, raw).is_ok_and(|id| done_here.contains(&id));
        let result = if already {
            debug!(item = raw, "already completed earlier in batch");
            Ok(Effects::default())
        } else {
            complete_item(project, raw, request, ctx)
        };

        if let Ok(effects) = &result {
            done_here.extend(effects.newly_done().map(str::to_string));
        }
        outcome.entries.push(BatchEntry {
            id: raw.to_string(),
            result,
        });
    }

    if !outcome.entries.is_empty() && outcome.succeeded() == 0 {
        let failures = outcome
            .failures()
            .map(|(id, err)| (id.to_string(), err.clone()))
            .collect();
        return Err(CascadeError::BatchFailed(failures));
    }
    Ok(outcome)
}

// ---------------------------------------------------------------------------
// Drop
// ---------------------------------------------------------------------------

/// Mark one open item dropped, applying the chosen policy to dependents.
///
/// A dependent is an item that lists this one in `blocked_by`. Any direct
/// dependent forces a policy choice; `drop_deps` never touches dependents
/// that are already resolved.
///
/// # Errors
///
/// - [`CascadeError::NotFound`] / [`CascadeError::InvalidTransition`] as for
///   [`complete_item`].
/// - [`CascadeError::MissingReason`] when the options require a reason.
/// - [`CascadeError::AmbiguousDropPolicy`] when both policies are set, or
///   neither is set and dependents exist.
pub fn drop_item(
    project: &mut Project,
    raw_id: &str,
    request: &DropRequest,
    ctx: &OpContext,
) -> Result<Effects, CascadeError> {
    let id = resolve(project, raw_id)?;
    check_transition(&id, current_status(project, &id)?, Status::Dropped)?;

    let reason = request.reason.as_deref().filter(|r| !r.trim().is_empty());
    if ctx.options.require_drop_reason && reason.is_none() {
        return Err(CascadeError::MissingReason { id });
    }

    let graph = DependencyGraph::from_project(project);
    let dependents = graph.blocking(&id);

    let policy = match (request.drop_deps, request.remove_deps) {
        (true, true) => {
            return Err(CascadeError::AmbiguousDropPolicy {
                id,
                dependents,
                both: true,
            });
        }
        (true, false) => DependentsPolicy::Drop,
        (false, true) => DependentsPolicy::Detach,
        (false, false) if dependents.is_empty() => DependentsPolicy::Leave,
        (false, false) => {
            return Err(CascadeError::AmbiguousDropPolicy {
                id,
                dependents,
                both: false,
            });
        }
    };

    let baseline = StateSnapshot::capture(project, ctx.now);
    let mut effects = Effects::default();

    if let Some(meta) = project.meta_mut(&id) {
        meta.mark_dropped(ctx.now, reason);
    }
    info!(item = %id, reason = reason.unwrap_or(""), "dropped");
    effects.dropped.push(id.clone());

    match policy {
        DependentsPolicy::Leave => {}
        DependentsPolicy::Drop => {
            for dependent in graph.transitive_blocking(&id) {
                let Some(meta) = project.meta_mut(&dependent) else {
                    continue;
                };
                if meta.status != Status::Open {
                    continue;
                }
                meta.mark_dropped(ctx.now, reason);
                debug!(item = %dependent, cause = %id, "dropped with blocker");
                effects.dropped.push(dependent);
            }
        }
        DependentsPolicy::Detach => {
            for dependent in graph.blocking(&id) {
                let Some(meta) = project.meta_mut(&dependent) else {
                    continue;
                };
                meta.blocked_by.retain(|b| *b != id);
                debug!(item = %dependent, blocker = %id, "detached from dropped blocker");
                effects.removed_edges.push(Edge::new(dependent, id.clone()));
            }
        }
    }

    propagate(project, &baseline, ctx, &mut effects);
    Ok(effects)
}

// ---------------------------------------------------------------------------
// Reopen
// ---------------------------------------------------------------------------

/// Return a done or dropped item to open. Nothing else is touched.
///
/// # Errors
///
/// [`CascadeError::NotFound`], or [`CascadeError::InvalidTransition`] if the
/// item is already open.
pub fn reopen_item(
    project: &mut Project,
    raw_id: &str,
    ctx: &OpContext,
) -> Result<Effects, CascadeError> {
    let id = resolve(project, raw_id)?;
    check_transition(&id, current_status(project, &id)?, Status::Open)?;

    if let Some(meta) = project.meta_mut(&id) {
        meta.clear_resolution();
    }
    if let Some(wait) = project.wait_mut(&id) {
        wait.resolution = None;
    }

    info!(item = %id, at = %ctx.now, "reopened");
    Ok(Effects {
        reopened: vec![id],
        ..Effects::default()
    })
}

// ---------------------------------------------------------------------------
// Blockers
// ---------------------------------------------------------------------------

/// Record that `raw_item` is blocked by `raw_blocker`.
///
/// Adding an edge that already exists is a no-op. See [`add_blockers`].
///
/// # Errors
///
/// As for [`add_blockers`].
pub fn add_blocker(
    project: &mut Project,
    raw_item: &str,
    raw_blocker: &str,
) -> Result<Effects, CascadeError> {
    add_blockers(project, raw_item, &[raw_blocker])
}

/// Record several blockers for one item, all or nothing.
///
/// Each candidate edge is tried on a scratch graph that already holds the
/// earlier candidates, so two edges that only loop together are caught.
/// No propagation runs: a new blocker can only make items less ready.
///
/// # Errors
///
/// - [`CascadeError::NotFound`] if the item or a same-project blocker is
///   missing.
/// - [`CascadeError::CrossProject`] if a blocker ID carries another prefix.
/// - [`CascadeError::DependencyCycle`] with the loop path if any edge would
///   close a cycle.
pub fn add_blockers<S: AsRef<str>>(
    project: &mut Project,
    raw_item: &str,
    raw_blockers: &[S],
) -> Result<Effects, CascadeError> {
    let item = resolve(project, raw_item)?;

    let mut blockers: Vec<String> = Vec::with_capacity(raw_blockers.len());
    for raw in raw_blockers {
        let raw = raw.as_ref();
        let foreign = raw.parse::<ItemId>().is_ok() && !project.owns_prefix(raw);
        if foreign {
            return Err(CascadeError::CrossProject {
                item,
                blocker: raw.to_string(),
            });
        }
        let blocker = resolve(project, raw)?;
        if !blockers.contains(&blocker) {
            blockers.push(blocker);
        }
    }

    let existing: Vec<String> = project
        .meta(&item)
        .map(|m| m.blocked_by.clone())
        .unwrap_or_default();
    blockers.retain(|b| !existing.contains(b));

    let mut graph = DependencyGraph::from_project(project);
    let mut trial: Vec<EdgeReversal> = Vec::with_capacity(blockers.len());
    for blocker in &blockers {
        if let Some(cycle) = check_cycle(&graph, &item, blocker) {
            for mut token in trial.into_iter().rev() {
                token.revert(&mut graph);
            }
            return Err(CascadeError::DependencyCycle {
                item,
                blocker: blocker.clone(),
                path: cycle.path,
            });
        }
        trial.push(graph.add_edge(&item, blocker));
    }

    let mut effects = Effects::default();
    if let Some(meta) = project.meta_mut(&item) {
        for blocker in blockers {
            info!(item = %item, blocker = %blocker, "blocker added");
            meta.blocked_by.push(blocker.clone());
            effects.added_edges.push(Edge::new(item.clone(), blocker));
        }
    }
    Ok(effects)
}

/// Remove `raw_blocker` from the item's `blocked_by` and cascade.
///
/// The blocker need not exist, so orphan references can be cleaned up.
/// Removing an edge that is not there is a no-op.
///
/// # Errors
///
/// [`CascadeError::NotFound`] if the item is missing.
pub fn remove_blocker(
    project: &mut Project,
    raw_item: &str,
    raw_blocker: &str,
    ctx: &OpContext,
) -> Result<Effects, CascadeError> {
    let item = resolve(project, raw_item)?;
    let wanted = raw_blocker.parse::<ItemId>().ok();
    let matches = |stored: &str| {
        stored == raw_blocker
            || wanted
                .as_ref()
                .is_some_and(|w| stored.parse::<ItemId>().is_ok_and(|s| s == *w))
    };

    let present: Vec<String> = project
        .meta(&item)
        .map(|m| m.blocked_by.iter().filter(|b| matches(b)).cloned().collect())
        .unwrap_or_default();
    if present.is_empty() {
        debug!(item = %item, blocker = raw_blocker, "no such blocker edge");
        return Ok(Effects::default());
    }

    let baseline = StateSnapshot::capture(project, ctx.now);
    let mut effects = Effects::default();
    if let Some(meta) = project.meta_mut(&item) {
        meta.blocked_by.retain(|b| !present.contains(b));
    }
    for blocker in present {
        info!(item = %item, blocker = %blocker, "blocker removed");
        effects.removed_edges.push(Edge::new(item.clone(), blocker));
    }

    propagate(project, &baseline, ctx, &mut effects);
    Ok(effects)
}
