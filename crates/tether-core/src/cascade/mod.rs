//! Cascade engine: status mutations and their knock-on effects.
//!
//! # Overview
//!
//! Every operation takes one project snapshot by `&mut`, validates first,
//! then mutates and runs [`propagate`](propagate::propagate) to discover
//! second-order effects:
//!
//! - **unblocked**: open tasks that became ready because of this call,
//! - **activated**: open waits that became actionable,
//! - **auto-completed**: open `auto_complete` tasks whose blockers all
//!   resolved, completed in turn until nothing else changes.
//!
//! Operations that fail return a [`CascadeError`] and leave the project
//! untouched. Loading and persisting the project is the caller's job.
//!
//! # Operations
//!
//! | Operation | Cascades |
//! |---|---|
//! | [`complete_item`] / [`complete_items`] | yes |
//! | [`drop_item`] | yes, plus the chosen dependents policy |
//! | [`reopen_item`] | no, reopening is local |
//! | [`add_blocker`] / [`add_blockers`] | no, adding an edge resolves nothing |
//! | [`remove_blocker`] | yes |
//!
//! [`CascadeError`]: crate::error::CascadeError

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineOptions;
use crate::error::CascadeError;

mod ops;
pub(crate) mod propagate;

pub use ops::{
    CompleteRequest, DropRequest, add_blocker, add_blockers, complete_item, complete_items,
    drop_item, reopen_item, remove_blocker,
};

/// Clock reading plus options for one engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpContext {
    pub now: DateTime<Utc>,
    pub options: EngineOptions,
}

impl OpContext {
    pub const fn new(now: DateTime<Utc>, options: EngineOptions) -> Self {
        Self { now, options }
    }

    /// Context with default options.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self::new(now, EngineOptions::default())
    }
}

/// A `blocked_by` edge: `item` is blocked by `blocker`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub item: String,
    pub blocker: String,
}

impl Edge {
    pub fn new(item: impl Into<String>, blocker: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            blocker: blocker.into(),
        }
    }
}

/// Everything an operation changed, for the caller to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Effects {
    /// Items completed directly by the request.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub completed: Vec<String>,
    /// Time-based waits resolved by the sweep.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resolved: Vec<String>,
    /// The dropped item first, then any dependents dropped with it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reopened: Vec<String>,
    /// Tasks completed by propagation, in completion order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub auto_completed: Vec<String>,
    /// Tasks that became ready, sorted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unblocked: Vec<String>,
    /// Waits that became actionable, sorted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activated: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub added_edges: Vec<Edge>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_edges: Vec<Edge>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Fold another call's effects into this one.
    pub fn merge(&mut self, other: Self) {
        self.completed.extend(other.completed);
        self.resolved.extend(other.resolved);
        self.dropped.extend(other.dropped);
        self.reopened.extend(other.reopened);
        self.auto_completed.extend(other.auto_completed);
        self.unblocked.extend(other.unblocked);
        self.activated.extend(other.activated);
        self.added_edges.extend(other.added_edges);
        self.removed_edges.extend(other.removed_edges);
    }

    /// Every item whose status became done during this call.
    pub fn newly_done(&self) -> impl Iterator<Item = &str> {
        self.completed
            .iter()
            .chain(&self.resolved)
            .chain(&self.auto_completed)
            .map(String::as_str)
    }
}

/// Per-ID outcome of a batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// The ID as the caller supplied it.
    pub id: String,
    pub result: Result<Effects, CascadeError>,
}

/// Results of a batch call, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub entries: Vec<BatchEntry>,
}

impl BatchOutcome {
    /// Combined effects of every successful entry.
    pub fn effects(&self) -> Effects {
        let mut all = Effects::default();
        for entry in &self.entries {
            if let Ok(effects) = &entry.result {
                all.merge(effects.clone());
            }
        }
        all
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &CascadeError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (e.id.as_str(), err)))
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.result.is_ok()).count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.entries.iter().all(|e| e.result.is_ok())
    }
}
