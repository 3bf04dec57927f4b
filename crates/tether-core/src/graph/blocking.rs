//! Blocking dependency graph built from a project's items.
//!
//! # Overview
//!
//! Every task and wait becomes a node. Every entry in an item's `blocked_by`
//! list becomes a directed edge from the *blocked* item to its *blocker*.
//! Both directions are kept as explicit adjacency maps so dependent lookups
//! don't need a scan.
//!
//! # Ownership
//!
//! Query methods hand out owned `Vec<String>` copies, never slices into the
//! adjacency maps. Callers are free to mutate the graph (see
//! [`DependencyGraph::add_edge`]) while holding earlier query results.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tether_core::graph::blocking::DependencyGraph;
//!
//! let graph = DependencyGraph::from_project(&project);
//! for blocker in graph.blocked_by("OPS-004") {
//!     println!("OPS-004 waits on {blocker}");
//! }
//! ```

#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
)]

use std::collections::{BTreeMap, BTreeSet};

use crate::model::Project;

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// Directed blocking graph over one project's items.
///
/// Built fresh for each operation with [`DependencyGraph::from_project`] and
/// dropped afterwards. Blocker references that don't resolve to an item still
/// produce edges; the dangling end shows up in queries but not in
/// [`DependencyGraph::nodes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// item_id → blockers, in `blocked_by` order.
    blocked_by: BTreeMap<String, Vec<String>>,
    /// blocker_id → items it blocks, in insertion order.
    blocking: BTreeMap<String, Vec<String>>,
    /// Every item present in the source project.
    nodes: BTreeSet<String>,
}

impl DependencyGraph {
    /// Build the graph from a project's tasks and waits.
    ///
    /// # Complexity
    ///
    /// O(N * L) where N is the number of items and L is the average number
    /// of blockers per item.
    pub fn from_project(project: &Project) -> Self {
        let mut graph = Self::default();
        for meta in project.metas() {
            graph.nodes.insert(meta.id.clone());
            for blocker in &meta.blocked_by {
                graph.insert_edge(&meta.id, blocker);
            }
        }
        graph
    }

    /// Build from bare `(item, blockers)` pairs. Handy for tests and tools
    /// that don't carry a full project.
    pub fn from_edges<'a, I, B>(items: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, B)>,
        B: IntoIterator<Item = &'a str>,
    {
        let mut graph = Self::default();
        for (id, blockers) in items {
            graph.nodes.insert(id.to_string());
            for blocker in blockers {
                graph.insert_edge(id, blocker);
            }
        }
        graph
    }

    /// Returns `false` if the edge was already present.
    fn insert_edge(&mut self, from: &str, to: &str) -> bool {
        let blockers = self.blocked_by.entry(from.to_string()).or_default();
        if blockers.iter().any(|b| b == to) {
            return false;
        }
        blockers.push(to.to_string());
        self.blocking
            .entry(to.to_string())
            .or_default()
            .push(from.to_string());
        true
    }

    fn remove_edge(&mut self, from: &str, to: &str) {
        if let Some(blockers) = self.blocked_by.get_mut(from) {
            blockers.retain(|b| b != to);
            if blockers.is_empty() {
                self.blocked_by.remove(from);
            }
        }
        if let Some(dependents) = self.blocking.get_mut(to) {
            dependents.retain(|d| d != from);
            if dependents.is_empty() {
                self.blocking.remove(to);
            }
        }
    }

    /// Direct blockers of `id`, in `blocked_by` order. Empty for unknown IDs.
    pub fn blocked_by(&self, id: &str) -> Vec<String> {
        self.blocked_by.get(id).cloned().unwrap_or_default()
    }

    /// Items that list `id` as a direct blocker. Empty for unknown IDs.
    pub fn blocking(&self, id: &str) -> Vec<String> {
        self.blocking.get(id).cloned().unwrap_or_default()
    }

    /// Every item reachable by following blocked-by edges from `id`, sorted.
    pub fn transitive_blocked_by(&self, id: &str) -> Vec<String> {
        reachable(&self.blocked_by, id)
    }

    /// Every item that transitively depends on `id`, sorted.
    pub fn transitive_blocking(&self, id: &str) -> Vec<String> {
        reachable(&self.blocking, id)
    }

    /// Borrowing neighbor iterator for internal traversals.
    pub(crate) fn blockers_iter(&self, id: &str) -> impl Iterator<Item = &str> {
        self.blocked_by
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Return `true` if `id` has at least one blocker edge.
    pub fn has_blockers(&self, id: &str) -> bool {
        self.blocked_by.contains_key(id)
    }

    /// Return `true` if anything lists `id` as a blocker.
    pub fn has_dependents(&self, id: &str) -> bool {
        self.blocking.contains_key(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    /// Every item in the source project, sorted.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Every `(blocked, blocker)` edge, sorted by blocked item.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.blocked_by
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from.as_str(), to.as_str())))
    }

    pub fn edge_count(&self) -> usize {
        self.blocked_by.values().map(Vec::len).sum()
    }

    /// Return the total number of items in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` if the graph has no items.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Provisionally add "`from` is blocked by `to`".
    ///
    /// Returns a token that undoes exactly this insertion. Used to try out a
    /// compound edit before it is written back to the project. If the edge
    /// already existed the token reverts nothing.
    pub fn add_edge(&mut self, from: &str, to: &str) -> EdgeReversal {
        let inserted = self.insert_edge(from, to);
        EdgeReversal {
            from: from.to_string(),
            to: to.to_string(),
            pending: inserted,
        }
    }
}

/// Undo token returned by [`DependencyGraph::add_edge`].
///
/// [`EdgeReversal::revert`] is idempotent: the second and later calls do
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "dropping the token makes the provisional edge permanent"]
pub struct EdgeReversal {
    from: String,
    to: String,
    pending: bool,
}

impl EdgeReversal {
    pub fn revert(&mut self, graph: &mut DependencyGraph) {
        if std::mem::take(&mut self.pending) {
            graph.remove_edge(&self.from, &self.to);
        }
    }

    /// Whether reverting would still change the graph.
    pub const fn is_pending(&self) -> bool {
        self.pending
    }
}

/// Iterative DFS collecting everything reachable from `start` (exclusive).
fn reachable(adjacency: &BTreeMap<String, Vec<String>>, start: &str) -> Vec<String> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut stack: Vec<&str> = vec![start];

    while let Some(current) = stack.pop() {
        for next in adjacency.get(current).into_iter().flatten() {
            if next != start && seen.insert(next.as_str()) {
                stack.push(next.as_str());
            }
        }
    }

    seen.into_iter().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
