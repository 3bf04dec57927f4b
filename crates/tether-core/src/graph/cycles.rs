//! Cycle detection for the blocking dependency graph.
//!
//! # Overview
//!
//! Blocking dependencies form a directed graph. A cycle makes every item on
//! it permanently stuck, so the engine refuses any edge that would close one.
//! This module answers "would this edge close a loop?" and, when it would,
//! reports the loop verbatim.
//!
//! # Design
//!
//! - **DFS from the candidate blocker**: adding "`from` is blocked by `to`"
//!   closes a cycle exactly when `to` can already reach `from` by following
//!   blocked-by edges.
//! - **Explicit stack**: the search keeps its own frame stack instead of
//!   recursing, and that stack *is* the reported path.
//! - **Visited set**: guarantees termination even on a graph that is already
//!   (illegally) cyclic.
//! - **O(V+E)** per check.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tether_core::graph::cycles::check_cycle;
//!
//! if let Some(cycle) = check_cycle(&graph, "OPS-001", "OPS-003") {
//!     eprintln!("refusing edge: {cycle}");
//! }
//! ```

#![allow(
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::doc_markdown,
)]

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::blocking::DependencyGraph;

// ---------------------------------------------------------------------------
// Cycle
// ---------------------------------------------------------------------------

/// A loop that a prospective edge would close, or one already present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// Ordered item IDs forming the loop. Starts and ends with the same ID;
    /// each consecutive pair `(a, b)` means "a is blocked by b".
    ///
    /// For a prospective edge the path starts at the candidate blocker: with
    /// T3 ← T2 ← T1 already present, asking for "T1 blocked by T3" yields
    /// `[T3, T2, T1, T3]`.
    pub path: Vec<String>,
}

impl Cycle {
    /// Number of distinct items in the cycle.
    pub fn len(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this is a self-loop (item blocks itself).
    pub fn is_self_loop(&self) -> bool {
        self.len() == 1
    }

    /// Returns `true` if this is a mutual block (2-node cycle: A↔B).
    pub fn is_mutual_block(&self) -> bool {
        self.len() == 2
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_self_loop() {
            write!(f, "self-loop on '{}' (item blocks itself)", self.path[0])
        } else if self.is_mutual_block() {
            write!(
                f,
                "mutual block between '{}' and '{}'",
                self.path[0], self.path[1]
            )
        } else {
            write!(f, "{} items: {}", self.len(), self.path.join(" → "))
        }
    }
}

// ---------------------------------------------------------------------------
// Core detection
// ---------------------------------------------------------------------------

/// Return `true` if adding "`from` is blocked by `to`" would create a cycle.
///
/// A self-reference is always a cycle.
pub fn would_create_cycle(graph: &DependencyGraph, from: &str, to: &str) -> bool {
    from == to || find_path(graph, to, from).is_some()
}

/// Like [`would_create_cycle`], but returns the offending loop.
///
/// The path starts and ends at `to`. Every consecutive pair is an existing
/// edge except the last, which is the prospective `from → to` edge.
pub fn check_cycle(graph: &DependencyGraph, from: &str, to: &str) -> Option<Cycle> {
    if from == to {
        return Some(Cycle {
            path: vec![to.to_string(), to.to_string()],
        });
    }

    let mut path = find_path(graph, to, from)?;
    path.push(to.to_string());
    Some(Cycle { path })
}

/// Depth-first search for a blocked-by path `start → … → target`.
///
/// Returns the path including both ends, or `None`.
fn find_path(graph: &DependencyGraph, start: &str, target: &str) -> Option<Vec<String>> {
    // Each frame is a node on the current path plus its unexplored blockers.
    let mut stack: Vec<(&str, std::vec::IntoIter<&str>)> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();

    visited.insert(start);
    stack.push((start, neighbors(graph, start)));

    while let Some((node, next)) = stack.last_mut() {
        if *node == target {
            return Some(stack.iter().map(|(n, _)| (*n).to_string()).collect());
        }
        match next.next() {
            Some(neighbor) => {
                if visited.insert(neighbor) {
                    stack.push((neighbor, neighbors(graph, neighbor)));
                }
            }
            None => {
                stack.pop();
            }
        }
    }

    tracing::trace!(start, target, visited = visited.len(), "no blocking path");
    None
}

fn neighbors<'g>(graph: &'g DependencyGraph, id: &str) -> std::vec::IntoIter<&'g str> {
    graph.blockers_iter(id).collect::<Vec<_>>().into_iter()
}

/// Find every cycle already present in the graph.
///
/// Each back edge found by a colored DFS yields one [`Cycle`]. Used by
/// validation to report data that was corrupted outside the engine.
///
/// # Complexity
///
/// O(V+E) DFS.
pub fn find_all_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut cycles = Vec::new();
    let mut color: BTreeMap<&str, Color> = BTreeMap::new();

    let roots: Vec<&str> = graph
        .nodes()
        .chain(graph.edges().map(|(from, _)| from))
        .collect();

    for root in roots {
        if color.get(root).copied().unwrap_or(Color::White) != Color::White {
            continue;
        }

        let mut stack: Vec<(&str, std::vec::IntoIter<&str>)> = vec![(root, neighbors(graph, root))];
        color.insert(root, Color::Gray);

        while let Some((node, next)) = stack.last_mut() {
            let node = *node;
            let Some(neighbor) = next.next() else {
                color.insert(node, Color::Black);
                stack.pop();
                continue;
            };

            match color.get(neighbor).copied().unwrap_or(Color::White) {
                Color::White => {
                    color.insert(neighbor, Color::Gray);
                    stack.push((neighbor, neighbors(graph, neighbor)));
                }
                Color::Gray => {
                    // Back edge: neighbor is on the stack, so the loop is the
                    // stack segment from neighbor to node, closed by neighbor.
                    let start = stack
                        .iter()
                        .position(|(n, _)| *n == neighbor)
                        .unwrap_or(0);
                    let mut path: Vec<String> =
                        stack[start..].iter().map(|(n, _)| (*n).to_string()).collect();
                    path.push(neighbor.to_string());
                    cycles.push(Cycle { path });
                }
                Color::Black => {}
            }
        }
    }

    cycles
}

/// Check whether the blocking graph has any cycles at all.
pub fn has_cycles(graph: &DependencyGraph) -> bool {
    !find_all_cycles(graph).is_empty()
}

/// DFS colors for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not yet visited.
    White,
    /// Currently on the DFS stack (in progress).
    Gray,
    /// Fully processed (all descendants visited).
    Black,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a blocking graph from a list of (item_id, blocked_by_ids) pairs.
    fn build_graph(edges: &[(&'static str, &[&'static str])]) -> DependencyGraph {
        DependencyGraph::from_edges(edges.iter().map(|(id, bs)| (*id, bs.iter().copied())))
    }

    fn assert_real_cycle(graph: &DependencyGraph, cycle: &Cycle, from: &str, to: &str) {
        assert_eq!(cycle.path.first(), cycle.path.last());
        for pair in cycle.path.windows(2) {
            let is_edge = graph.blocked_by(&pair[0]).contains(&pair[1]);
            let is_new = pair[0] == from && pair[1] == to;
            assert!(is_edge || is_new, "{} -> {} is not an edge", pair[0], pair[1]);
        }
    }

    #[test]
    fn self_loop_is_always_a_cycle() {
        let graph = build_graph(&[("A", &[])]);
        assert!(would_create_cycle(&graph, "A", "A"));

        let cycle = check_cycle(&graph, "A", "A").unwrap();
        assert_eq!(cycle.path, vec!["A", "A"]);
        assert!(cycle.is_self_loop());
        assert!(cycle.to_string().contains("self-loop"));
    }

    #[test]
    fn unrelated_edge_is_safe() {
        let graph = build_graph(&[("A", &["B"]), ("B", &[]), ("C", &[])]);
        assert!(!would_create_cycle(&graph, "C", "A"));
        assert!(check_cycle(&graph, "C", "A").is_none());
    }

    #[test]
    fn redundant_forward_edge_is_safe() {
        // A ← B ← C; "C blocked by A" only adds a shortcut.
        let graph = build_graph(&[("C", &["B"]), ("B", &["A"]), ("A", &[])]);
        assert!(!would_create_cycle(&graph, "C", "A"));
    }

    #[test]
    fn mutual_block() {
        let graph = build_graph(&[("A", &["B"]), ("B", &[])]);
        let cycle = check_cycle(&graph, "B", "A").unwrap();
        assert_eq!(cycle.path, vec!["A", "B", "A"]);
        assert!(cycle.is_mutual_block());
        assert_real_cycle(&graph, &cycle, "B", "A");
    }

    #[test]
    fn three_node_chain_reports_path_from_blocker() {
        // T3 blocked by T2, T2 blocked by T1. Asking for "T1 blocked by T3".
        let graph = build_graph(&[("T3", &["T2"]), ("T2", &["T1"]), ("T1", &[])]);
        assert!(would_create_cycle(&graph, "T1", "T3"));

        let cycle = check_cycle(&graph, "T1", "T3").unwrap();
        assert_eq!(cycle.path, vec!["T3", "T2", "T1", "T3"]);
        assert_eq!(cycle.len(), 3);
        assert_real_cycle(&graph, &cycle, "T1", "T3");
        assert_eq!(cycle.to_string(), "3 items: T3 → T2 → T1 → T3");
    }

    #[test]
    fn finds_path_through_branches() {
        // A blocked by B and C; C blocked by D; D blocked by E.
        let graph = build_graph(&[
            ("A", &["B", "C"]),
            ("B", &[]),
            ("C", &["D"]),
            ("D", &["E"]),
            ("E", &[]),
        ]);
        let cycle = check_cycle(&graph, "E", "A").unwrap();
        assert_eq!(cycle.path, vec!["A", "C", "D", "E", "A"]);
        assert_real_cycle(&graph, &cycle, "E", "A");
    }

    #[test]
    fn search_terminates_on_existing_cycle() {
        let graph = build_graph(&[("A", &["B"]), ("B", &["A"]), ("C", &[])]);
        assert!(!would_create_cycle(&graph, "C", "A"));
    }

    #[test]
    fn find_all_cycles_on_acyclic_graph() {
        let graph = build_graph(&[("A", &["B"]), ("B", &["C"]), ("C", &[])]);
        assert!(find_all_cycles(&graph).is_empty());
        assert!(!has_cycles(&graph));
    }

    #[test]
    fn find_all_cycles_reports_existing_loop() {
        let graph = build_graph(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        let cycles = find_all_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.path.first(), cycle.path.last());
        assert!(has_cycles(&graph));
    }

    #[test]
    fn find_all_cycles_reports_stored_self_loop() {
        let graph = build_graph(&[("A", &["A"])]);
        let cycles = find_all_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].path, vec!["A", "A"]);
    }
}
