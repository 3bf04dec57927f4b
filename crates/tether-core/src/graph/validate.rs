//! Structural checks for a loaded project.
//!
//! The engine never produces these defects itself, but project files are
//! plain text and can be edited by hand. Validation reports problems instead
//! of failing: an orphan blocker is a data defect, not a crash.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::blocking::DependencyGraph;
use super::cycles::{Cycle, find_all_cycles};
use crate::model::{ItemId, Project};

/// One structural problem found in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Defect {
    /// `item` lists a blocker that does not exist in the project.
    OrphanBlocker { item: String, blocker: String },
    /// `item` lists a blocker from another project's namespace.
    CrossProject { item: String, blocker: String },
    /// Two items share one ID.
    DuplicateId { id: String },
    /// The blocking graph contains a loop.
    Cycle { path: Vec<String> },
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrphanBlocker { item, blocker } => {
                write!(f, "{item} is blocked by unknown item {blocker}")
            }
            Self::CrossProject { item, blocker } => {
                write!(f, "{item} is blocked by {blocker} from another project")
            }
            Self::DuplicateId { id } => write!(f, "duplicate item id {id}"),
            Self::Cycle { path } => write!(f, "dependency cycle: {}", path.join(" → ")),
        }
    }
}

impl From<Cycle> for Defect {
    fn from(cycle: Cycle) -> Self {
        Self::Cycle { path: cycle.path }
    }
}

/// Run every structural check; an empty result means the project is sound.
pub fn validate_project(project: &Project) -> Vec<Defect> {
    let mut defects = Vec::new();

    let mut seen = HashSet::new();
    for id in project.item_ids() {
        if !seen.insert(id) {
            defects.push(Defect::DuplicateId { id: id.to_string() });
        }
    }

    for meta in project.metas() {
        for blocker in &meta.blocked_by {
            let foreign = blocker
                .parse::<ItemId>()
                .is_ok_and(|id| id.prefix() != project.prefix);
            if foreign {
                defects.push(Defect::CrossProject {
                    item: meta.id.clone(),
                    blocker: blocker.clone(),
                });
            } else if !project.contains(blocker) {
                defects.push(Defect::OrphanBlocker {
                    item: meta.id.clone(),
                    blocker: blocker.clone(),
                });
            }
        }
    }

    let graph = DependencyGraph::from_project(project);
    defects.extend(find_all_cycles(&graph).into_iter().map(Defect::from));

    defects
}
