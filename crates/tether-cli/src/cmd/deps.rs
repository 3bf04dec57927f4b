use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tether_core::{CascadeError, DependencyGraph};
use tether_core::model::Project;
use tether_core::state::BlockerIndex;

use super::{Session, item_state};
use crate::output::{pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Item to inspect.
    pub id: String,

    /// Follow edges all the way instead of one hop.
    #[arg(short, long)]
    pub transitive: bool,
}

#[derive(Debug, Serialize)]
struct Neighbor {
    id: String,
    state: String,
}

#[derive(Debug, Serialize)]
struct DepsOutput {
    id: String,
    state: String,
    transitive: bool,
    blocked_by: Vec<Neighbor>,
    blocking: Vec<Neighbor>,
}

fn build(
    project: &Project,
    id: &str,
    transitive: bool,
    now: chrono::DateTime<chrono::Utc>,
) -> DepsOutput {
    let graph = DependencyGraph::from_project(project);
    let index = BlockerIndex::from_project(project);
    let (up, down) = if transitive {
        (graph.transitive_blocked_by(id), graph.transitive_blocking(id))
    } else {
        (graph.blocked_by(id), graph.blocking(id))
    };
    let with_state = |ids: Vec<String>| -> Vec<Neighbor> {
        ids.into_iter()
            .map(|id| Neighbor {
                state: item_state(project, &index, &id, now),
                id,
            })
            .collect()
    };
    DepsOutput {
        id: id.to_string(),
        state: item_state(project, &index, id, now),
        transitive,
        blocked_by: with_state(up),
        blocking: with_state(down),
    }
}

/// Execute `tt deps`: what blocks an item and what it blocks.
pub fn run_deps(args: &DepsArgs, session: &Session) -> Result<()> {
    let project = session.open_for_item(&args.id)?;
    let id = project.resolve_id(&args.id).ok_or_else(|| {
        session.cascade_failure(CascadeError::NotFound {
            id: args.id.clone(),
        })
    })?;
    let payload = build(&project, &id, args.transitive, session.op_context().now);

    render_mode(
        session.output,
        &payload,
        |p, w| {
            for n in &p.blocked_by {
                writeln!(w, "blocked_by\t{}\t{}", n.id, n.state)?;
            }
            for n in &p.blocking {
                writeln!(w, "blocking\t{}\t{}", n.id, n.state)?;
            }
            Ok(())
        },
        |p, w| {
            pretty_section(w, &format!("{} [{}]", p.id, p.state))?;
            for (label, list) in [("blocked by", &p.blocked_by), ("blocking", &p.blocking)] {
                writeln!(w, "{label}:")?;
                if list.is_empty() {
                    writeln!(w, "  (none)")?;
                }
                for n in list {
                    writeln!(w, "  {:<10} {}", n.id, n.state)?;
                }
            }
            Ok(())
        },
    )
}
