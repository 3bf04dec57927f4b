//! `tt block` / `tt unblock`: edit blocking edges.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tether_core::{Effects, add_blockers, remove_blocker};

use super::Session;
use crate::output::{render, write_effects};

#[derive(Args, Debug)]
pub struct BlockArgs {
    /// Item that gains blockers.
    pub id: String,

    /// Blocking item (repeatable). All are added or none are.
    #[arg(short, long = "by", required = true, value_name = "ID")]
    pub by: Vec<String>,
}

#[derive(Args, Debug)]
pub struct UnblockArgs {
    /// Item that loses blockers.
    pub id: String,

    /// Blocker to remove (repeatable). Unknown IDs are allowed, so stale
    /// references can be cleaned up.
    #[arg(short, long = "by", required = true, value_name = "ID")]
    pub by: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EdgeOutput {
    id: String,
    effects: Effects,
}

fn report(session: &Session, id: &str, effects: Effects, verb: &str) -> Result<()> {
    let payload = EdgeOutput {
        id: id.to_string(),
        effects,
    };
    render(session.output, &payload, |p, w| {
        if p.effects.is_empty() {
            writeln!(w, "· {}: nothing {verb}", p.id)
        } else {
            writeln!(w, "✓ {}", p.id)?;
            write_effects(w, &p.effects)
        }
    })
}

/// Execute `tt block`.
pub fn run_block(args: &BlockArgs, session: &Session) -> Result<()> {
    let mut project = session.open_for_item(&args.id)?;
    let effects =
        add_blockers(&mut project, &args.id, &args.by).map_err(|e| session.cascade_failure(e))?;
    if !effects.is_empty() {
        session.save(&project)?;
    }
    report(session, &args.id, effects, "added")
}

/// Execute `tt unblock`. Each removal cascades on its own.
pub fn run_unblock(args: &UnblockArgs, session: &Session) -> Result<()> {
    let mut project = session.open_for_item(&args.id)?;
    let ctx = session.op_context();
    let mut effects = Effects::default();
    for blocker in &args.by {
        let step = remove_blocker(&mut project, &args.id, blocker, &ctx)
            .map_err(|e| session.cascade_failure(e))?;
        effects.merge(step);
    }
    if !effects.is_empty() {
        session.save(&project)?;
    }
    report(session, &args.id, effects, "removed")
}
