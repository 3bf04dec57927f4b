use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tether_core::reopen_item;
use tether_core::state::BlockerIndex;

use super::{Session, item_state};
use crate::output::render;

#[derive(Args, Debug)]
pub struct ReopenArgs {
    /// Done or dropped item to reopen.
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ReopenOutput {
    id: String,
    state: String,
}

/// Execute `tt reopen`. Dependents are not touched.
pub fn run_reopen(args: &ReopenArgs, session: &Session) -> Result<()> {
    let mut project = session.open_for_item(&args.id)?;
    let ctx = session.op_context();
    let effects =
        reopen_item(&mut project, &args.id, &ctx).map_err(|e| session.cascade_failure(e))?;
    session.save(&project)?;

    let id = effects
        .reopened
        .first()
        .cloned()
        .unwrap_or_else(|| args.id.clone());
    let index = BlockerIndex::from_project(&project);
    let payload = ReopenOutput {
        state: item_state(&project, &index, &id, ctx.now),
        id,
    };
    render(session.output, &payload, |p, w| {
        writeln!(w, "✓ {} reopened [{}]", p.id, p.state)
    })
}
