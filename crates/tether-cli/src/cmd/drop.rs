use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tether_core::{DropRequest, Effects, drop_item};

use super::Session;
use crate::output::{render, write_effects};

#[derive(Args, Debug)]
pub struct DropArgs {
    /// Item ID to drop.
    pub id: String,

    /// Why the item is being dropped.
    #[arg(short, long)]
    pub reason: Option<String>,

    /// Also drop every item that depends on this one.
    #[arg(long)]
    pub drop_deps: bool,

    /// Detach dependents instead: remove this item from their blockers.
    #[arg(long)]
    pub remove_deps: bool,
}

#[derive(Debug, Serialize)]
struct DropOutput {
    id: String,
    effects: Effects,
}

/// Execute `tt drop`.
///
/// An item with dependents needs exactly one of `--drop-deps` or
/// `--remove-deps`; the engine rejects both or neither.
pub fn run_drop(args: &DropArgs, session: &Session) -> Result<()> {
    let mut project = session.open_for_item(&args.id)?;
    let request = DropRequest {
        reason: args.reason.clone(),
        drop_deps: args.drop_deps,
        remove_deps: args.remove_deps,
    };
    let effects = drop_item(&mut project, &args.id, &request, &session.op_context())
        .map_err(|e| session.cascade_failure(e))?;
    session.save(&project)?;

    let id = effects
        .dropped
        .first()
        .cloned()
        .unwrap_or_else(|| args.id.clone());
    let payload = DropOutput { id, effects };
    render(session.output, &payload, |p, w| {
        writeln!(w, "✓ {} → dropped", p.id)?;
        write_effects(w, &p.effects)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: DropArgs,
    }

    #[test]
    fn drop_args_parse_reason_and_policy() {
        let w = Wrapper::parse_from(["test", "OPS-003", "-r", "superseded", "--drop-deps"]);
        assert_eq!(w.args.id, "OPS-003");
        assert_eq!(w.args.reason.as_deref(), Some("superseded"));
        assert!(w.args.drop_deps);
        assert!(!w.args.remove_deps);
    }

    #[test]
    fn both_policies_reach_the_engine() {
        // Rejected by drop_item, not by the parser, so the error carries a code.
        let w = Wrapper::parse_from(["test", "OPS-003", "--drop-deps", "--remove-deps"]);
        assert!(w.args.drop_deps && w.args.remove_deps);
    }
}
