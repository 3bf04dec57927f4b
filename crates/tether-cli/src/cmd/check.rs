//! `tt check`: resolve time-based waits whose instant has passed.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tracing::info;

use tether_core::{Effects, run_time_check_sweep};

use super::Session;
use crate::output::{render, write_effects};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Project prefix; every project in the data directory when omitted.
    pub prefix: Option<String>,

    /// Resolution text recorded on each resolved wait.
    #[arg(long)]
    pub resolution: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProjectSweep {
    prefix: String,
    effects: Effects,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    projects: Vec<ProjectSweep>,
}

pub fn run_check(args: &CheckArgs, session: &Session) -> Result<()> {
    let prefixes = match &args.prefix {
        Some(prefix) => vec![prefix.clone()],
        None => session.store.list().map_err(|e| session.store_failure(e))?,
    };

    let ctx = session.op_context();
    let mut projects = Vec::with_capacity(prefixes.len());
    for prefix in prefixes {
        let mut project = session.load_raw(&prefix)?;
        let effects = run_time_check_sweep(&mut project, &ctx, args.resolution.as_deref());
        if !effects.is_empty() {
            session.save(&project)?;
            info!(prefix = %project.prefix, resolved = effects.resolved.len(), "sweep applied");
        }
        projects.push(ProjectSweep {
            prefix: project.prefix,
            effects,
        });
    }

    let payload = CheckOutput { projects };
    render(session.output, &payload, |p, w| {
        if p.projects.iter().all(|s| s.effects.is_empty()) {
            return writeln!(w, "· no time-based waits due");
        }
        for sweep in p.projects.iter().filter(|s| !s.effects.is_empty()) {
            writeln!(w, "✓ {}", sweep.prefix)?;
            write_effects(w, &sweep.effects)?;
        }
        Ok(())
    })
}
