use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::Session;
use crate::output::render;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project prefix, 2-3 letters (used in every item ID).
    pub prefix: String,

    /// Human-readable project name.
    pub name: String,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    prefix: String,
    name: String,
    path: String,
}

/// Execute `tt init`: create `<data_dir>/<PREFIX>.yaml`.
///
/// # Errors
///
/// Returns an error if the prefix is invalid, a project with that prefix
/// already exists, or the file cannot be written.
pub fn run_init(args: &InitArgs, session: &Session) -> Result<()> {
    let project = session
        .store
        .create(&args.prefix, &args.name)
        .map_err(|e| session.store_failure(e))?;
    let path = session
        .store
        .path_for(&project.prefix)
        .map_err(|e| session.store_failure(e))?;

    let payload = InitOutput {
        prefix: project.prefix,
        name: project.name,
        path: path.display().to_string(),
    };
    render(session.output, &payload, |p, w| {
        writeln!(w, "✓ created project {} ({})", p.prefix, p.name)?;
        writeln!(w, "  file: {}", p.path)
    })
}
