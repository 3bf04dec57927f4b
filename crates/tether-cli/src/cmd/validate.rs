use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tether_core::graph::{Defect, validate_project};

use super::Session;
use crate::output::render;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Project prefix; every project in the data directory when omitted.
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProjectReport {
    prefix: String,
    defects: Vec<Defect>,
}

#[derive(Debug, Serialize)]
struct ValidateOutput {
    ok: bool,
    projects: Vec<ProjectReport>,
}

/// Execute `tt validate`: structural checks on stored projects.
///
/// Reads projects as stored, without the load-time sweep, and exits
/// non-zero when any defect is found.
pub fn run_validate(args: &ValidateArgs, session: &Session) -> Result<()> {
    let prefixes = match &args.prefix {
        Some(prefix) => vec![prefix.clone()],
        None => session.store.list().map_err(|e| session.store_failure(e))?,
    };

    let mut projects = Vec::with_capacity(prefixes.len());
    for prefix in prefixes {
        let project = session.load_raw(&prefix)?;
        projects.push(ProjectReport {
            defects: validate_project(&project),
            prefix: project.prefix,
        });
    }
    let total: usize = projects.iter().map(|p| p.defects.len()).sum();

    let payload = ValidateOutput {
        ok: total == 0,
        projects,
    };
    render(session.output, &payload, |p, w| {
        for report in &p.projects {
            if report.defects.is_empty() {
                writeln!(w, "✓ {}", report.prefix)?;
                continue;
            }
            writeln!(w, "✗ {} ({} defect(s))", report.prefix, report.defects.len())?;
            for defect in &report.defects {
                writeln!(w, "  - {defect}")?;
            }
        }
        Ok(())
    })?;

    if total > 0 {
        anyhow::bail!("{total} defect(s) found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ValidateArgs,
    }

    #[test]
    fn validate_args_parse() {
        assert!(Wrapper::parse_from(["test"]).args.prefix.is_none());
        assert_eq!(
            Wrapper::parse_from(["test", "ops"]).args.prefix.as_deref(),
            Some("ops")
        );
    }
}
