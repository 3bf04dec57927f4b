//! `tt done`: complete one or more items.
//!
//! IDs are grouped by project prefix; each group is one batch call against
//! its project. Failures are reported per ID. The command exits non-zero
//! only when every ID failed.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tether_core::model::ItemId;
use tether_core::{CascadeError, CompleteRequest, Effects, ErrorCode, complete_items};

use super::Session;
use crate::output::{render, write_effects};

#[derive(Args, Debug)]
pub struct DoneArgs {
    /// Item IDs to complete.
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,

    /// Complete even with unresolved blockers (their edges are removed).
    #[arg(long)]
    pub force: bool,

    /// Resolution text recorded on waits.
    #[arg(long)]
    pub resolution: Option<String>,
}

#[derive(Debug, Serialize)]
struct DoneResult {
    id: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<&'static str>,
}

impl DoneResult {
    fn ok(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ok: true,
            error: None,
            error_code: None,
        }
    }

    fn failed(id: &str, message: String, code: ErrorCode) -> Self {
        Self {
            id: id.to_string(),
            ok: false,
            error: Some(message),
            error_code: Some(code.code()),
        }
    }
}

#[derive(Debug, Serialize)]
struct DoneOutput {
    results: Vec<DoneResult>,
    effects: Effects,
}

/// Group IDs by prefix, keeping first-seen order. Unparseable IDs are
/// returned separately.
fn group_by_prefix(ids: &[String]) -> (Vec<(String, Vec<String>)>, Vec<String>) {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut invalid = Vec::new();
    for raw in ids {
        let Ok(id) = raw.parse::<ItemId>() else {
            invalid.push(raw.clone());
            continue;
        };
        match groups.iter_mut().find(|(prefix, _)| prefix == id.prefix()) {
            Some((_, members)) => members.push(raw.clone()),
            None => groups.push((id.prefix().to_string(), vec![raw.clone()])),
        }
    }
    (groups, invalid)
}

pub fn run_done(args: &DoneArgs, session: &Session) -> Result<()> {
    let request = CompleteRequest {
        force: args.force,
        resolution: args.resolution.clone(),
    };
    let (groups, invalid) = group_by_prefix(&args.ids);

    let mut results: Vec<DoneResult> = invalid
        .iter()
        .map(|raw| {
            DoneResult::failed(raw, format!("invalid item id '{raw}'"), ErrorCode::InvalidId)
        })
        .collect();
    let mut effects = Effects::default();

    for (prefix, members) in groups {
        let mut project = match session.load_swept(&prefix) {
            Ok((project, swept)) => {
                effects.merge(swept);
                project
            }
            Err(err) => {
                let code = err.code();
                results.extend(
                    members
                        .iter()
                        .map(|raw| DoneResult::failed(raw, err.to_string(), code)),
                );
                continue;
            }
        };

        match complete_items(&mut project, &members, &request, &session.op_context()) {
            Ok(outcome) => {
                for entry in &outcome.entries {
                    results.push(match &entry.result {
                        Ok(_) => DoneResult::ok(&entry.id),
                        Err(e) => DoneResult::failed(&entry.id, e.to_string(), e.code()),
                    });
                }
                effects.merge(outcome.effects());
                session.save(&project)?;
            }
            Err(CascadeError::BatchFailed(failures)) => {
                results.extend(
                    failures
                        .iter()
                        .map(|(id, e)| DoneResult::failed(id, e.to_string(), e.code())),
                );
            }
            Err(other) => return Err(session.cascade_failure(other)),
        }
    }

    // Report in the order the IDs were given.
    results.sort_by_key(|r| args.ids.iter().position(|raw| *raw == r.id));
    let failed = results.iter().filter(|r| !r.ok).count();
    let total = results.len();

    let payload = DoneOutput { results, effects };
    render(session.output, &payload, |p, w| {
        for result in &p.results {
            if result.ok {
                writeln!(w, "✓ {} → done", result.id)?;
            } else {
                writeln!(
                    w,
                    "✗ {}: {}",
                    result.id,
                    result.error.as_deref().unwrap_or("unknown error")
                )?;
            }
        }
        write_effects(w, &p.effects)
    })?;

    if failed == total {
        anyhow::bail!("all {total} item(s) failed");
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
        args: DoneArgs,
    }

    #[test]
    fn done_args_parse_batch() {
        let w = Wrapper::parse_from(["test", "AB-001", "ab-2", "--force"]);
        assert_eq!(w.args.ids, vec!["AB-001", "ab-2"]);
        assert!(w.args.force);
        assert!(w.args.resolution.is_none());
    }

    #[test]
    fn done_args_require_an_id() {
        assert!(Wrapper::try_parse_from(["test"]).is_err());
    }

    #[test]
    fn grouping_keeps_first_seen_prefix_order() {
        let ids: Vec<String> = ["cd-1", "AB-001", "bogus", "cd-2w"]
            .into_iter()
            .map(String::from)
            .collect();
        let (groups, invalid) = group_by_prefix(&ids);
        assert_eq!(
            groups,
            vec![
                ("CD".to_string(), vec!["cd-1".to_string(), "cd-2w".to_string()]),
                ("AB".to_string(), vec!["AB-001".to_string()]),
            ]
        );
        assert_eq!(invalid, vec!["bogus"]);
    }
}
