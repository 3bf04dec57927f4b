use anyhow::Result;
use clap::Args;
use serde::Serialize;

use tether_core::model::{Criteria, Item, Project};
use tether_core::state::BlockerIndex;
use tether_core::{compute_task_state, compute_wait_state};

use super::Session;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Project prefix.
    pub prefix: String,
}

#[derive(Debug, Serialize)]
struct ItemRow {
    id: String,
    kind: &'static str,
    state: String,
    summary: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    blocked_by: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatusOutput {
    prefix: String,
    name: String,
    status: String,
    items: Vec<ItemRow>,
}

fn build_rows(project: &Project, now: chrono::DateTime<chrono::Utc>) -> Vec<ItemRow> {
    let index = BlockerIndex::from_project(project);
    let tasks = project.tasks.iter().map(|task| ItemRow {
        id: task.id().to_string(),
        kind: "task",
        state: compute_task_state(task, &index).to_string(),
        summary: format!("{} {}", task.priority, task.title),
        blocked_by: task.blocked_by().to_vec(),
    });
    let waits = project.waits.iter().map(|wait| ItemRow {
        id: wait.id().to_string(),
        kind: "wait",
        state: compute_wait_state(wait, &index, now).to_string(),
        summary: match &wait.criteria {
            Criteria::Manual { question, .. } => question.clone(),
            Criteria::Time { after } => format!("after {}", after.to_rfc3339()),
        },
        blocked_by: wait.blocked_by().to_vec(),
    });
    let mut rows: Vec<ItemRow> = tasks.chain(waits).collect();
    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

/// Execute `tt status`: every item with its effective state.
pub fn run_status(args: &StatusArgs, session: &Session) -> Result<()> {
    let project = session.open(&args.prefix)?;
    let now = session.op_context().now;

    let payload = StatusOutput {
        items: build_rows(&project, now),
        prefix: project.prefix,
        name: project.name,
        status: project.status.to_string(),
    };

    render_mode(
        session.output,
        &payload,
        |p, w| {
            for row in &p.items {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}",
                    row.id,
                    row.kind,
                    row.state,
                    row.summary,
                    row.blocked_by.join(",")
                )?;
            }
            Ok(())
        },
        |p, w| {
            pretty_section(w, &format!("{} ({})", p.name, p.prefix))?;
            pretty_kv(w, "status", &p.status)?;
            pretty_kv(w, "items", p.items.len().to_string())?;
            writeln!(w)?;
            for row in &p.items {
                write!(w, "{:<10} {:<11} {}", row.id, row.state, row.summary)?;
                if row.blocked_by.is_empty() {
                    writeln!(w)?;
                } else {
                    writeln!(w, "  ⟵ {}", row.blocked_by.join(", "))?;
                }
            }
            Ok(())
        },
    )
}
