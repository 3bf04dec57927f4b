//! `tt add task` and `tt add wait`: create items, optionally with blockers.
//!
//! Blockers are validated with the new item already in place, so a failing
//! `--blocked-by` (unknown ID, other project, cycle) leaves nothing on disk.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use tether_core::model::{Criteria, Priority, Project};
use tether_core::state::BlockerIndex;
use tether_core::add_blockers;

use super::{Session, item_state};
use crate::output::render;

#[derive(Args, Debug)]
pub struct AddArgs {
    #[command(subcommand)]
    pub kind: AddKind,
}

#[derive(Subcommand, Debug)]
pub enum AddKind {
    /// Add a task.
    Task(AddTaskArgs),
    /// Add a wait on an external condition.
    Wait(AddWaitArgs),
}

#[derive(Args, Debug)]
pub struct AddTaskArgs {
    /// Project prefix.
    pub prefix: String,

    /// Task title.
    pub title: String,

    /// Priority 1 (highest) to 4; `p1`..`p4` also accepted.
    #[arg(short, long, default_value = "2")]
    pub priority: Priority,

    /// Tag to attach (repeatable).
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Item that blocks this one (repeatable).
    #[arg(short, long = "blocked-by", value_name = "ID")]
    pub blocked_by: Vec<String>,

    /// Complete automatically once every blocker resolves.
    #[arg(long)]
    pub auto_complete: bool,

    #[arg(long)]
    pub assignee: Option<String>,

    /// Due date, `YYYY-MM-DD`.
    #[arg(long)]
    pub due: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct AddWaitArgs {
    /// Project prefix.
    pub prefix: String,

    /// Question to answer before the wait resolves (manual waits).
    #[arg(required_unless_present = "after", conflicts_with = "after")]
    pub question: Option<String>,

    /// Manual wait is not actionable before this instant (RFC 3339).
    #[arg(long, conflicts_with = "after")]
    pub check_after: Option<DateTime<Utc>>,

    /// Time-based wait: resolves once this instant passes (RFC 3339).
    #[arg(long)]
    pub after: Option<DateTime<Utc>>,

    /// Item that blocks this one (repeatable).
    #[arg(short, long = "blocked-by", value_name = "ID")]
    pub blocked_by: Vec<String>,
}

#[derive(Debug, Serialize)]
struct AddOutput {
    id: String,
    kind: &'static str,
    state: String,
    blocked_by: Vec<String>,
}

pub fn run_add(args: &AddArgs, session: &Session) -> Result<()> {
    let now = session.op_context().now;
    match &args.kind {
        AddKind::Task(task) => {
            let mut project = session.open(&task.prefix)?;
            let id = project
                .add_task(&task.title, now)
                .map_err(|e| session.store_failure(e.into()))?;
            if let Some(created) = project.task_mut(&id) {
                created.priority = task.priority;
                for tag in &task.tags {
                    created.add_tag(tag);
                }
                created.assignee.clone_from(&task.assignee);
                created.due = task.due;
                created.auto_complete = task.auto_complete;
            }
            finish(session, project, id, "task", &task.blocked_by)
        }
        AddKind::Wait(wait) => {
            let criteria = match (wait.after, &wait.question) {
                (Some(after), _) => Criteria::Time { after },
                (None, question) => Criteria::Manual {
                    question: question.clone().unwrap_or_default(),
                    check_after: wait.check_after,
                },
            };
            let mut project = session.open(&wait.prefix)?;
            let id = project
                .add_wait(criteria, now)
                .map_err(|e| session.store_failure(e.into()))?;
            finish(session, project, id, "wait", &wait.blocked_by)
        }
    }
}

fn finish(
    session: &Session,
    mut project: Project,
    id: String,
    kind: &'static str,
    blocked_by: &[String],
) -> Result<()> {
    if !blocked_by.is_empty() {
        add_blockers(&mut project, &id, blocked_by).map_err(|e| session.cascade_failure(e))?;
    }
    session.save(&project)?;

    let index = BlockerIndex::from_project(&project);
    let now = session.op_context().now;
    let state = item_state(&project, &index, &id, now);
    let blocked_by = project
        .meta(&id)
        .map(|m| m.blocked_by.clone())
        .unwrap_or_default();

    let payload = AddOutput {
        id,
        kind,
        state,
        blocked_by,
    };
    render(session.output, &payload, |p, w| {
        writeln!(w, "✓ added {} {} [{}]", p.kind, p.id, p.state)?;
        if !p.blocked_by.is_empty() {
            writeln!(w, "  blocked by: {}", p.blocked_by.join(", "))?;
        }
        Ok(())
    })
}
