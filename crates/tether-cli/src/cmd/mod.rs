pub mod add;
pub mod block;
pub mod check;
pub mod deps;
pub mod done;
pub mod drop;
pub mod init;
pub mod reopen;
pub mod status;
pub mod validate;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use tether_core::config::EngineOptions;
use tether_core::model::{ItemId, Project};
use tether_core::state::BlockerIndex;
use tether_core::{
    CascadeError, Effects, OpContext, ProjectStore, StoreError, compute_task_state, compute_wait_state,
    run_time_check_sweep,
};

use crate::output::{CliError, OutputMode, render_error};

/// Everything a command handler needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Session {
    pub store: ProjectStore,
    pub engine: EngineOptions,
    pub sweep_on_load: bool,
    pub output: OutputMode,
}

impl Session {
    /// Engine context stamped with the current time.
    pub fn op_context(&self) -> OpContext {
        OpContext::new(Utc::now(), self.engine)
    }

    /// Load a project, running the time-check sweep first when enabled.
    ///
    /// Waits resolved by the sweep are persisted right away so the command
    /// that follows sees (and saves) a consistent project.
    pub fn open(&self, prefix: &str) -> anyhow::Result<Project> {
        self.load_swept(prefix)
            .map(|(project, _)| project)
            .map_err(|e| self.store_failure(e))
    }

    /// Like [`Session::open`], but also hands back what the sweep did and
    /// leaves error reporting to the caller.
    pub fn load_swept(&self, prefix: &str) -> Result<(Project, Effects), StoreError> {
        debug!(prefix, dir = %self.store.root().display(), "loading project");
        let mut project = self.store.load(prefix)?;
        if !self.sweep_on_load {
            return Ok((project, Effects::default()));
        }
        let effects = run_time_check_sweep(&mut project, &self.op_context(), None);
        if !effects.resolved.is_empty() {
            info!(
                prefix = %project.prefix,
                resolved = ?effects.resolved,
                auto_completed = ?effects.auto_completed,
                unblocked = ?effects.unblocked,
                activated = ?effects.activated,
                "time-based waits resolved on load"
            );
            self.store.save(&project)?;
        }
        Ok((project, effects))
    }

    /// Load the project that owns `raw_id`.
    pub fn open_for_item(&self, raw_id: &str) -> anyhow::Result<Project> {
        let id: ItemId = raw_id
            .parse()
            .map_err(|e| self.store_failure(StoreError::InvalidId(e)))?;
        self.open(id.prefix())
    }

    /// Load a project exactly as stored.
    pub fn load_raw(&self, prefix: &str) -> anyhow::Result<Project> {
        self.store.load(prefix).map_err(|e| self.store_failure(e))
    }

    pub fn save(&self, project: &Project) -> anyhow::Result<()> {
        self.store
            .save(project)
            .map_err(|e| self.store_failure(e))
            .with_context(|| format!("saving project {}", project.prefix))
    }

    /// Report a store failure on stderr and turn it into an `anyhow` error.
    pub fn store_failure(&self, err: StoreError) -> anyhow::Error {
        render_error(self.output, &CliError::from(&err)).ok();
        anyhow::Error::new(err)
    }

    /// Report an engine failure on stderr and turn it into an `anyhow` error.
    pub fn cascade_failure(&self, err: CascadeError) -> anyhow::Error {
        render_error(self.output, &CliError::from(&err)).ok();
        anyhow::Error::new(err)
    }
}

/// Effective state of any item, as the lowercase name shown to users.
///
/// Unknown IDs (orphan blockers) render as `missing`.
pub fn item_state(
    project: &Project,
    index: &BlockerIndex,
    id: &str,
    now: DateTime<Utc>,
) -> String {
    if let Some(task) = project.task(id) {
        return compute_task_state(task, index).to_string();
    }
    project.wait(id).map_or_else(
        || "missing".to_string(),
        |wait| compute_wait_state(wait, index, now).to_string(),
    )
}
