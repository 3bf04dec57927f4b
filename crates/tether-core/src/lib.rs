//! tether-core library: dependency graph, state derivation, and cascades
//! for tasks and waits.
//!
//! # Conventions
//!
//! - **Errors**: engine operations return typed errors ([`error::CascadeError`],
//!   [`store::StoreError`]); configuration loading uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`). The
//!   library never installs a subscriber.
//! - **Time**: callers pass the clock in through [`cascade::OpContext`];
//!   nothing here reads the system time.

pub mod cascade;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod state;
pub mod store;
pub mod sweep;

pub use cascade::{
    BatchOutcome, CompleteRequest, DropRequest, Edge, Effects, OpContext, add_blocker,
    add_blockers, complete_item, complete_items, drop_item, reopen_item, remove_blocker,
};
pub use error::{CascadeError, ErrorCode};
pub use graph::{DependencyGraph, check_cycle, would_create_cycle};
pub use state::{StateSnapshot, TaskState, WaitState, compute_task_state, compute_wait_state};
pub use store::{ProjectStore, StoreError};
pub use sweep::run_time_check_sweep;
