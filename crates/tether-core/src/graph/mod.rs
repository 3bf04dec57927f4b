//! Graph-level abstractions for item relationships.
//!
//! ## Submodules
//!
//! - [`blocking`]: Directed blocking graph with direct and transitive
//!   queries and provisional edges.
//! - [`cycles`]: Cycle checks for prospective edges and whole graphs.
//! - [`validate`]: Orphan, cross-project, and cycle defects in stored data.

pub mod blocking;
pub mod cycles;
pub mod validate;

pub use blocking::{DependencyGraph, EdgeReversal};
pub use cycles::{Cycle, check_cycle, would_create_cycle};
pub use validate::{Defect, validate_project};
