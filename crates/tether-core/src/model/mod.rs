//! Items, identifiers, and the projects that own them.

pub mod item;
pub mod item_id;
pub mod project;

pub use item::{Criteria, Item, ItemMeta, Priority, Status, Task, Wait};
pub use item_id::{IdError, ItemId, ItemKind};
pub use project::{ItemRef, Project, ProjectStatus};
