//! Projects own their tasks and waits and hand out item IDs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::item::{Item, ItemMeta, Task, Wait};
use super::item_id::{IdError, ItemId, ItemKind, normalize_prefix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Archived,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        })
    }
}

/// A project and every item it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub prefix: String,
    pub name: String,
    #[serde(default)]
    pub status: ProjectStatus,
    /// Last sequence number handed out. Shared by tasks and waits.
    #[serde(default)]
    pub next_seq: u32,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub waits: Vec<Wait>,
}

/// Borrowed view of one item, whichever kind it is.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
    Task(&'a Task),
    Wait(&'a Wait),
}

impl<'a> ItemRef<'a> {
    pub fn meta(self) -> &'a ItemMeta {
        match self {
            Self::Task(task) => &task.meta,
            Self::Wait(wait) => &wait.meta,
        }
    }

    pub const fn kind(self) -> ItemKind {
        match self {
            Self::Task(_) => ItemKind::Task,
            Self::Wait(_) => ItemKind::Wait,
        }
    }
}

impl Project {
    pub fn new(prefix: &str, name: impl Into<String>) -> Result<Self, IdError> {
        Ok(Self {
            prefix: normalize_prefix(prefix)?,
            name: name.into(),
            status: ProjectStatus::Active,
            next_seq: 0,
            tasks: Vec::new(),
            waits: Vec::new(),
        })
    }

    /// Allocate the next task ID and advance the counter.
    pub fn next_task_id(&mut self) -> Result<String, IdError> {
        self.next_id(ItemKind::Task)
    }

    /// Allocate the next wait ID and advance the counter.
    pub fn next_wait_id(&mut self) -> Result<String, IdError> {
        self.next_id(ItemKind::Wait)
    }

    fn next_id(&mut self, kind: ItemKind) -> Result<String, IdError> {
        let seq = self.next_seq + 1;
        let id = ItemId::new(&self.prefix, seq, kind)?.to_string();
        self.next_seq = seq;
        Ok(id)
    }

    /// Create and insert a task; returns its ID.
    pub fn add_task(&mut self, title: &str, now: DateTime<Utc>) -> Result<String, IdError> {
        let id = self.next_task_id()?;
        self.tasks.push(Task::new(id.clone(), title, now));
        Ok(id)
    }

    /// Create and insert a wait; returns its ID.
    pub fn add_wait(
        &mut self,
        criteria: super::item::Criteria,
        now: DateTime<Utc>,
    ) -> Result<String, IdError> {
        let id = self.next_wait_id()?;
        self.waits.push(Wait::new(id.clone(), criteria, now));
        Ok(id)
    }

    /// Resolve user input (any case, optional zero padding) to a stored ID.
    ///
    /// Returns `None` when the input does not parse or names nothing here.
    pub fn resolve_id(&self, raw: &str) -> Option<String> {
        let wanted: ItemId = raw.parse().ok()?;
        self.item_ids()
            .find(|id| id.parse::<ItemId>().is_ok_and(|stored| stored == wanted))
            .map(str::to_string)
    }

    /// Whether an ID (raw or canonical) belongs to this project's namespace.
    pub fn owns_prefix(&self, raw: &str) -> bool {
        raw.parse::<ItemId>()
            .is_ok_and(|id| id.prefix() == self.prefix)
    }

    pub fn item(&self, id: &str) -> Option<ItemRef<'_>> {
        if let Some(task) = self.task(id) {
            return Some(ItemRef::Task(task));
        }
        self.wait(id).map(ItemRef::Wait)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.item(id).is_some()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }

    pub fn wait(&self, id: &str) -> Option<&Wait> {
        self.waits.iter().find(|w| w.id() == id)
    }

    pub fn wait_mut(&mut self, id: &str) -> Option<&mut Wait> {
        self.waits.iter_mut().find(|w| w.id() == id)
    }

    pub fn meta(&self, id: &str) -> Option<&ItemMeta> {
        self.item(id).map(ItemRef::meta)
    }

    pub fn meta_mut(&mut self, id: &str) -> Option<&mut ItemMeta> {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.meta.id == id) {
            return Some(&mut task.meta);
        }
        self.waits
            .iter_mut()
            .find(|w| w.meta.id == id)
            .map(|w| &mut w.meta)
    }

    /// Every item's shared fields, tasks first, in stored order.
    pub fn metas(&self) -> impl Iterator<Item = &ItemMeta> {
        self.tasks
            .iter()
            .map(|t| &t.meta)
            .chain(self.waits.iter().map(|w| &w.meta))
    }

    pub fn metas_mut(&mut self) -> impl Iterator<Item = &mut ItemMeta> {
        self.tasks
            .iter_mut()
            .map(|t| &mut t.meta)
            .chain(self.waits.iter_mut().map(|w| &mut w.meta))
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.metas().map(|m| m.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.tasks.len() + self.waits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.waits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::Criteria;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn ids_share_one_counter() {
        let mut project = Project::new("ops", "Operations").unwrap();
        let t1 = project.add_task("first", now()).unwrap();
        let w1 = project
            .add_wait(
                Criteria::Manual {
                    question: "vendor replied?".into(),
                    check_after: None,
                },
                now(),
            )
            .unwrap();
        let t2 = project.add_task("second", now()).unwrap();

        assert_eq!(t1, "OPS-001");
        assert_eq!(w1, "OPS-002W");
        assert_eq!(t2, "OPS-003");
        assert_eq!(project.next_seq, 3);
        assert_eq!(project.len(), 3);
    }

    #[test]
    fn resolve_id_accepts_loose_input() {
        let mut project = Project::new("ab", "Alpha").unwrap();
        let id = project.add_task("x", now()).unwrap();

        assert_eq!(project.resolve_id("ab-1").as_deref(), Some(id.as_str()));
        assert_eq!(project.resolve_id("AB-0001").as_deref(), Some(id.as_str()));
        assert!(project.resolve_id("ab-1w").is_none());
        assert!(project.resolve_id("cd-1").is_none());
        assert!(project.resolve_id("garbage").is_none());
    }

    #[test]
    fn prefix_ownership() {
        let project = Project::new("ab", "Alpha").unwrap();
        assert!(project.owns_prefix("ab-9"));
        assert!(!project.owns_prefix("CD-001"));
        assert!(!project.owns_prefix("nonsense"));
    }

    #[test]
    fn item_lookup_covers_both_kinds() {
        let mut project = Project::new("ab", "Alpha").unwrap();
        let t = project.add_task("x", now()).unwrap();
        let w = project
            .add_wait(Criteria::Time { after: now() }, now())
            .unwrap();

        assert_eq!(project.item(&t).map(ItemRef::kind), Some(ItemKind::Task));
        assert_eq!(project.item(&w).map(ItemRef::kind), Some(ItemKind::Wait));
        assert!(project.item("AB-999").is_none());
        assert!(project.meta_mut(&w).is_some());
    }
}
