use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::item_id::ItemKind;

/// The three stored lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Open,
    Done,
    Dropped,
}

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Done => "done",
            Self::Dropped => "dropped",
        }
    }

    /// Done and dropped both count as resolved for blocking purposes.
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Done | Self::Dropped)
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// Valid transitions:
    /// - `open -> done`
    /// - `open -> dropped`
    /// - `done -> open` (reopen)
    /// - `dropped -> open` (reopen)
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        let allowed = matches!(
            (self, target),
            (Self::Open, Self::Done | Self::Dropped) | (Self::Done | Self::Dropped, Self::Open)
        );

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
                reason: "resolved items must be reopened first",
            })
        }
    }
}

/// Task priority, 1 (highest) through 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const HIGHEST: Self = Self(1);
    pub const LOWEST: Self = Self(4);

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(2)
    }
}

impl TryFrom<u8> for Priority {
    type Error = ParseEnumError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::HIGHEST.0..=Self::LOWEST.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ParseEnumError {
                expected: "priority (1-4)",
                got: value.to_string(),
            })
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

impl FromStr for Priority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseEnumError {
            expected: "priority (1-4)",
            got: s.to_string(),
        };
        let raw = s.trim().trim_start_matches(['p', 'P']);
        raw.parse::<u8>().map_err(|_| bad())?.try_into().map_err(|_| bad())
    }
}

/// Fields every item carries regardless of kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMeta {
    pub id: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl ItemMeta {
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: Status::Open,
            blocked_by: Vec::new(),
            created_at,
            completed_at: None,
            dropped_at: None,
            drop_reason: None,
            notes: String::new(),
        }
    }

    pub(crate) fn mark_done(&mut self, at: DateTime<Utc>) {
        self.status = Status::Done;
        self.completed_at = Some(at);
    }

    pub(crate) fn mark_dropped(&mut self, at: DateTime<Utc>, reason: Option<&str>) {
        self.status = Status::Dropped;
        self.dropped_at = Some(at);
        self.drop_reason = reason.map(str::to_string);
    }

    pub(crate) fn clear_resolution(&mut self) {
        self.status = Status::Open;
        self.completed_at = None;
        self.dropped_at = None;
        self.drop_reason = None;
    }
}

/// Capability shared by tasks and waits.
pub trait Item {
    fn meta(&self) -> &ItemMeta;
    fn meta_mut(&mut self) -> &mut ItemMeta;
    fn kind(&self) -> ItemKind;

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn status(&self) -> Status {
        self.meta().status
    }

    fn blocked_by(&self) -> &[String] {
        &self.meta().blocked_by
    }

    fn is_open(&self) -> bool {
        self.status() == Status::Open
    }
}

/// A unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub meta: ItemMeta,
    pub title: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_complete: bool,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            meta: ItemMeta::new(id, created_at),
            title: title.into(),
            priority: Priority::default(),
            tags: Vec::new(),
            assignee: None,
            due: None,
            auto_complete: false,
        }
    }

    /// Add a tag, keeping the set ordered by insertion and free of duplicates.
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim();
        if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

impl Item for Task {
    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Task
    }
}

/// How a wait gets resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Criteria {
    /// Someone has to answer a question. Not actionable before `check_after`.
    Manual {
        question: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        check_after: Option<DateTime<Utc>>,
    },
    /// Resolves on its own once `after` has passed.
    Time { after: DateTime<Utc> },
}

impl Criteria {
    pub const fn is_time(&self) -> bool {
        matches!(self, Self::Time { .. })
    }
}

/// An external condition that items can wait on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wait {
    #[serde(flatten)]
    pub meta: ItemMeta,
    pub criteria: Criteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

impl Wait {
    pub fn new(id: impl Into<String>, criteria: Criteria, created_at: DateTime<Utc>) -> Self {
        Self {
            meta: ItemMeta::new(id, created_at),
            criteria,
            resolution: None,
        }
    }

    /// The instant a time-based wait becomes due, if it is one.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        match self.criteria {
            Criteria::Time { after } => Some(after),
            Criteria::Manual { .. } => None,
        }
    }
}

impl Item for Wait {
    fn meta(&self) -> &ItemMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ItemMeta {
        &mut self.meta
    }

    fn kind(&self) -> ItemKind {
        ItemKind::Wait
    }
}

/// Error returned when a state transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot move {} -> {}: {}", self.from, self.to, self.reason)
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "done" => Ok(Self::Done),
            "dropped" => Ok(Self::Dropped),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}
