//! Item identifiers: `PREFIX-NNN` for tasks, `PREFIX-NNNW` for waits.
//!
//! The canonical form has an upper-case prefix, a sequence number
//! zero-padded to three digits, and an upper-case `W` suffix for waits.
//! Parsing is case-insensitive and ignores extra leading zeros, so
//! `ab-7`, `AB-007` and `Ab-0007` all name the same task.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum and maximum project prefix length.
pub const PREFIX_LEN: std::ops::RangeInclusive<usize> = 2..=3;

/// Whether an identifier names a task or a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Wait,
}

impl ItemKind {
    /// Kind implied by an ID string's suffix, without full validation.
    ///
    /// Used for blocker references that may not resolve to a real item.
    pub fn guess(raw: &str) -> Self {
        if raw.trim().to_ascii_uppercase().ends_with('W') {
            Self::Wait
        } else {
            Self::Task
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Wait => "wait",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    prefix: String,
    seq: u32,
    kind: ItemKind,
}

/// Errors produced when parsing identifiers or prefixes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("invalid project prefix '{0}': expected 2-3 ASCII letters")]
    BadPrefix(String),

    #[error("invalid item id '{0}': expected PREFIX-NNN or PREFIX-NNNW")]
    BadFormat(String),
}

impl ItemId {
    pub fn new(prefix: &str, seq: u32, kind: ItemKind) -> Result<Self, IdError> {
        Ok(Self {
            prefix: normalize_prefix(prefix)?,
            seq,
            kind,
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub const fn seq(&self) -> u32 {
        self.seq
    }

    pub const fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Canonicalize a raw ID string, e.g. `ab-7w` → `AB-007W`.
    pub fn canonicalize(raw: &str) -> Result<String, IdError> {
        raw.parse::<Self>().map(|id| id.to_string())
    }
}

impl FromStr for ItemId {
    type Err = IdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let bad = || IdError::BadFormat(raw.to_string());
        let trimmed = raw.trim();
        let (prefix, rest) = trimmed.split_once('-').ok_or_else(bad)?;
        let prefix = normalize_prefix(prefix).map_err(|_| bad())?;

        let (digits, kind) = match rest.strip_suffix(['w', 'W']) {
            Some(digits) => (digits, ItemKind::Wait),
            None => (rest, ItemKind::Task),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }
        let seq = digits.parse::<u32>().map_err(|_| bad())?;

        Ok(Self { prefix, seq, kind })
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:03}", self.prefix, self.seq)?;
        if self.kind == ItemKind::Wait {
            f.write_str("W")?;
        }
        Ok(())
    }
}

/// Validate a project prefix and return its upper-case form.
pub fn normalize_prefix(raw: &str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    if !PREFIX_LEN.contains(&trimmed.len()) || !trimmed.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(IdError::BadPrefix(raw.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_task_and_wait_forms() {
        let task = ItemId::new("ab", 7, ItemKind::Task).unwrap();
        assert_eq!(task.to_string(), "AB-007");

        let wait = ItemId::new("xyz", 12, ItemKind::Wait).unwrap();
        assert_eq!(wait.to_string(), "XYZ-012W");

        let long = ItemId::new("AB", 1234, ItemKind::Task).unwrap();
        assert_eq!(long.to_string(), "AB-1234");
    }

    #[test]
    fn parsing_is_case_insensitive_with_optional_zeros() {
        for raw in ["ab-7", "AB-007", "Ab-0007", " ab-07 "] {
            assert_eq!(ItemId::canonicalize(raw).unwrap(), "AB-007", "{raw}");
        }
        assert_eq!(ItemId::canonicalize("ab-3w").unwrap(), "AB-003W");
        assert_eq!(ItemId::canonicalize("AB-003W").unwrap(), "AB-003W");
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["", "AB", "AB-", "AB-W", "A-001", "ABCD-001", "A1-001", "AB-1x", "AB-01WW"] {
            assert!(raw.parse::<ItemId>().is_err(), "{raw} should not parse");
        }
    }

    #[test]
    fn kind_guess_follows_suffix() {
        assert_eq!(ItemKind::guess("ab-1w"), ItemKind::Wait);
        assert_eq!(ItemKind::guess("AB-001"), ItemKind::Task);
    }

    #[test]
    fn prefix_validation() {
        assert_eq!(normalize_prefix("ops").unwrap(), "OPS");
        assert!(normalize_prefix("o").is_err());
        assert!(normalize_prefix("opsx").is_err());
        assert!(normalize_prefix("o2").is_err());
    }
}
