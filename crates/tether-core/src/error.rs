use std::fmt;

use crate::model::Status;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ProjectNotFound,
    ConfigParseError,
    ProjectExists,
    ItemNotFound,
    InvalidStateTransition,
    CycleDetected,
    InvalidId,
    IncompleteBlockers,
    AmbiguousDropPolicy,
    CrossProject,
    MissingReason,
    BatchFailed,
    CorruptProject,
    ProjectWriteFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ProjectNotFound => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ProjectExists => "E1003",
            Self::ItemNotFound => "E2001",
            Self::InvalidStateTransition => "E2002",
            Self::CycleDetected => "E2003",
            Self::InvalidId => "E2004",
            Self::IncompleteBlockers => "E2005",
            Self::AmbiguousDropPolicy => "E2006",
            Self::CrossProject => "E2007",
            Self::MissingReason => "E2008",
            Self::BatchFailed => "E2009",
            Self::CorruptProject => "E3001",
            Self::ProjectWriteFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ProjectNotFound => "Project not found",
            Self::ConfigParseError => "Config file parse error",
            Self::ProjectExists => "Project already exists",
            Self::ItemNotFound => "Item not found",
            Self::InvalidStateTransition => "Invalid state transition",
            Self::CycleDetected => "Cycle would be created",
            Self::InvalidId => "Invalid item or project ID",
            Self::IncompleteBlockers => "Item has unresolved blockers",
            Self::AmbiguousDropPolicy => "Drop policy for dependents is ambiguous",
            Self::CrossProject => "Items belong to different projects",
            Self::MissingReason => "Drop reason required",
            Self::BatchFailed => "Every item in the batch failed",
            Self::CorruptProject => "Corrupt project file",
            Self::ProjectWriteFailed => "Project file write failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ProjectNotFound => Some("Run `tt init <PREFIX> <NAME>` to create the project."),
            Self::ConfigParseError => Some("Fix syntax in ~/.config/tether/config.toml and retry."),
            Self::ProjectExists => Some("Pick a different prefix."),
            Self::ItemNotFound => None,
            Self::InvalidStateTransition => {
                Some("Follow valid transitions: open -> done|dropped, done|dropped -> open.")
            }
            Self::CycleDetected => Some("Remove/adjust blockers to keep the graph acyclic."),
            Self::InvalidId => Some("Use PREFIX-NNN for tasks and PREFIX-NNNW for waits."),
            Self::IncompleteBlockers => Some("Resolve the blockers first, or pass --force."),
            Self::AmbiguousDropPolicy => Some("Pass exactly one of --drop-deps or --remove-deps."),
            Self::CrossProject => Some("Blockers must live in the same project."),
            Self::MissingReason => Some("Pass --reason, or disable cascade.require_drop_reason."),
            Self::BatchFailed => None,
            Self::CorruptProject => Some("Fix the YAML by hand, then run `tt validate`."),
            Self::ProjectWriteFailed => Some("Check disk space and write permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures from cascade engine operations.
///
/// Every variant is a deterministic function of the project state; none is
/// worth retrying. An operation that returns an error has not mutated the
/// project.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    #[error("item '{id}' not found")]
    NotFound { id: String },

    #[error("'{blocker}' belongs to another project than '{item}'")]
    CrossProject { item: String, blocker: String },

    #[error("'{item}' blocked by '{blocker}' would create a cycle: {}", .path.join(" → "))]
    DependencyCycle {
        item: String,
        blocker: String,
        /// Starts and ends at `blocker`.
        path: Vec<String>,
    },

    #[error("cannot complete '{id}': unresolved blockers {}", .blockers.join(", "))]
    IncompleteBlockers { id: String, blockers: Vec<String> },

    #[error("'{id}' has dependents ({}); {}", .dependents.join(", "), drop_policy_hint(.both))]
    AmbiguousDropPolicy {
        id: String,
        dependents: Vec<String>,
        both: bool,
    },

    #[error("cannot move '{id}' from {from} to {to}")]
    InvalidTransition { id: String, from: Status, to: Status },

    #[error("dropping '{id}' requires a reason")]
    MissingReason { id: String },

    #[error("all {} item(s) failed", .0.len())]
    BatchFailed(Vec<(String, CascadeError)>),
}

fn drop_policy_hint(both: &bool) -> &'static str {
    if *both {
        "choose only one of drop-deps or remove-deps"
    } else {
        "choose drop-deps or remove-deps"
    }
}

impl CascadeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::ItemNotFound,
            Self::CrossProject { .. } => ErrorCode::CrossProject,
            Self::DependencyCycle { .. } => ErrorCode::CycleDetected,
            Self::IncompleteBlockers { .. } => ErrorCode::IncompleteBlockers,
            Self::AmbiguousDropPolicy { .. } => ErrorCode::AmbiguousDropPolicy,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::MissingReason { .. } => ErrorCode::MissingReason,
            Self::BatchFailed(_) => ErrorCode::BatchFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ProjectNotFound,
            ErrorCode::ConfigParseError,
            ErrorCode::ProjectExists,
            ErrorCode::ItemNotFound,
            ErrorCode::InvalidStateTransition,
            ErrorCode::CycleDetected,
            ErrorCode::InvalidId,
            ErrorCode::IncompleteBlockers,
            ErrorCode::AmbiguousDropPolicy,
            ErrorCode::CrossProject,
            ErrorCode::MissingReason,
            ErrorCode::BatchFailed,
            ErrorCode::CorruptProject,
            ErrorCode::ProjectWriteFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::CycleDetected.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn cycle_error_message_carries_path() {
        let err = CascadeError::DependencyCycle {
            item: "T1".into(),
            blocker: "T3".into(),
            path: vec!["T3".into(), "T2".into(), "T1".into(), "T3".into()],
        };
        assert_eq!(
            err.to_string(),
            "'T1' blocked by 'T3' would create a cycle: T3 → T2 → T1 → T3"
        );
        assert_eq!(err.code(), ErrorCode::CycleDetected);
    }

    #[test]
    fn ambiguous_drop_message_depends_on_cause() {
        let neither = CascadeError::AmbiguousDropPolicy {
            id: "AB-001".into(),
            dependents: vec!["AB-002".into()],
            both: false,
        };
        assert!(neither.to_string().ends_with("choose drop-deps or remove-deps"));

        let both = CascadeError::AmbiguousDropPolicy {
            id: "AB-001".into(),
            dependents: vec![],
            both: true,
        };
        assert!(both.to_string().contains("only one"));
    }
}
