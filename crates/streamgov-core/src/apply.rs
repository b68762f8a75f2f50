use serde::{Deserialize, Serialize};

/// Classification of a mutation result, computed by comparing a proposed
/// resource against the currently declared one. Drives persistence
/// decisions, dry-run simulation and the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyOutcome {
    Created,
    Changed,
    Unchanged,
    Deleted,
}

impl ApplyOutcome {
    /// Outcome of proposing a resource: `existing` is the declared spec (if
    /// any), `unchanged` whether the proposal equals it.
    pub fn of_apply(exists: bool, unchanged: bool) -> Self {
        match (exists, unchanged) {
            (false, _) => Self::Created,
            (true, true) => Self::Unchanged,
            (true, false) => Self::Changed,
        }
    }

    /// Whether the declared-state store needs a write for this outcome.
    pub fn requires_persistence(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl std::fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Changed => write!(f, "changed"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}
