use thiserror::Error;

/// Error taxonomy shared by every mutating and reconciling operation.
///
/// Validation failures are all-or-nothing: a rejected mutation carries the
/// complete set of violated rules, never just the first. Ownership failures
/// are folded into the validation list rather than surfaced as a distinct
/// status, so existence information never leaks asymmetrically.
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("Validation failed for {kind}/{name}: {}", errors.join("; "))]
    Validation {
        kind: &'static str,
        name: String,
        errors: Vec<String>,
    },

    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Upstream call failed: {message}")]
    Upstream { message: String, retryable: bool },
}

impl GovernanceError {
    pub fn validation(kind: &'static str, name: impl Into<String>, errors: Vec<String>) -> Self {
        Self::Validation {
            kind,
            name: name.into(),
            errors,
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// A definitive remote rejection. Retrying will not help.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable: false,
        }
    }

    /// A transient remote failure (timeout, interrupted wait). The caller
    /// owns the retry policy; the core never retries implicitly.
    pub fn retryable_upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { retryable: true, .. })
    }

    /// HTTP-equivalent 4xx classification.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    /// The violated rules of a rejected mutation, empty for other errors.
    pub fn validation_errors(&self) -> &[String] {
        match self {
            Self::Validation { errors, .. } => errors,
            _ => &[],
        }
    }
}

/// Convenience result type for control-plane operations.
pub type Result<T> = std::result::Result<T, GovernanceError>;
