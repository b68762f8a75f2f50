use streamgov_core::GovernanceError;
use thiserror::Error;

/// Errors of the declared-state store. Absence is not an error: lookups
/// return `Option`, and `NotFound` is reserved for deletes of unknown
/// records.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

impl From<StorageError> for GovernanceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { kind, name } => GovernanceError::not_found(kind, name),
            StorageError::AlreadyExists { kind, name } => GovernanceError::validation(
                kind,
                name.clone(),
                vec![format!("Invalid value {name} for name: Resource already exists.")],
            ),
            StorageError::Backend(message) => GovernanceError::upstream(message),
        }
    }
}

/// Errors of the live-cluster clients (broker admin, Connect REST, schema
/// registry). Transient interruption while awaiting the remote system is
/// retryable; a definitive rejection is terminal.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Remote call timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("Remote call interrupted: {0}")]
    Interrupted(String),

    #[error("Remote system rejected the request: {0}")]
    Rejected(String),

    #[error("Remote system failure: {0}")]
    Remote(String),
}

impl ClientError {
    pub fn timeout(millis: u64) -> Self {
        Self::Timeout { millis }
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        Self::Interrupted(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Timeouts and interruptions may succeed on retry; rejections and
    /// definitive remote failures will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Interrupted(_))
    }
}

impl From<ClientError> for GovernanceError {
    fn from(err: ClientError) -> Self {
        let retryable = err.is_retryable();
        if retryable {
            GovernanceError::retryable_upstream(err.to_string())
        } else {
            GovernanceError::upstream(err.to_string())
        }
    }
}
