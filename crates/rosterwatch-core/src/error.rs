//! Error taxonomy shared by every RosterWatch crate.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RosterWatchError>;

#[derive(Debug, Error)]
pub enum RosterWatchError {
    /// Manual trigger on an id the repository does not know.
    #[error("Player not found: {0}")]
    SubjectNotFound(String),

    /// The remote page or API could not be reached. Retried.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The remote answered but the payload could not be understood. Retried.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Retries exhausted; the task is dropped.
    #[error("Permanent failure for {task}: {reason}")]
    PermanentFailure { task: String, reason: String },

    /// Admin input the scheduler refuses to act on.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_not_found_message() {
        let err = RosterWatchError::SubjectNotFound("unknown".into());
        assert_eq!(err.to_string(), "Player not found: unknown");
    }
}
