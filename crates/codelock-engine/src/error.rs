//! Error types for the lock engine.

use std::path::PathBuf;

/// Result type alias for lock engine operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// Errors raised by the lock engine and its storage.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Password storage cannot be read or checked at all.
    #[error("Password storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Access log CSV failure.
    #[error("Access log error: {0}")]
    Csv(#[from] csv::Error),

    /// Access log record that cannot be parsed back.
    #[error("Malformed access log record: {0}")]
    MalformedRecord(String),

    /// The access log was already closed.
    #[error("Access log is closed")]
    LogClosed,

    /// Failure from the shared lock types or timers.
    #[error(transparent)]
    Core(#[from] codelock_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LockError {
    pub fn storage_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageUnavailable {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_storage_unavailable_display() {
        let error = LockError::storage_unavailable(
            "/srv/lock/password.txt",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            error.to_string(),
            "Password storage unavailable at /srv/lock/password.txt: denied"
        );
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_core_error_is_transparent() {
        let error = LockError::from(codelock_core::Error::InvalidDigit('x'));
        assert_eq!(error.to_string(), codelock_core::Error::InvalidDigit('x').to_string());
    }
}
