use thiserror::Error;

/// Boxed failure returned by an event handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    // Keypad errors
    #[error("Invalid keypad character: {0:?}")]
    InvalidDigit(char),

    #[error("Invalid password: {reason}")]
    InvalidPassword { reason: String },

    // Multiplexing errors
    #[error("Invalid logical address: {0} (expected 0-7)")]
    InvalidAddress(u8),

    #[error("Invalid keypad position: row {row}, column {column}")]
    InvalidKeyPosition { row: usize, column: usize },

    // Event dispatch errors
    #[error("{} event handler(s) failed: {}", .0.len(), join_failures(.0))]
    HandlerFailures(Vec<HandlerError>),

    // Runtime errors
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

fn join_failures(failures: &[HandlerError]) -> String {
    failures
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
