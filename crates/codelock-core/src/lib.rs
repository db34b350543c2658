//! Shared building blocks of the keypad code lock: keypad and address
//! types, configuration values, the synchronous event bus and the
//! cancellable timer.

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod timeout;
pub mod types;

pub use config::{AccessWindow, LockConfig, ScannerConfig};
pub use error::{Error, HandlerError, Result};
pub use event::EventBus;
pub use timeout::{Elapsed, TimerStatus, Timeout};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
