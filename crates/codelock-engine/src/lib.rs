//! Access policy of the keypad code lock.
//!
//! This crate holds the [`CodeLock`] state machine and the collaborators it
//! reports to: the access log, the status display and the wall clock. It is
//! independent of how digits are obtained; [`LockService::attach`] connects
//! it to any digit [`EventBus`](codelock_core::EventBus), normally the one
//! published by the hardware scanner.

pub mod access_log;
pub mod clock;
pub mod display;
pub mod error;
pub mod password;
pub mod service;
pub mod state_machine;

pub use access_log::{AccessEvent, AccessLogSink, AccessRecord, CsvAccessLog, MemoryAccessLog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use display::{RecordingDisplay, StatusDisplay};
pub use error::{LockError, Result};
pub use password::PasswordStore;
pub use service::{LockSender, LockService};
pub use state_machine::{
    CodeLock, CodeLockBuilder, DigitOutcome, LockCommand, LockState, LockTimer, LockTransition,
};
