//! Scanner task management.
//!
//! [`ScannerHandle`] spawns the scan loop of an [`IoMultiplexer`] on the
//! runtime and owns its cancellation token, so callers can stop it and learn
//! how it ended.
//!
//! ```text
//! ┌───────────────┐  cancel  ┌────────────────────┐
//! │ ScannerHandle │─────────►│ IoMultiplexer::run │
//! │               │◄─────────│ (spawned task)     │
//! └───────────────┘  result  └────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use codelock_core::ScannerConfig;
//! use codelock_hardware::{IoMultiplexer, ScannerHandle, mock::MockBoard};
//!
//! #[tokio::main]
//! async fn main() -> codelock_hardware::Result<()> {
//!     let (bus, _board) = MockBoard::new(false);
//!     let scanner = IoMultiplexer::new(bus, ScannerConfig::default())?;
//!
//!     let handle = ScannerHandle::start(scanner);
//!     // ... run the lock ...
//!     let termination = handle.shutdown().await;
//!     println!("Scanner ended: {termination}");
//!     Ok(())
//! }
//! ```

use crate::{HardwareError, IoMultiplexer, Result, traits::GpioLine};
use std::fmt;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How the scan loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTermination {
    /// Stopped through cancellation.
    Stopped,
    /// Returned a hardware error.
    Faulted(String),
    /// Task aborted before it could finish.
    Cancelled,
    /// Task panicked.
    Panicked,
}

impl ScanTermination {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Stopped | Self::Cancelled)
    }

    fn classify(result: std::result::Result<Result<()>, JoinError>) -> Self {
        match result {
            Ok(Ok(())) => Self::Stopped,
            Ok(Err(e)) => Self::Faulted(e.to_string()),
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(_) => Self::Panicked,
        }
    }
}

impl fmt::Display for ScanTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Faulted(message) => write!(f, "faulted: {message}"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Panicked => write!(f, "panicked"),
        }
    }
}

/// Running scan loop.
#[derive(Debug)]
pub struct ScannerHandle {
    cancel: CancellationToken,
    done: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl ScannerHandle {
    /// Spawn the scan loop of `scanner` on the current runtime.
    pub fn start<L>(scanner: IoMultiplexer<L>) -> Self
    where
        L: GpioLine + 'static,
    {
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        let guard = done.clone().drop_guard();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            scanner.run(token).await
        });
        Self { cancel, done, task }
    }

    /// Token that stops the loop when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Resolve once the loop has ended, for any reason, without consuming
    /// the handle. Use in `select!` next to other shutdown triggers.
    pub async fn finished(&self) {
        self.done.cancelled().await;
    }

    /// Wait for the loop to end on its own (fault or external cancellation).
    pub async fn wait(self) -> ScanTermination {
        ScanTermination::classify(self.task.await)
    }

    /// Cancel the loop and wait for it to park the lines.
    pub async fn shutdown(self) -> ScanTermination {
        self.cancel.cancel();
        let termination = self.wait().await;
        if termination.is_clean() {
            info!(%termination, "Scanner shut down");
        } else {
            warn!(%termination, "Scanner ended abnormally");
        }
        termination
    }

    /// Like [`shutdown`](Self::shutdown), converting an abnormal end into an error.
    pub async fn shutdown_checked(self) -> Result<()> {
        match self.shutdown().await {
            ScanTermination::Stopped | ScanTermination::Cancelled => Ok(()),
            ScanTermination::Faulted(message) => Err(HardwareError::scan_fault(message)),
            ScanTermination::Panicked => Err(HardwareError::scan_fault("scanner task panicked")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBoard;
    use codelock_core::ScannerConfig;

    fn fast_config() -> ScannerConfig {
        ScannerConfig {
            settle_ms: 1,
            ..ScannerConfig::default()
        }
    }

    #[tokio::test]
    async fn test_shutdown_is_clean() {
        let (bus, _board) = MockBoard::new(false);
        let handle = ScannerHandle::start(IoMultiplexer::new(bus, fast_config()).unwrap());

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(!handle.is_finished());
        assert_eq!(handle.shutdown().await, ScanTermination::Stopped);
    }

    #[tokio::test]
    async fn test_fault_is_reported() {
        let (bus, board) = MockBoard::new(false);
        let scanner = IoMultiplexer::new(bus, fast_config()).unwrap();
        board.inject_fault("wire cut");

        let handle = ScannerHandle::start(scanner);
        let termination = handle.wait().await;
        assert!(matches!(termination, ScanTermination::Faulted(ref m) if m.contains("wire cut")));
        assert!(!termination.is_clean());
    }

    #[tokio::test]
    async fn test_shutdown_checked_surfaces_fault() {
        let (bus, board) = MockBoard::new(false);
        let scanner = IoMultiplexer::new(bus, fast_config()).unwrap();
        board.inject_fault("wire cut");

        let handle = ScannerHandle::start(scanner);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(matches!(
            handle.shutdown_checked().await,
            Err(HardwareError::ScanFault { .. })
        ));
    }

    #[tokio::test]
    async fn test_finished_resolves_on_fault() {
        let (bus, board) = MockBoard::new(false);
        let scanner = IoMultiplexer::new(bus, fast_config()).unwrap();
        let handle = ScannerHandle::start(scanner);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(!handle.is_finished());
        board.inject_fault("wire cut");

        tokio::time::timeout(std::time::Duration::from_secs(1), handle.finished())
            .await
            .expect("scanner should end after a fault");
        assert!(matches!(
            handle.shutdown().await,
            ScanTermination::Faulted(ref m) if m.contains("wire cut")
        ));
    }

    #[tokio::test]
    async fn test_finished_pending_while_running() {
        let (bus, _board) = MockBoard::new(false);
        let handle = ScannerHandle::start(IoMultiplexer::new(bus, fast_config()).unwrap());

        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), handle.finished()).await;
        assert!(waited.is_err());
        assert_eq!(handle.shutdown().await, ScanTermination::Stopped);
    }

    #[tokio::test]
    async fn test_external_token_stops_loop() {
        let (bus, _board) = MockBoard::new(false);
        let handle = ScannerHandle::start(IoMultiplexer::new(bus, fast_config()).unwrap());

        handle.cancellation_token().cancel();
        assert_eq!(handle.wait().await, ScanTermination::Stopped);
    }

    #[test]
    fn test_termination_display() {
        assert_eq!(ScanTermination::Stopped.to_string(), "stopped");
        assert_eq!(
            ScanTermination::Faulted("x".into()).to_string(),
            "faulted: x"
        );
    }
}
