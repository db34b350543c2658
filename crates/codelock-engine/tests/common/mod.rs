//! Shared rig for integration tests.
//!
//! Wires a simulated board through the keypad scanner into a lock service,
//! the same way the binary wires real lines.

#![allow(dead_code)]

use std::time::Duration;

use codelock_core::{Digit, LockConfig, Password, ScannerConfig, parse_digits};
use codelock_engine::{AccessLogSink, CodeLock, LockService, MemoryAccessLog};
use codelock_hardware::{
    IoMultiplexer, ScannerHandle,
    mock::{MockBoard, MockBoardHandle},
};

/// Password every rig is built with.
pub const PASSWORD: &str = "1234";

/// Time a key is held down, then left up, when typing.
pub const KEY_HOLD: Duration = Duration::from_millis(40);

/// Longer than the post-outcome grace window.
pub const PAST_GRACE: Duration = Duration::from_millis(1100);

pub fn scanner_config() -> ScannerConfig {
    ScannerConfig {
        settle_ms: 1,
        ..ScannerConfig::default()
    }
}

pub struct Rig {
    pub board: MockBoardHandle,
    pub scanner: Option<ScannerHandle>,
    pub service: LockService,
    pub log: MemoryAccessLog,
}

impl Rig {
    pub fn new(config: LockConfig) -> Self {
        let log = MemoryAccessLog::new();
        Self::with_log(config, log.clone(), log)
    }

    /// Build a rig logging to `sink`; `log` is kept for inspection.
    pub fn with_log(
        config: LockConfig,
        sink: impl AccessLogSink + 'static,
        log: MemoryAccessLog,
    ) -> Self {
        let (bus, board) = MockBoard::new(false);
        let scanner = IoMultiplexer::new(bus, scanner_config()).unwrap();

        let builder = CodeLock::builder(
            config,
            Password::new(PASSWORD).unwrap(),
            scanner.indicator_handle(),
        )
        .with_access_log(sink);
        let service = LockService::new(builder).unwrap();
        service.attach(&scanner.digits());

        Self {
            board,
            scanner: Some(ScannerHandle::start(scanner)),
            service,
            log,
        }
    }

    /// Press and release each key of `code`.
    pub async fn type_code(&mut self, code: &str) {
        for digit in parse_digits(code).unwrap() {
            self.type_digit(digit).await;
        }
    }

    pub async fn type_digit(&mut self, digit: Digit) {
        self.board.press_digit(digit);
        self.service.process_for(KEY_HOLD).await;
        self.board.release();
        self.service.process_for(KEY_HOLD).await;
    }

    pub async fn wait(&mut self, duration: Duration) {
        self.service.process_for(duration).await;
    }
}
