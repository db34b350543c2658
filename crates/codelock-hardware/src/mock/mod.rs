//! Simulated hardware for testing and development.
//!
//! This module provides a simulated keypad and indicator board and a
//! recording progress bar that can be controlled programmatically without
//! requiring physical hardware.

pub mod board;
pub mod progress;

pub use board::{MAX_LATCH_LOG, MockBoard, MockBoardHandle, MockLine, MockPin};
pub use progress::MockProgressBar;
