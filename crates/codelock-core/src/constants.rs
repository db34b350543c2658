//! Core constants for the keypad code lock.
//!
//! This module collects the fixed values shared by the multiplexer and the
//! lock state machine: the physical bus layout, keypad geometry, indicator
//! pulse lengths and the defaults used when no configuration is supplied.
//!
//! # Bus Layout
//!
//! Five physical lines drive eight logical lines:
//!
//! | Line | Direction | Purpose |
//! |------|-----------|---------|
//! | `D0`..`D2` | output / input | 3-bit address during write, column sense during read |
//! | `STROBE` | output | latches the address on its falling edge |
//! | `SENSE` | output | routes the keypad columns onto `D0`..`D2` |
//!
//! # Usage
//!
//! ```
//! use codelock_core::constants::*;
//!
//! assert_eq!(DATA_LINE_COUNT, 3);
//! assert_eq!(KEYPAD_ROWS * KEYPAD_COLUMNS, 12);
//! assert_eq!(DEFAULT_PASSWORD, "1234");
//! ```

// ============================================================================
// Bus Layout
// ============================================================================

/// Number of bidirectional data lines carrying the logical address.
pub const DATA_LINE_COUNT: usize = 3;

/// Number of logical lines addressable through the data lines (2^3).
pub const LOGICAL_LINE_COUNT: usize = 8;

// ============================================================================
// Keypad Geometry
// ============================================================================

/// Number of keypad rows, each occupying one logical address (0-3).
pub const KEYPAD_ROWS: usize = 4;

/// Number of keypad columns, sensed on the data lines during a read phase.
pub const KEYPAD_COLUMNS: usize = 3;

/// Fixed row/column-to-character table of the 4x3 keypad.
///
/// # Examples
///
/// ```
/// use codelock_core::constants::KEYPAD_LAYOUT;
///
/// assert_eq!(KEYPAD_LAYOUT[0][0], '1');
/// assert_eq!(KEYPAD_LAYOUT[3][1], '0');
/// assert_eq!(KEYPAD_LAYOUT[3][2], '#');
/// ```
pub const KEYPAD_LAYOUT: [[char; KEYPAD_COLUMNS]; KEYPAD_ROWS] = [
    ['1', '2', '3'],
    ['4', '5', '6'],
    ['7', '8', '9'],
    ['*', '0', '#'],
];

/// Every character the keypad can produce.
pub const KEYPAD_ALPHABET: &str = "0123456789*#";

// ============================================================================
// Indicator Pulses
// ============================================================================

/// Write cycles spent per indicator flash: one assert, one release.
pub const PULSE_CYCLES: u8 = 2;

// ============================================================================
// Scanner Defaults
// ============================================================================

/// Settle delay after each strobe edge, in milliseconds.
pub const DEFAULT_SETTLE_MS: u64 = 10;

/// Consecutive idle reads required before a held key counts as released.
pub const DEFAULT_RELEASE_SAMPLES: u8 = 2;

// ============================================================================
// Lock Defaults
// ============================================================================

/// Password file read at startup.
pub const DEFAULT_PASSWORD_FILE: &str = "password.txt";

/// Access log file appended to while running.
pub const DEFAULT_ACCESS_LOG_FILE: &str = "access_log.csv";

/// Password written when no password file exists.
pub const DEFAULT_PASSWORD: &str = "1234";

/// Inactivity window before a partial entry is discarded (milliseconds).
pub const DEFAULT_DIGIT_TIMEOUT_MS: u64 = 3000;

/// Number of progress checks per inactivity window.
///
/// Matches the eight LEDs of the progress bar so each tick lights one more.
pub const DEFAULT_DIGIT_TIMEOUT_TICKS: u32 = 8;

/// Lockout duration after too many incorrect attempts (seconds).
pub const DEFAULT_LOCKOUT_SECS: u32 = 60;

/// Incorrect attempts allowed before lockout.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Grace window after an outcome during which digits are ignored (milliseconds).
pub const DEFAULT_CLEAR_TIMEOUT_MS: u64 = 1000;

/// Time the last typed digit stays visible before being masked (milliseconds).
pub const DEFAULT_COVER_TIMEOUT_MS: u64 = 1000;

/// Interval of the lockout countdown tick (milliseconds).
pub const LOCKED_TICK_MS: u64 = 1000;

/// Character used to mask typed digits on the status line.
pub const MASK_CHAR: char = '*';

// ============================================================================
// Access Log Events
// ============================================================================

/// Access log event written when the lock starts.
pub const EVENT_STARTUP: &str = "startup";

/// Access log event written for every accepted or rejected code.
pub const EVENT_CODE: &str = "code";

/// Access log event written when the lock shuts down.
pub const EVENT_SHUTDOWN: &str = "shutdown";

/// Timestamp format of access log records.
pub const ACCESS_LOG_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
