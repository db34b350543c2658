//! Configuration values for the lock and the keypad scanner.
//!
//! Configuration is passed by value at construction; nothing in the
//! workspace reads process-wide settings. Every field has a default, so a
//! configuration file only needs to name the values it changes.
//!
//! # Examples
//!
//! ```
//! use codelock_core::config::LockConfig;
//!
//! let config = LockConfig {
//!     immediate_reject: true,
//!     max_attempts: 3,
//!     ..LockConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::{Error, Password, Result};

/// Daily time-of-day window during which digits are accepted.
///
/// A window whose `begin` equals its `end` places no restriction at all.
/// A window whose `begin` is after its `end` admits nothing.
///
/// Times are written as `"HH:MM:SS"` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessWindow {
    pub begin: NaiveTime,
    pub end: NaiveTime,
}

impl AccessWindow {
    pub fn new(begin: NaiveTime, end: NaiveTime) -> Self {
        Self { begin, end }
    }

    /// Whether this window admits every time of day.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.begin == self.end
    }

    /// Check whether `now` falls inside the window (bounds inclusive).
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveTime;
    /// use codelock_core::config::AccessWindow;
    ///
    /// let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
    ///
    /// let lunch = AccessWindow::new(t(13, 0), t(14, 0));
    /// assert!(lunch.admits(t(13, 30)));
    /// assert!(!lunch.admits(t(15, 0)));
    ///
    /// let always = AccessWindow::new(t(0, 0), t(0, 0));
    /// assert!(always.admits(t(15, 0)));
    /// ```
    #[must_use]
    pub fn admits(&self, now: NaiveTime) -> bool {
        self.is_unrestricted() || (self.begin <= now && now <= self.end)
    }
}

/// Policy and timing of the code lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// File holding the persisted password.
    pub password_file: PathBuf,

    /// File receiving access log records.
    pub access_log_file: PathBuf,

    /// Password used (and persisted) when the password file is missing.
    pub default_password: String,

    /// Inactivity window before a partial entry is discarded.
    pub digit_timeout_ms: u64,

    /// Progress checks per inactivity window.
    pub digit_timeout_ticks: u32,

    /// Lockout duration in seconds.
    pub lockout_secs: u32,

    /// Incorrect attempts allowed before lockout.
    pub max_attempts: u32,

    /// Whether incorrect attempts are counted toward a lockout.
    pub attempt_limiting: bool,

    /// Reject as soon as a typed digit differs from the password.
    pub immediate_reject: bool,

    /// Grace window after an outcome during which digits are ignored.
    pub clear_timeout_ms: u64,

    /// Time the last typed digit stays visible before being masked.
    pub cover_timeout_ms: u64,

    /// Optional daily access window.
    pub access_window: Option<AccessWindow>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            password_file: PathBuf::from(DEFAULT_PASSWORD_FILE),
            access_log_file: PathBuf::from(DEFAULT_ACCESS_LOG_FILE),
            default_password: DEFAULT_PASSWORD.to_string(),
            digit_timeout_ms: DEFAULT_DIGIT_TIMEOUT_MS,
            digit_timeout_ticks: DEFAULT_DIGIT_TIMEOUT_TICKS,
            lockout_secs: DEFAULT_LOCKOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_limiting: true,
            immediate_reject: false,
            clear_timeout_ms: DEFAULT_CLEAR_TIMEOUT_MS,
            cover_timeout_ms: DEFAULT_COVER_TIMEOUT_MS,
            access_window: None,
        }
    }
}

impl LockConfig {
    /// Check the configuration for values the lock cannot operate with.
    ///
    /// # Errors
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".into()));
        }
        if self.lockout_secs == 0 {
            return Err(Error::Config("lockout_secs must be at least 1".into()));
        }
        if self.digit_timeout_ms == 0 {
            return Err(Error::Config("digit_timeout_ms must be non-zero".into()));
        }
        if self.digit_timeout_ticks == 0 {
            return Err(Error::Config(
                "digit_timeout_ticks must be at least 1".into(),
            ));
        }
        if self.clear_timeout_ms == 0 || self.cover_timeout_ms == 0 {
            return Err(Error::Config(
                "clear_timeout_ms and cover_timeout_ms must be non-zero".into(),
            ));
        }
        Password::new(&self.default_password)
            .map_err(|e| Error::Config(format!("default_password: {e}")))?;
        Ok(())
    }

    #[must_use]
    pub fn digit_timeout(&self) -> Duration {
        Duration::from_millis(self.digit_timeout_ms)
    }

    /// Interval between two progress checks of the digit timeout.
    #[must_use]
    pub fn digit_tick(&self) -> Duration {
        self.digit_timeout() / self.digit_timeout_ticks.max(1)
    }

    #[must_use]
    pub fn clear_timeout(&self) -> Duration {
        Duration::from_millis(self.clear_timeout_ms)
    }

    #[must_use]
    pub fn cover_timeout(&self) -> Duration {
        Duration::from_millis(self.cover_timeout_ms)
    }
}

/// Timing and electrical conventions of the keypad scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Settle delay after every strobe edge, in milliseconds.
    pub settle_ms: u64,

    /// Level a column reads when no key connects it to the active row.
    pub idle_level: bool,

    /// Consecutive idle reads before a held key counts as released.
    pub release_samples: u8,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            settle_ms: DEFAULT_SETTLE_MS,
            idle_level: false,
            release_samples: DEFAULT_RELEASE_SAMPLES,
        }
    }
}

impl ScannerConfig {
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// # Errors
    /// Returns `Error::Config` if `release_samples` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.release_samples == 0 {
            return Err(Error::Config("release_samples must be at least 1".into()));
        }
        Ok(())
    }
}
