//! Code lock state machine.
//!
//! The [`CodeLock`] consumes decoded keypad digits, compares complete
//! entries against the password, counts incorrect attempts and locks the
//! keypad out after too many of them.
//!
//! # States
//!
//! - `Idle`: nothing typed
//! - `AwaitingDigits`: a partial entry is in progress
//! - `Locked`: too many incorrect attempts; every digit is ignored until the
//!   countdown reaches zero
//!
//! # Valid Transitions
//!
//! - Idle → AwaitingDigits (first digit)
//! - AwaitingDigits → Idle (accept, reject or inactivity)
//! - AwaitingDigits → Locked (reject reaching the attempt limit)
//! - Locked → Idle (countdown finished)
//!
//! # Timers
//!
//! | Timer | Interval | On elapse |
//! |-------|----------|-----------|
//! | digit | inactivity window / ticks | report progress, reject when the window is used up |
//! | locked | 1 s | count the lockout down |
//! | clear | grace window | accept digits again |
//! | cover | cover delay | mask the last shown digit |
//!
//! Timer notifications are not applied directly. Each timer forwards its
//! [`Elapsed`] into the lock's command queue as a [`LockCommand`], and
//! [`CodeLock::handle`] drops notifications whose generation is no longer
//! current.
//!
//! # Examples
//!
//! ```
//! use codelock_core::{LockConfig, Password};
//! use codelock_engine::{CodeLock, DigitOutcome, LockState};
//! use codelock_hardware::IndicatorHandle;
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> codelock_engine::Result<()> {
//! let (indicators, _flashes) = IndicatorHandle::detached();
//! let (commands, _queue) = mpsc::unbounded_channel();
//!
//! let mut lock = CodeLock::builder(LockConfig::default(), Password::new("42")?, indicators)
//!     .build(commands)?;
//!
//! assert_eq!(lock.handle_digit('4'.try_into()?), DigitOutcome::Pending);
//! assert_eq!(lock.state(), LockState::AwaitingDigits);
//! assert_eq!(lock.handle_digit('2'.try_into()?), DigitOutcome::Accepted);
//! assert_eq!(lock.state(), LockState::Idle);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use codelock_core::{
    Digit, Elapsed, LockConfig, Password, TimerStatus, Timeout, constants::LOCKED_TICK_MS,
};
use codelock_hardware::{IndicatorHandle, ProgressBar};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::access_log::{AccessLogSink, AccessRecord, MemoryAccessLog};
use crate::clock::{Clock, SystemClock};
use crate::display::{StatusDisplay, mask_all, reveal_last};
use crate::error::Result;

/// Maximum number of state transitions to keep in history.
const MAX_HISTORY_SIZE: usize = 100;

/// Security state of the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum LockState {
    /// Nothing typed.
    Idle,

    /// A partial entry is in progress.
    AwaitingDigits,

    /// Locked out after too many incorrect attempts.
    Locked { remaining_seconds: u32 },
}

impl LockState {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingDigits => write!(f, "AwaitingDigits"),
            Self::Locked { remaining_seconds } => write!(f, "Locked({remaining_seconds}s)"),
        }
    }
}

/// A recorded change of [`LockState`] kind.
///
/// Countdown ticks inside `Locked` are not recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockTransition {
    pub from: LockState,
    pub to: LockState,

    /// Not serialized; set to the deserialization time when read back.
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl LockTransition {
    pub fn new(from: LockState, to: LockState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// The four timers owned by the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockTimer {
    Digit,
    Locked,
    Clear,
    Cover,
}

impl LockTimer {
    pub const ALL: [LockTimer; 4] = [Self::Digit, Self::Locked, Self::Clear, Self::Cover];
}

impl fmt::Display for LockTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Digit => "digit",
            Self::Locked => "locked",
            Self::Clear => "clear",
            Self::Cover => "cover",
        };
        f.write_str(name)
    }
}

/// Message processed by the lock, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockCommand {
    /// A digit decoded by the keypad scanner.
    Digit(Digit),

    /// A timer's interval passed.
    TimerElapsed { timer: LockTimer, elapsed: Elapsed },

    /// Cancel timers, write the shutdown record and close the log.
    Shutdown,
}

/// Effect of one digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitOutcome {
    /// Discarded: locked out, in the grace window, outside the access window or shut down.
    Ignored,
    /// Appended; the entry is not complete yet.
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug)]
struct LockTimers {
    digit: Timeout,
    locked: Timeout,
    clear: Timeout,
    cover: Timeout,
}

impl LockTimers {
    fn new(config: &LockConfig) -> Result<Self> {
        Ok(Self {
            digit: Timeout::new(config.digit_tick())?,
            locked: Timeout::new(Duration::from_millis(LOCKED_TICK_MS))?,
            clear: Timeout::new(config.clear_timeout())?,
            cover: Timeout::new(config.cover_timeout())?,
        })
    }

    fn get(&self, timer: LockTimer) -> &Timeout {
        match timer {
            LockTimer::Digit => &self.digit,
            LockTimer::Locked => &self.locked,
            LockTimer::Clear => &self.clear,
            LockTimer::Cover => &self.cover,
        }
    }

    fn forward_to(&self, commands: &mpsc::UnboundedSender<LockCommand>) {
        for timer in LockTimer::ALL {
            let commands = commands.clone();
            self.get(timer).elapsed().subscribe(move |elapsed: &Elapsed| {
                commands
                    .send(LockCommand::TimerElapsed {
                        timer,
                        elapsed: *elapsed,
                    })
                    .map_err(|_| format!("{timer} timer fired after the lock stopped").into())
            });
        }
    }

    fn cleanup(&self) {
        for timer in LockTimer::ALL {
            self.get(timer).cleanup();
        }
    }
}

/// Keypad code lock.
///
/// Not thread-safe by design: all mutation goes through one command queue
/// (see [`crate::LockService`]).
pub struct CodeLock {
    config: LockConfig,
    password: Password,
    state: LockState,
    input: Vec<Digit>,
    incorrect_attempts: u32,
    ignore_digits: bool,
    digit_ticks: u32,
    timers: LockTimers,
    indicators: IndicatorHandle,
    access_log: Box<dyn AccessLogSink>,
    display: Option<Box<dyn StatusDisplay>>,
    progress: Option<Box<dyn ProgressBar>>,
    clock: Arc<dyn Clock>,
    history: VecDeque<LockTransition>,
    shut_down: bool,
}

impl CodeLock {
    /// Start building a lock around its required parts.
    pub fn builder(
        config: LockConfig,
        password: Password,
        indicators: IndicatorHandle,
    ) -> CodeLockBuilder {
        CodeLockBuilder {
            config,
            password,
            indicators,
            access_log: None,
            display: None,
            progress: None,
            clock: None,
        }
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    /// Digits typed since the last outcome.
    pub fn input(&self) -> &[Digit] {
        &self.input
    }

    pub fn incorrect_attempts(&self) -> u32 {
        self.incorrect_attempts
    }

    /// Whether digits are discarded because an outcome was just reported.
    pub fn is_ignoring_digits(&self) -> bool {
        self.ignore_digits
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn timer_status(&self, timer: LockTimer) -> TimerStatus {
        self.timers.get(timer).status()
    }

    pub fn is_timer_active(&self, timer: LockTimer) -> bool {
        self.timers.get(timer).is_active()
    }

    /// Recent state transitions, oldest first.
    pub fn history(&self) -> &VecDeque<LockTransition> {
        &self.history
    }

    /// Apply one queued command. Returns `false` once the lock has shut down.
    pub fn handle(&mut self, command: LockCommand) -> bool {
        match command {
            LockCommand::Digit(digit) => {
                self.handle_digit(digit);
            }
            LockCommand::TimerElapsed { timer, elapsed } => self.handle_elapsed(timer, elapsed),
            LockCommand::Shutdown => self.shutdown(),
        }
        !self.shut_down
    }

    /// Process a typed digit.
    pub fn handle_digit(&mut self, digit: Digit) -> DigitOutcome {
        trace!(%digit, "Digit received");
        if self.shut_down {
            return DigitOutcome::Ignored;
        }
        if self.state.is_locked() {
            info!(state = %self.state, "Locked out, digit ignored");
            return DigitOutcome::Ignored;
        }
        if self.ignore_digits {
            debug!("Outcome grace window active, digit ignored");
            return DigitOutcome::Ignored;
        }
        if let Some(window) = self.config.access_window {
            let now = self.clock.now().time();
            if !window.admits(now) {
                info!(%now, begin = %window.begin, end = %window.end, "Outside access window, digit ignored");
                return DigitOutcome::Ignored;
            }
        }

        self.indicators.beep();
        self.input.push(digit);
        self.digit_ticks = 0;
        self.timers.digit.restart();
        self.timers.cover.restart();
        self.show(&reveal_last(&self.input));
        self.show_progress(0.0);
        if self.state == LockState::Idle {
            self.set_state(LockState::AwaitingDigits);
        }

        let typed = self.input.len();
        if typed == self.password.len() {
            if self.password.matches(&self.input) {
                self.on_accept();
                DigitOutcome::Accepted
            } else {
                self.on_reject(true);
                DigitOutcome::Rejected
            }
        } else if self.config.immediate_reject && self.password.digit_at(typed - 1) != Some(digit)
        {
            debug!(position = typed, "Digit differs from password, rejecting early");
            self.on_reject(true);
            DigitOutcome::Rejected
        } else {
            DigitOutcome::Pending
        }
    }

    /// Grant access for a matching entry.
    pub fn on_accept(&mut self) {
        self.end_entry();
        self.incorrect_attempts = 0;
        self.indicators.flash_green();
        info!("Code accepted");
        self.record(AccessRecord::code(self.clock.now(), true));
        self.begin_grace();
        self.set_state(LockState::Idle);
    }

    /// Deny access, counting the attempt if `count_attempt` and attempt limiting is on.
    pub fn on_reject(&mut self, count_attempt: bool) {
        self.end_entry();
        if count_attempt && self.config.attempt_limiting {
            self.incorrect_attempts += 1;
        }
        let lock_out =
            self.config.attempt_limiting && self.incorrect_attempts >= self.config.max_attempts;

        self.indicators.flash_red();
        info!(
            attempts = self.incorrect_attempts,
            max_attempts = self.config.max_attempts,
            counted = count_attempt,
            "Code rejected"
        );
        self.record(AccessRecord::code(self.clock.now(), false));
        self.begin_grace();

        if lock_out {
            self.lock_out();
        } else {
            self.set_state(LockState::Idle);
        }
    }

    /// One tick of the inactivity window passed.
    pub fn on_digit_timeout_elapsed(&mut self) {
        if self.input.is_empty() {
            return;
        }

        let ticks = self.config.digit_timeout_ticks;
        self.digit_ticks = (self.digit_ticks + 1).min(ticks);
        self.show_progress(self.digit_ticks as f32 / ticks as f32);

        if self.digit_ticks >= ticks {
            info!(typed = self.input.len(), "Entry timed out");
            self.on_reject(false);
        } else {
            self.timers.digit.restart();
        }
    }

    /// One second of lockout passed.
    pub fn on_locked_timeout_elapsed(&mut self) {
        let LockState::Locked { remaining_seconds } = self.state else {
            return;
        };

        let remaining_seconds = remaining_seconds.saturating_sub(1);
        trace!(remaining_seconds, "Lockout countdown");
        if remaining_seconds == 0 {
            info!("Lockout finished");
            self.set_state(LockState::Idle);
            self.show("");
        } else {
            self.set_state(LockState::Locked { remaining_seconds });
            self.show(&remaining_seconds.to_string());
            self.timers.locked.restart();
        }
    }

    /// The post-outcome grace window ended.
    pub fn on_clear_timeout_elapsed(&mut self) {
        trace!("Grace window over");
        self.ignore_digits = false;
    }

    /// The last typed digit has been visible long enough.
    pub fn on_cover_timeout_elapsed(&mut self) {
        if !self.input.is_empty() {
            self.show(&mask_all(&self.input));
        }
    }

    /// Cancel all timers, write the shutdown record and close the log.
    ///
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.timers.cleanup();
        if let Some(progress) = self.progress.as_mut()
            && let Err(e) = progress.clear()
        {
            warn!(error = %e, "Failed to clear progress bar");
        }
        self.record(AccessRecord::shutdown(self.clock.now()));
        if let Err(e) = self.access_log.close() {
            warn!(error = %e, "Failed to close access log");
        }
        self.shut_down = true;
        info!("Code lock shut down");
    }

    fn handle_elapsed(&mut self, timer: LockTimer, elapsed: Elapsed) {
        if self.shut_down || !self.timers.get(timer).is_current(elapsed) {
            trace!(%timer, generation = elapsed.generation, "Stale timer notification dropped");
            return;
        }
        match timer {
            LockTimer::Digit => self.on_digit_timeout_elapsed(),
            LockTimer::Locked => self.on_locked_timeout_elapsed(),
            LockTimer::Clear => self.on_clear_timeout_elapsed(),
            LockTimer::Cover => self.on_cover_timeout_elapsed(),
        }
    }

    fn lock_out(&mut self) {
        let remaining_seconds = self.config.lockout_secs;
        self.incorrect_attempts = 0;
        warn!(seconds = remaining_seconds, "Too many incorrect attempts, locking out");
        self.set_state(LockState::Locked { remaining_seconds });
        self.show(&remaining_seconds.to_string());
        self.timers.locked.restart();
    }

    fn end_entry(&mut self) {
        self.input.clear();
        self.digit_ticks = 0;
        self.timers.digit.reset();
        self.timers.cover.reset();
        self.show("");
        self.show_progress(0.0);
    }

    fn begin_grace(&mut self) {
        self.ignore_digits = true;
        self.timers.clear.restart();
    }

    fn set_state(&mut self, new_state: LockState) {
        if self.state == new_state {
            return;
        }
        let previous = std::mem::replace(&mut self.state, new_state);
        if previous.same_kind(&new_state) {
            return;
        }

        debug!(from = %previous, to = %new_state, "Lock state changed");
        self.history.push_back(LockTransition::new(previous, new_state));
        if self.history.len() > MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
    }

    fn record(&mut self, record: AccessRecord) {
        if let Err(e) = self.access_log.append(&record) {
            warn!(event = %record.event, error = %e, "Failed to append access log record");
        }
    }

    fn show(&mut self, line: &str) {
        if let Some(display) = self.display.as_mut() {
            display.show(line);
        }
    }

    fn show_progress(&mut self, fraction: f32) {
        if let Some(progress) = self.progress.as_mut()
            && let Err(e) = progress.show(fraction)
        {
            warn!(error = %e, "Failed to update progress bar");
        }
    }
}

impl fmt::Debug for CodeLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeLock")
            .field("state", &self.state)
            .field("typed", &self.input.len())
            .field("incorrect_attempts", &self.incorrect_attempts)
            .field("ignore_digits", &self.ignore_digits)
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CodeLock`] with optional collaborators.
///
/// Without an explicit access log the records are kept in memory only.
pub struct CodeLockBuilder {
    config: LockConfig,
    password: Password,
    indicators: IndicatorHandle,
    access_log: Option<Box<dyn AccessLogSink>>,
    display: Option<Box<dyn StatusDisplay>>,
    progress: Option<Box<dyn ProgressBar>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CodeLockBuilder {
    pub fn with_access_log(mut self, access_log: impl AccessLogSink + 'static) -> Self {
        self.access_log = Some(Box::new(access_log));
        self
    }

    pub fn with_display(mut self, display: impl StatusDisplay + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }

    pub fn with_progress_bar(mut self, progress: impl ProgressBar + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Build the lock, forwarding its timer notifications into `commands`.
    ///
    /// Must be called inside a Tokio runtime. Appends the startup record.
    ///
    /// # Errors
    /// Returns a `Core` error for an invalid configuration or when no
    /// runtime is available.
    pub fn build(self, commands: mpsc::UnboundedSender<LockCommand>) -> Result<CodeLock> {
        self.config.validate()?;
        let timers = LockTimers::new(&self.config)?;
        timers.forward_to(&commands);

        let mut lock = CodeLock {
            config: self.config,
            password: self.password,
            state: LockState::Idle,
            input: Vec::new(),
            incorrect_attempts: 0,
            ignore_digits: false,
            digit_ticks: 0,
            timers,
            indicators: self.indicators,
            access_log: self
                .access_log
                .unwrap_or_else(|| Box::new(MemoryAccessLog::new())),
            display: self.display,
            progress: self.progress,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
            shut_down: false,
        };

        lock.record(AccessRecord::startup(lock.clock.now()));
        info!(
            password_length = lock.password.len(),
            attempt_limiting = lock.config.attempt_limiting,
            immediate_reject = lock.config.immediate_reject,
            "Code lock ready"
        );
        Ok(lock)
    }
}
