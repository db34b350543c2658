//! One-shot, restartable timer.
//!
//! A [`Timeout`] schedules a single notification on the Tokio runtime and
//! publishes [`Elapsed`] on its own [`EventBus`] when the interval passes.
//!
//! # States
//!
//! - `Idle`: nothing scheduled
//! - `Armed`: a notification is pending
//! - `Fired`: the notification was published; `start()` is needed to run again
//!
//! # Cancellation
//!
//! Every arm gets a new generation number. A scheduled notification only
//! publishes if the timer is still armed with the same generation, so a
//! notification can never be published after `reset()` or `restart()`.
//! Consumers that queue the notification before acting on it can call
//! [`Timeout::is_current`] to drop notifications made stale in between.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use codelock_core::Timeout;
//!
//! #[tokio::main]
//! async fn main() -> codelock_core::Result<()> {
//!     let timeout = Timeout::new(Duration::from_millis(10))?;
//!     timeout.elapsed().subscribe(|elapsed| {
//!         println!("timer generation {} fired", elapsed.generation);
//!         Ok(())
//!     });
//!
//!     timeout.start();
//!     assert!(timeout.is_active());
//!
//!     timeout.reset();
//!     assert!(!timeout.is_active());
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::event::EventBus;
use crate::{Error, Result};

/// Notification published when a timer's interval passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Elapsed {
    /// Generation of the arm that fired.
    pub generation: u64,
}

/// Lifecycle state of a [`Timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerStatus {
    Idle,
    Armed,
    Fired,
}

#[derive(Debug)]
struct TimerState {
    status: TimerStatus,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// One-shot timer publishing [`Elapsed`] on the runtime it was created in.
#[derive(Debug)]
pub struct Timeout {
    interval: Duration,
    state: Arc<Mutex<TimerState>>,
    elapsed: Arc<EventBus<Elapsed>>,
    runtime: Handle,
}

impl Timeout {
    /// Create an idle timer bound to the current Tokio runtime.
    ///
    /// # Errors
    /// Returns `Error::NoRuntime` when called outside a Tokio runtime.
    pub fn new(interval: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| Error::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(interval, runtime))
    }

    /// Create an idle timer scheduling on an explicit runtime.
    pub fn with_handle(interval: Duration, runtime: Handle) -> Self {
        Self {
            interval,
            state: Arc::new(Mutex::new(TimerState {
                status: TimerStatus::Idle,
                generation: 0,
                task: None,
            })),
            elapsed: Arc::new(EventBus::new()),
            runtime,
        }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Channel receiving one [`Elapsed`] per completed arm.
    #[must_use]
    pub fn elapsed(&self) -> &EventBus<Elapsed> {
        &self.elapsed
    }

    /// Arm the timer. Does nothing if it is already armed.
    ///
    /// Returns the generation of the pending arm.
    pub fn start(&self) -> u64 {
        let mut state = self.lock_state();
        if state.status == TimerStatus::Armed {
            return state.generation;
        }

        state.generation += 1;
        state.status = TimerStatus::Armed;
        let generation = state.generation;

        let interval = self.interval;
        let shared = Arc::clone(&self.state);
        let bus = Arc::clone(&self.elapsed);

        state.task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;

            let fire = {
                let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if state.status == TimerStatus::Armed && state.generation == generation {
                    state.status = TimerStatus::Fired;
                    state.task = None;
                    true
                } else {
                    false
                }
            };

            if fire {
                trace!(generation, "timeout elapsed");
                if let Err(e) = bus.publish(&Elapsed { generation }) {
                    warn!("Timeout elapsed handlers failed: {}", e);
                }
            }
        }));

        generation
    }

    /// Cancel a pending notification. Idempotent.
    pub fn reset(&self) {
        let mut state = self.lock_state();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.status = TimerStatus::Idle;
    }

    /// Cancel any pending notification and arm again from now.
    pub fn restart(&self) -> u64 {
        self.reset();
        self.start()
    }

    /// Whether a notification is pending.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_state().status == TimerStatus::Armed
    }

    #[must_use]
    pub fn status(&self) -> TimerStatus {
        self.lock_state().status
    }

    /// Whether `elapsed` is the latest firing and no reset or restart has
    /// happened since.
    #[must_use]
    pub fn is_current(&self, elapsed: Elapsed) -> bool {
        let state = self.lock_state();
        state.status == TimerStatus::Fired && state.generation == elapsed.generation
    }

    /// Cancel any pending notification before teardown.
    pub fn cleanup(&self) {
        self.reset();
    }

    fn lock_state(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        self.reset();
    }
}
