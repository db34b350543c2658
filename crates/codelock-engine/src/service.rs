//! Command loop driving a [`CodeLock`].
//!
//! Digits from the scanner, timer notifications and the shutdown request
//! all arrive on one queue and are applied in order, so the lock never sees
//! two events at once.

use codelock_core::{Digit, EventBus};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::Result;
use crate::state_machine::{CodeLock, CodeLockBuilder, LockCommand};

/// Cloneable entry point into a running lock's queue.
#[derive(Debug, Clone)]
pub struct LockSender {
    tx: mpsc::UnboundedSender<LockCommand>,
}

impl LockSender {
    /// Queue a typed digit. Returns `false` if the lock is gone.
    pub fn digit(&self, digit: Digit) -> bool {
        self.send(LockCommand::Digit(digit))
    }

    /// Ask the lock to shut down after the commands already queued.
    pub fn shutdown(&self) -> bool {
        self.send(LockCommand::Shutdown)
    }

    pub fn send(&self, command: LockCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

/// A [`CodeLock`] together with the queue feeding it.
#[derive(Debug)]
pub struct LockService {
    lock: CodeLock,
    sender: LockSender,
    commands: mpsc::UnboundedReceiver<LockCommand>,
}

impl LockService {
    /// Build the lock with its timers wired to a fresh queue.
    ///
    /// # Errors
    /// Fails like [`CodeLockBuilder::build`].
    pub fn new(builder: CodeLockBuilder) -> Result<Self> {
        let (tx, commands) = mpsc::unbounded_channel();
        let lock = builder.build(tx.clone())?;
        Ok(Self {
            lock,
            sender: LockSender { tx },
            commands,
        })
    }

    pub fn sender(&self) -> LockSender {
        self.sender.clone()
    }

    pub fn lock(&self) -> &CodeLock {
        &self.lock
    }

    /// Forward every digit published on `digits` into the queue.
    pub fn attach(&self, digits: &EventBus<Digit>) {
        let sender = self.sender();
        digits.subscribe(move |digit: &Digit| {
            if !sender.digit(*digit) {
                debug!(%digit, "Lock stopped, digit dropped");
            }
            Ok(())
        });
    }

    /// Apply every command already queued. Returns how many were applied.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while !self.lock.is_shut_down()
            && let Ok(command) = self.commands.try_recv()
        {
            self.lock.handle(command);
            applied += 1;
        }
        applied
    }

    /// Apply commands as they arrive for `duration`, or until shutdown.
    pub async fn process_for(&mut self, duration: Duration) {
        let deadline = tokio::time::Instant::now() + duration;
        while !self.lock.is_shut_down() {
            tokio::select! {
                biased;
                Some(command) = self.commands.recv() => {
                    self.lock.handle(command);
                }
                _ = tokio::time::sleep_until(deadline) => break,
            }
        }
    }

    /// Apply commands until a shutdown has been processed.
    pub async fn run(mut self) -> CodeLock {
        info!("Lock service running");
        while !self.lock.is_shut_down() {
            match self.commands.recv().await {
                Some(command) => {
                    self.lock.handle(command);
                }
                // The service holds a sender, so this only happens on teardown.
                None => self.lock.shutdown(),
            }
        }
        info!("Lock service stopped");
        self.lock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::MemoryAccessLog;
    use crate::state_machine::LockState;
    use codelock_core::{LockConfig, Password, parse_digits};
    use codelock_hardware::IndicatorHandle;

    fn service() -> (LockService, MemoryAccessLog) {
        let (indicators, _flashes) = IndicatorHandle::detached();
        let log = MemoryAccessLog::new();
        let builder = CodeLock::builder(
            LockConfig::default(),
            Password::new("1234").unwrap(),
            indicators,
        )
        .with_access_log(log.clone());
        (LockService::new(builder).unwrap(), log)
    }

    #[tokio::test(start_paused = true)]
    async fn test_digits_from_bus_reach_lock() {
        let (mut service, log) = service();
        let bus = EventBus::new();
        service.attach(&bus);

        for digit in parse_digits("1234").unwrap() {
            bus.publish(&digit).unwrap();
        }
        assert_eq!(service.process_pending(), 4);
        assert_eq!(log.outcomes(), vec![true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_process_for_applies_timers() {
        let (mut service, log) = service();
        let sender = service.sender();
        sender.digit(Digit::new('7').unwrap());

        service.process_for(Duration::from_millis(3100)).await;
        assert_eq!(service.lock().state(), LockState::Idle);
        assert_eq!(log.outcomes(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_after_shutdown() {
        let (service, log) = service();
        let sender = service.sender();
        sender.digit(Digit::new('1').unwrap());
        sender.shutdown();
        sender.digit(Digit::new('2').unwrap());

        let lock = service.run().await;
        assert!(lock.is_shut_down());
        assert_eq!(lock.input().len(), 1);
        assert!(log.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_in_task() {
        let (service, log) = service();
        let sender = service.sender();
        let task = tokio::spawn(service.run());

        for digit in parse_digits("9999").unwrap() {
            assert!(sender.digit(digit));
        }
        sender.shutdown();

        let lock = task.await.unwrap();
        assert_eq!(lock.incorrect_attempts(), 1);
        assert_eq!(log.outcomes(), vec![false]);
        assert!(!sender.digit(Digit::new('1').unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bus_after_service_dropped() {
        let (service, _log) = service();
        let bus = EventBus::new();
        service.attach(&bus);
        drop(service);

        assert!(bus.publish(&Digit::new('5').unwrap()).is_ok());
    }
}
