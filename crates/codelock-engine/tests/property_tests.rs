//! Property-based tests for the code lock policy.
//!
//! Arbitrary key sequences are fed straight into the lock (no scanner), on a
//! paused runtime so timers only fire when a test lets time pass.

use std::time::Duration;

use codelock_core::{Digit, LockConfig, Password, constants::KEYPAD_ALPHABET};
use codelock_engine::{CodeLock, DigitOutcome, LockService, LockState, MemoryAccessLog};
use codelock_hardware::IndicatorHandle;
use proptest::prelude::*;

/// Strategy for any key on the keypad.
fn any_digit() -> impl Strategy<Value = Digit> {
    prop::sample::select(KEYPAD_ALPHABET.chars().collect::<Vec<_>>())
        .prop_map(|c| Digit::new(c).unwrap())
}

/// Strategy for passwords of 1 to 8 keys.
fn any_password() -> impl Strategy<Value = Password> {
    prop::collection::vec(any_digit(), 1..=8).prop_map(|digits| {
        let code: String = digits.iter().map(|d| d.as_char()).collect();
        Password::new(&code).unwrap()
    })
}

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn build(config: LockConfig, password: Password) -> (CodeLock, MemoryAccessLog) {
    let (indicators, _flashes) = IndicatorHandle::detached();
    let (commands, _queue) = tokio::sync::mpsc::unbounded_channel();
    let log = MemoryAccessLog::new();
    let lock = CodeLock::builder(config, password, indicators)
        .with_access_log(log.clone())
        .build(commands)
        .unwrap();
    (lock, log)
}

proptest! {
    /// Property: the typed input never grows past the password length, and
    /// the attempt counter never reaches the limit outside a lockout.
    #[test]
    fn prop_input_and_attempts_bounded(
        password in any_password(),
        keys in prop::collection::vec(any_digit(), 0..64),
        immediate_reject in any::<bool>(),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let config = LockConfig { immediate_reject, ..LockConfig::default() };
            let max_attempts = config.max_attempts;
            let (mut lock, _log) = build(config, password.clone());

            for key in keys {
                lock.handle_digit(key);
                lock.on_clear_timeout_elapsed();
                prop_assert!(lock.input().len() < password.len());
                prop_assert!(lock.incorrect_attempts() < max_attempts);
            }
            Ok(())
        })?;
    }

    /// Property: every accept or reject produces exactly one code record.
    #[test]
    fn prop_one_record_per_outcome(
        password in any_password(),
        keys in prop::collection::vec(any_digit(), 0..64),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let (mut lock, log) = build(LockConfig::default(), password);

            let mut decided = Vec::new();
            for key in keys {
                match lock.handle_digit(key) {
                    DigitOutcome::Accepted => decided.push(true),
                    DigitOutcome::Rejected => decided.push(false),
                    DigitOutcome::Pending | DigitOutcome::Ignored => {}
                }
                if lock.is_ignoring_digits() {
                    lock.on_clear_timeout_elapsed();
                }
            }
            prop_assert_eq!(log.outcomes(), decided);
            Ok(())
        })?;
    }

    /// Property: whatever was typed before, the password is accepted once
    /// the pending entry has timed out and the grace window has passed.
    #[test]
    fn prop_password_accepted_after_noise(
        password in any_password(),
        noise in prop::collection::vec(any_digit(), 0..16),
    ) {
        let rt = paused_runtime();
        rt.block_on(async {
            let (indicators, _flashes) = IndicatorHandle::detached();
            let config = LockConfig { attempt_limiting: false, ..LockConfig::default() };
            let log = MemoryAccessLog::new();
            let builder = CodeLock::builder(config, password.clone(), indicators)
                .with_access_log(log.clone());
            let mut service = LockService::new(builder).unwrap();
            let sender = service.sender();

            for key in noise {
                sender.digit(key);
            }
            service.process_pending();
            service.process_for(Duration::from_secs(5)).await;
            prop_assert_eq!(service.lock().state(), LockState::Idle);

            let before = log.outcomes().len();
            for index in 0..password.len() {
                sender.digit(password.digit_at(index).unwrap());
            }
            service.process_pending();

            prop_assert_eq!(&log.outcomes()[before..], &[true][..]);
            prop_assert!(service.lock().input().is_empty());
            Ok(())
        })?;
    }
}
