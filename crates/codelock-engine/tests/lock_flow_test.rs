//! End-to-end tests from key presses on the board to lock outcomes.
//!
//! Each test runs the real scan loop against the simulated board, so digits
//! reach the lock only if the multiplexer decoded them, and indicator flashes
//! are counted from the addresses the board actually latched.

mod common;

use std::time::Duration;

use codelock_core::{Indicator, LockConfig, LogicalAddress};
use codelock_engine::{AccessEvent, CsvAccessLog, LockState, MemoryAccessLog};
use codelock_hardware::{LineDirection, ScanTermination, mock::MockPin};
use common::{PASSWORD, PAST_GRACE, Rig};

// ============================================================================
// Access Outcomes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_correct_code_flashes_green() {
    let mut rig = Rig::new(LockConfig::default());
    rig.type_code(PASSWORD).await;

    assert_eq!(rig.log.outcomes(), vec![true]);
    assert_eq!(rig.board.pulse_count(Indicator::GreenLed), 1);
    assert_eq!(rig.board.pulse_count(Indicator::RedLed), 0);
    assert_eq!(rig.board.pulse_count(Indicator::Buzzer), 4);
    assert_eq!(rig.service.lock().state(), LockState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_wrong_code_flashes_red() {
    let mut rig = Rig::new(LockConfig::default());
    rig.type_code("4321").await;

    assert_eq!(rig.log.outcomes(), vec![false]);
    assert_eq!(rig.board.pulse_count(Indicator::RedLed), 1);
    assert_eq!(rig.board.pulse_count(Indicator::GreenLed), 0);
    assert_eq!(rig.service.lock().incorrect_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_immediate_reject_stops_at_first_wrong_key() {
    let mut rig = Rig::new(LockConfig {
        immediate_reject: true,
        ..LockConfig::default()
    });
    rig.type_code("15").await;

    assert_eq!(rig.log.outcomes(), vec![false]);
    assert!(rig.service.lock().input().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_keys_during_grace_window_are_dropped() {
    let mut rig = Rig::new(LockConfig::default());
    rig.type_code(PASSWORD).await;
    rig.board.clear_log();

    // 320 ms of typing, well inside the 1 s grace window.
    rig.type_code("1234").await;
    assert_eq!(rig.board.pulse_count(Indicator::Buzzer), 0);
    assert_eq!(rig.log.outcomes(), vec![true]);

    rig.wait(PAST_GRACE).await;
    rig.type_code(PASSWORD).await;
    assert_eq!(rig.log.outcomes(), vec![true, true]);
}

#[tokio::test(start_paused = true)]
async fn test_partial_entry_times_out() {
    let mut rig = Rig::new(LockConfig::default());
    rig.type_code("12").await;
    assert_eq!(rig.service.lock().state(), LockState::AwaitingDigits);

    rig.wait(Duration::from_millis(3100)).await;
    assert_eq!(rig.service.lock().state(), LockState::Idle);
    assert_eq!(rig.log.outcomes(), vec![false]);
    assert_eq!(rig.service.lock().incorrect_attempts(), 0);
    assert_eq!(rig.board.pulse_count(Indicator::RedLed), 1);
}

// ============================================================================
// Lockout
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_lockout_silences_keypad() {
    let mut rig = Rig::new(LockConfig {
        max_attempts: 3,
        lockout_secs: 5,
        ..LockConfig::default()
    });
    for _ in 0..3 {
        rig.type_code("0000").await;
        rig.wait(PAST_GRACE).await;
    }
    assert!(rig.service.lock().state().is_locked());

    rig.board.clear_log();
    rig.type_code(PASSWORD).await;
    assert_eq!(rig.board.pulse_count(Indicator::Buzzer), 0);
    assert_eq!(rig.log.outcomes(), vec![false; 3]);

    rig.wait(Duration::from_secs(5)).await;
    assert_eq!(rig.service.lock().state(), LockState::Idle);
    rig.type_code(PASSWORD).await;
    assert_eq!(rig.log.outcomes(), vec![false, false, false, true]);
}

// ============================================================================
// Shutdown and Faults
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_graceful_shutdown() {
    let mut rig = Rig::new(LockConfig::default());
    rig.type_code("12").await;

    let scanner = rig.scanner.take().unwrap();
    assert_eq!(scanner.shutdown().await, ScanTermination::Stopped);
    assert_eq!(rig.board.latched(), LogicalAddress::Unused);
    for line in 0..3 {
        assert_eq!(rig.board.direction(MockPin::Data(line)), LineDirection::Input);
    }

    rig.service.sender().shutdown();
    let lock = rig.service.run().await;
    assert!(lock.is_shut_down());
    assert!(rig.log.is_closed());

    let events: Vec<AccessEvent> = rig.log.records().iter().map(|r| r.event).collect();
    assert_eq!(events, vec![AccessEvent::Startup, AccessEvent::Shutdown]);
}

#[tokio::test(start_paused = true)]
async fn test_scanner_fault_leaves_lock_running() {
    let mut rig = Rig::new(LockConfig::default());
    rig.board.inject_fault("strobe shorted");

    let scanner = rig.scanner.take().unwrap();
    match scanner.wait().await {
        ScanTermination::Faulted(message) => assert!(message.contains("strobe shorted")),
        other => panic!("expected a fault, got {other}"),
    }

    rig.wait(PAST_GRACE).await;
    assert!(!rig.service.lock().is_shut_down());
    assert_eq!(rig.service.lock().state(), LockState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_csv_log_written_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("access_log.csv");

    let sink = CsvAccessLog::open(&path).unwrap();
    let mut rig = Rig::with_log(LockConfig::default(), sink, MemoryAccessLog::new());
    rig.type_code("9").await;
    rig.wait(Duration::from_millis(3100)).await;
    rig.wait(PAST_GRACE).await;
    rig.type_code(PASSWORD).await;

    rig.scanner.take().unwrap().shutdown().await;
    rig.service.sender().shutdown();
    rig.service.run().await;

    let records = CsvAccessLog::read_all(&path).unwrap();
    let summary: Vec<(AccessEvent, Option<bool>)> =
        records.iter().map(|r| (r.event, r.outcome)).collect();
    assert_eq!(
        summary,
        vec![
            (AccessEvent::Startup, None),
            (AccessEvent::Code, Some(false)),
            (AccessEvent::Code, Some(true)),
            (AccessEvent::Shutdown, None),
        ]
    );
}
