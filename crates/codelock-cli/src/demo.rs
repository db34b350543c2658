//! Scripted key presses for running without hardware.
//!
//! The script types the password once, then wrong codes until the lock
//! locks out, tries the password while locked, waits for the lockout to end
//! and types the password again.

use codelock_core::{Digit, LockConfig, Password, constants::KEYPAD_ALPHABET};
use codelock_hardware::mock::MockBoardHandle;
use std::time::Duration;
use tracing::info;

/// Time a key is held and then left up.
const KEY_HOLD: Duration = Duration::from_millis(150);

/// Pause after each entry on top of the grace window.
const SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Type(Vec<Digit>),
    Pause(Duration),
}

/// Build the demo script for `password` under `config`.
pub fn script(password: &Password, config: &LockConfig) -> Vec<Step> {
    let correct: Vec<Digit> = (0..password.len())
        .filter_map(|index| password.digit_at(index))
        .collect();
    let wrong: Vec<Digit> = correct.iter().map(|digit| next_key(*digit)).collect();
    let between = config.clear_timeout() + SETTLE;

    let wrong_entries = if config.attempt_limiting {
        config.max_attempts
    } else {
        2
    };

    let mut steps = vec![Step::Type(correct.clone()), Step::Pause(between)];
    for _ in 0..wrong_entries {
        steps.push(Step::Type(wrong.clone()));
        steps.push(Step::Pause(between));
    }
    if config.attempt_limiting {
        steps.push(Step::Type(correct.clone()));
        steps.push(Step::Pause(
            Duration::from_secs(config.lockout_secs.into()) + SETTLE,
        ));
    }
    steps.push(Step::Type(correct));
    steps.push(Step::Pause(between));
    steps
}

/// Play `steps` on the simulated board.
pub async fn play(board: MockBoardHandle, steps: Vec<Step>) {
    info!(steps = steps.len(), "Demo started");
    for step in steps {
        match step {
            Step::Type(keys) => {
                for key in keys {
                    board.press_digit(key);
                    tokio::time::sleep(KEY_HOLD).await;
                    board.release();
                    tokio::time::sleep(KEY_HOLD).await;
                }
            }
            Step::Pause(duration) => tokio::time::sleep(duration).await,
        }
    }
    info!("Demo finished");
}

/// The key after `digit` in keypad order, wrapping around.
fn next_key(digit: Digit) -> Digit {
    let keys: Vec<char> = KEYPAD_ALPHABET.chars().collect();
    let index = keys
        .iter()
        .position(|c| *c == digit.as_char())
        .unwrap_or_default();
    Digit::new(keys[(index + 1) % keys.len()]).unwrap_or(digit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codelock_core::parse_digits;

    fn typed(steps: &[Step]) -> Vec<Vec<Digit>> {
        steps
            .iter()
            .filter_map(|step| match step {
                Step::Type(keys) => Some(keys.clone()),
                Step::Pause(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_script_reaches_lockout() {
        let password = Password::new("1234").unwrap();
        let config = LockConfig::default();
        let entries = typed(&script(&password, &config));

        let correct = parse_digits("1234").unwrap();
        let wrong = parse_digits("2345").unwrap();
        assert_eq!(entries.first(), Some(&correct));
        assert_eq!(entries.iter().filter(|e| **e == wrong).count(), 5);
        assert_eq!(entries.len(), 8);
    }

    #[test]
    fn test_script_without_attempt_limiting() {
        let password = Password::new("#").unwrap();
        let config = LockConfig {
            attempt_limiting: false,
            ..LockConfig::default()
        };
        let entries = typed(&script(&password, &config));
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[1], parse_digits("0").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_presses_and_releases() {
        let (_bus, board) = codelock_hardware::mock::MockBoard::new(false);
        let digit = Digit::new('7').unwrap();

        let task = tokio::spawn(play(board.clone(), vec![Step::Type(vec![digit])]));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(board.pressed_digit(), Some(digit));

        task.await.unwrap();
        assert_eq!(board.pressed_digit(), None);
    }
}
