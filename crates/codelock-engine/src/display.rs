//! Status line shown next to the keypad.
//!
//! The lock renders a single short line:
//!
//! | Situation | Line |
//! |-----------|------|
//! | digit typed | earlier digits masked, newest shown (`***5`) |
//! | cover timeout | every digit masked (`****`) |
//! | outcome | empty |
//! | locked out | remaining seconds (`42`) |
//!
//! How the line reaches a person is up to the [`StatusDisplay`]
//! implementation; the binary redraws it on the console.

use codelock_core::{Digit, constants::MASK_CHAR};
use std::sync::{Arc, Mutex, PoisonError};

/// Sink for the status line.
pub trait StatusDisplay: Send {
    /// Replace the shown line.
    fn show(&mut self, line: &str);
}

/// Entered digits with every digit but the newest masked.
///
/// # Examples
///
/// ```
/// use codelock_core::parse_digits;
/// use codelock_engine::display::reveal_last;
///
/// assert_eq!(reveal_last(&parse_digits("1235").unwrap()), "***5");
/// assert_eq!(reveal_last(&[]), "");
/// ```
pub fn reveal_last(input: &[Digit]) -> String {
    match input.split_last() {
        Some((last, earlier)) => {
            let mut line = mask_all(earlier);
            line.push(last.as_char());
            line
        }
        None => String::new(),
    }
}

/// Entered digits fully masked.
pub fn mask_all(input: &[Digit]) -> String {
    std::iter::repeat_n(MASK_CHAR, input.len()).collect()
}

/// Display keeping every line it was asked to show; clones share history.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Line currently shown, empty before anything was shown.
    pub fn current(&self) -> String {
        self.lines().last().cloned().unwrap_or_default()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}
