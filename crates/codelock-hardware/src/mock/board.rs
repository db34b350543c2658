//! Simulated keypad and indicator board.
//!
//! The board models the hardware behind the five lines of a [`LineBus`]:
//!
//! - an address latch that captures the three data lines on the falling edge
//!   of the strobe line
//! - a 4x3 keypad matrix whose rows are selected by the latched address
//! - a sense gate that routes the keypad columns onto the data lines
//!
//! Tests drive it through a cloneable [`MockBoardHandle`]: press and release
//! keys, inspect every address the latch has captured, and inject line faults.

use crate::{
    HardwareError, Result,
    traits::{GpioLine, LineBus},
    types::LineDirection,
};
use codelock_core::{Digit, Indicator, LogicalAddress};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One of the five simulated pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockPin {
    Data(usize),
    Strobe,
    Sense,
}

impl MockPin {
    fn index(&self) -> usize {
        match self {
            Self::Data(bit) => *bit,
            Self::Strobe => 3,
            Self::Sense => 4,
        }
    }
}

impl fmt::Display for MockPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(bit) => write!(f, "D{bit}"),
            Self::Strobe => write!(f, "STROBE"),
            Self::Sense => write!(f, "SENSE"),
        }
    }
}

/// Latch history kept by the board; older entries are dropped first.
pub const MAX_LATCH_LOG: usize = 4096;

#[derive(Debug)]
struct BoardState {
    directions: [LineDirection; 5],
    levels: [bool; 5],
    latched: LogicalAddress,
    latch_log: VecDeque<LogicalAddress>,
    pressed: Option<(usize, usize)>,
    idle_level: bool,
    fault: Option<String>,
}

impl BoardState {
    fn new(idle_level: bool) -> Self {
        Self {
            directions: [LineDirection::Input; 5],
            levels: [false; 5],
            latched: LogicalAddress::Unused,
            latch_log: VecDeque::new(),
            pressed: None,
            idle_level,
            fault: None,
        }
    }

    fn take_fault(&mut self, pin: MockPin) -> Result<()> {
        match self.fault.take() {
            Some(message) => Err(HardwareError::line_fault(pin.to_string(), message)),
            None => Ok(()),
        }
    }

    fn drive(&mut self, pin: MockPin, high: bool) -> Result<()> {
        self.take_fault(pin)?;
        if self.directions[pin.index()] != LineDirection::Output {
            return Err(HardwareError::line_fault(
                pin.to_string(),
                "cannot drive a line configured as input",
            ));
        }

        let was_high = self.levels[pin.index()];
        self.levels[pin.index()] = high;

        if pin == MockPin::Strobe && was_high && !high {
            self.latch();
        }
        Ok(())
    }

    fn latch(&mut self) {
        // Data lines the controller is not driving float low on the latch input
        let bits = [0, 1, 2].map(|bit| {
            self.directions[bit] == LineDirection::Output && self.levels[bit]
        });
        self.latched = LogicalAddress::from_bits(bits);
        if self.latch_log.len() == MAX_LATCH_LOG {
            self.latch_log.pop_front();
        }
        self.latch_log.push_back(self.latched);
    }

    fn sample(&mut self, pin: MockPin) -> Result<bool> {
        self.take_fault(pin)?;
        if self.directions[pin.index()] != LineDirection::Input {
            return Err(HardwareError::line_fault(
                pin.to_string(),
                "cannot sample a line configured as output",
            ));
        }

        let MockPin::Data(column) = pin else {
            return Ok(self.levels[pin.index()]);
        };

        let sense_enabled = self.directions[MockPin::Sense.index()] == LineDirection::Output
            && self.levels[MockPin::Sense.index()];
        let key_on_column = match (self.pressed, self.latched.row_index()) {
            (Some((row, pressed_column)), Some(latched_row)) => {
                row == latched_row && pressed_column == column
            }
            _ => false,
        };

        if sense_enabled && key_on_column {
            Ok(!self.idle_level)
        } else {
            Ok(self.idle_level)
        }
    }
}

/// Shared handle on the simulated board, embedded in every [`MockLine`].
#[derive(Debug, Clone)]
struct SharedBoard(Arc<Mutex<BoardState>>);

impl SharedBoard {
    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Constructor for a simulated board.
///
/// # Examples
///
/// ```
/// use codelock_hardware::mock::MockBoard;
///
/// let (bus, handle) = MockBoard::new(false);
/// handle.press(0, 1).unwrap();
/// assert_eq!(handle.pressed_digit().map(|d| d.as_char()), Some('2'));
/// # drop(bus);
/// ```
#[derive(Debug)]
pub struct MockBoard;

impl MockBoard {
    /// Build the five lines of a board whose unpressed columns read `idle_level`.
    pub fn new(idle_level: bool) -> (LineBus<MockLine>, MockBoardHandle) {
        let board = SharedBoard(Arc::new(Mutex::new(BoardState::new(idle_level))));
        let line = |pin| MockLine {
            pin,
            board: board.clone(),
        };

        let bus = LineBus::new(
            [line(MockPin::Data(0)), line(MockPin::Data(1)), line(MockPin::Data(2))],
            line(MockPin::Strobe),
            line(MockPin::Sense),
        );

        (bus, MockBoardHandle { board })
    }
}

/// A single simulated line.
#[derive(Debug)]
pub struct MockLine {
    pin: MockPin,
    board: SharedBoard,
}

impl MockLine {
    pub fn pin(&self) -> MockPin {
        self.pin
    }
}

impl GpioLine for MockLine {
    fn set_input(&mut self) -> Result<()> {
        let mut board = self.board.lock();
        board.take_fault(self.pin)?;
        board.directions[self.pin.index()] = LineDirection::Input;
        Ok(())
    }

    fn set_output(&mut self) -> Result<()> {
        let mut board = self.board.lock();
        board.take_fault(self.pin)?;
        board.directions[self.pin.index()] = LineDirection::Output;
        Ok(())
    }

    fn set_high(&mut self) -> Result<()> {
        self.board.lock().drive(self.pin, true)
    }

    fn set_low(&mut self) -> Result<()> {
        self.board.lock().drive(self.pin, false)
    }

    fn sample_level(&mut self) -> Result<bool> {
        self.board.lock().sample(self.pin)
    }
}

/// Handle for controlling and observing a simulated board.
///
/// Cloneable; every clone observes the same board.
#[derive(Debug, Clone)]
pub struct MockBoardHandle {
    board: SharedBoard,
}

impl MockBoardHandle {
    /// Hold down the key at `row`, `column`, releasing any other key.
    ///
    /// # Errors
    /// Returns an error if the position is outside the 4x3 matrix.
    pub fn press(&self, row: usize, column: usize) -> Result<()> {
        let digit = Digit::from_position(row, column)?;
        self.board.lock().pressed = Some(digit.position());
        Ok(())
    }

    /// Hold down the key labelled `digit`.
    pub fn press_digit(&self, digit: Digit) {
        self.board.lock().pressed = Some(digit.position());
    }

    /// Release whatever key is held.
    pub fn release(&self) {
        self.board.lock().pressed = None;
    }

    pub fn pressed_digit(&self) -> Option<Digit> {
        let pressed = self.board.lock().pressed;
        pressed.and_then(|(row, column)| Digit::from_position(row, column).ok())
    }

    /// Address currently held by the latch.
    pub fn latched(&self) -> LogicalAddress {
        self.board.lock().latched
    }

    /// Addresses latched since creation or the last [`clear_log`](Self::clear_log),
    /// oldest first, at most [`MAX_LATCH_LOG`] of them.
    pub fn latch_log(&self) -> Vec<LogicalAddress> {
        self.board.lock().latch_log.iter().copied().collect()
    }

    pub fn clear_log(&self) {
        self.board.lock().latch_log.clear();
    }

    /// Number of times `indicator` was asserted according to the latch log.
    pub fn pulse_count(&self, indicator: Indicator) -> usize {
        let address = indicator.address();
        self.board
            .lock()
            .latch_log
            .iter()
            .filter(|latched| **latched == address)
            .count()
    }

    /// Make the next operation on any line fail with `message`.
    pub fn inject_fault(&self, message: impl Into<String>) {
        self.board.lock().fault = Some(message.into());
    }

    /// Current direction of `pin`.
    pub fn direction(&self, pin: MockPin) -> LineDirection {
        self.board.lock().directions[pin.index()]
    }

    /// Level last driven on `pin`.
    pub fn level(&self, pin: MockPin) -> bool {
        self.board.lock().levels[pin.index()]
    }
}
