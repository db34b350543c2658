use crate::{
    Result,
    constants::{KEYPAD_ALPHABET, KEYPAD_COLUMNS, KEYPAD_LAYOUT, KEYPAD_ROWS, MASK_CHAR},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// A single keypad character (`0`-`9`, `*` or `#`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Digit(char);

impl Digit {
    /// Create a digit with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidDigit` if the character is not on the keypad.
    pub fn new(c: char) -> Result<Self> {
        if KEYPAD_ALPHABET.contains(c) {
            Ok(Digit(c))
        } else {
            Err(Error::InvalidDigit(c))
        }
    }

    /// Resolve a zero-based (row, column) keypad position.
    ///
    /// # Errors
    /// Returns `Error::InvalidKeyPosition` if the position is off the 4x3 grid.
    ///
    /// # Examples
    ///
    /// ```
    /// use codelock_core::Digit;
    ///
    /// assert_eq!(Digit::from_position(1, 2).unwrap().as_char(), '6');
    /// assert!(Digit::from_position(4, 0).is_err());
    /// ```
    pub fn from_position(row: usize, column: usize) -> Result<Self> {
        KEYPAD_LAYOUT
            .get(row)
            .and_then(|r| r.get(column))
            .map(|c| Digit(*c))
            .ok_or(Error::InvalidKeyPosition { row, column })
    }

    /// Zero-based (row, column) position of this digit on the keypad.
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        for row in 0..KEYPAD_ROWS {
            for column in 0..KEYPAD_COLUMNS {
                if KEYPAD_LAYOUT[row][column] == self.0 {
                    return (row, column);
                }
            }
        }
        unreachable!("Digit is validated against the keypad layout")
    }

    #[must_use]
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl fmt::Display for Digit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<char> for Digit {
    type Error = Error;

    fn try_from(c: char) -> Result<Self> {
        Digit::new(c)
    }
}

impl From<Digit> for char {
    fn from(digit: Digit) -> char {
        digit.0
    }
}

/// Parse a string of keypad characters into digits.
///
/// # Errors
/// Returns `Error::InvalidDigit` for the first character not on the keypad.
pub fn parse_digits(s: &str) -> Result<Vec<Digit>> {
    s.chars().map(Digit::new).collect()
}

/// Stored unlock code.
///
/// # Security
/// Comparison against typed input runs in constant time over the digits, and
/// the `Debug` output never reveals the code.
#[derive(Clone, Eq)]
pub struct Password(Vec<Digit>);

impl Password {
    /// Create a password with validation.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPassword` if the password is empty or contains
    /// characters that cannot be typed on the keypad.
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.is_empty() {
            return Err(Error::InvalidPassword {
                reason: "password is empty".to_string(),
            });
        }
        let digits = parse_digits(code).map_err(|e| Error::InvalidPassword {
            reason: e.to_string(),
        })?;
        Ok(Password(digits))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Digit expected at `index`, if within the password.
    #[must_use]
    pub fn digit_at(&self, index: usize) -> Option<Digit> {
        self.0.get(index).copied()
    }

    /// Check a complete entry against the password.
    ///
    /// # Examples
    ///
    /// ```
    /// use codelock_core::{Password, parse_digits};
    ///
    /// let password = Password::new("1234").unwrap();
    /// assert!(password.matches(&parse_digits("1234").unwrap()));
    /// assert!(!password.matches(&parse_digits("1243").unwrap()));
    /// assert!(!password.matches(&parse_digits("123").unwrap()));
    /// ```
    #[must_use]
    pub fn matches(&self, input: &[Digit]) -> bool {
        if input.len() != self.0.len() {
            return false;
        }
        let expected: Vec<u8> = self.0.iter().map(|d| d.as_char() as u8).collect();
        let typed: Vec<u8> = input.iter().map(|d| d.as_char() as u8).collect();
        expected.ct_eq(&typed).into()
    }

    /// The password as text, for persisting to the password file.
    #[must_use]
    pub fn to_code_string(&self) -> String {
        self.0.iter().map(Digit::as_char).collect()
    }
}

impl PartialEq for Password {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Password({})", MASK_CHAR.to_string().repeat(self.0.len()))
    }
}

impl std::str::FromStr for Password {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Password::new(s)
    }
}

/// One of the eight logical lines multiplexed over the data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LogicalAddress {
    Row0 = 0,
    Row1 = 1,
    Row2 = 2,
    Row3 = 3,
    GreenLed = 4,
    RedLed = 5,
    Buzzer = 6,
    /// Not wired to anything; latched to release an indicator.
    Unused = 7,
}

/// Data-line pattern of every logical address, indexed by address.
///
/// Element `i` of a pattern drives data line `Di`; data line 0 carries the
/// least significant bit.
pub const ADDRESS_BITS: [[bool; 3]; 8] = [
    [false, false, false],
    [true, false, false],
    [false, true, false],
    [true, true, false],
    [false, false, true],
    [true, false, true],
    [false, true, true],
    [true, true, true],
];

impl LogicalAddress {
    /// Every address in numeric order.
    pub const ALL: [LogicalAddress; 8] = [
        LogicalAddress::Row0,
        LogicalAddress::Row1,
        LogicalAddress::Row2,
        LogicalAddress::Row3,
        LogicalAddress::GreenLed,
        LogicalAddress::RedLed,
        LogicalAddress::Buzzer,
        LogicalAddress::Unused,
    ];

    /// Convert a raw address.
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` for values above 7.
    pub fn from_u8(value: u8) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(Error::InvalidAddress(value))
    }

    #[must_use]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Address of keypad row `index` (0-3).
    ///
    /// # Errors
    /// Returns `Error::InvalidAddress` if `index` is not a keypad row.
    pub fn row(index: usize) -> Result<Self> {
        if index < KEYPAD_ROWS {
            Self::from_u8(index as u8)
        } else {
            Err(Error::InvalidAddress(index.min(u8::MAX as usize) as u8))
        }
    }

    /// Keypad row index if this address selects a row.
    #[must_use]
    pub fn row_index(&self) -> Option<usize> {
        match self {
            Self::Row0 => Some(0),
            Self::Row1 => Some(1),
            Self::Row2 => Some(2),
            Self::Row3 => Some(3),
            _ => None,
        }
    }

    /// Data-line pattern for this address.
    ///
    /// # Examples
    ///
    /// ```
    /// use codelock_core::LogicalAddress;
    ///
    /// assert_eq!(LogicalAddress::GreenLed.to_bits(), [false, false, true]);
    /// assert_eq!(LogicalAddress::Row1.to_bits(), [true, false, false]);
    /// ```
    #[must_use]
    pub fn to_bits(&self) -> [bool; 3] {
        ADDRESS_BITS[*self as usize]
    }

    /// Address latched by a data-line pattern.
    #[must_use]
    pub fn from_bits(bits: [bool; 3]) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|address| address.to_bits() == bits)
            .unwrap_or(Self::Unused)
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Row0 => "row 1",
            Self::Row1 => "row 2",
            Self::Row2 => "row 3",
            Self::Row3 => "row 4",
            Self::GreenLed => "green LED",
            Self::RedLed => "red LED",
            Self::Buzzer => "buzzer",
            Self::Unused => "unused",
        };
        write!(f, "{name}")
    }
}

/// Indicator outputs the lock can pulse.
///
/// Declaration order is the write-phase priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    GreenLed,
    RedLed,
    Buzzer,
}

impl Indicator {
    /// Indicators in write priority order.
    pub const BY_PRIORITY: [Indicator; 3] =
        [Indicator::GreenLed, Indicator::RedLed, Indicator::Buzzer];

    #[must_use]
    pub fn address(&self) -> LogicalAddress {
        match self {
            Self::GreenLed => LogicalAddress::GreenLed,
            Self::RedLed => LogicalAddress::RedLed,
            Self::Buzzer => LogicalAddress::Buzzer,
        }
    }
}

/// Half of a multiplexing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanPhase {
    /// Data lines are outputs driving an address.
    Write,
    /// Data lines are inputs sensing keypad columns.
    Read,
}

impl ScanPhase {
    #[must_use]
    pub fn next(&self) -> Self {
        match self {
            Self::Write => Self::Read,
            Self::Read => Self::Write,
        }
    }
}
