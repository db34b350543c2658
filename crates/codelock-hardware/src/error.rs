//! Error types for line and scanner operations.
//!
//! This module defines the errors raised while driving or sampling the
//! physical lines, and by the scan loop that multiplexes them.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while driving the keypad and indicator hardware.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Line or device is not available.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// A single line rejected an operation.
    #[error("Line fault on {line}: {message}")]
    LineFault { line: String, message: String },

    /// The scan loop reached an inconsistent state.
    #[error("Scan fault: {message}")]
    ScanFault { message: String },

    /// Hardware configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Failure from the shared keypad types or the event bus.
    #[error(transparent)]
    Core(#[from] codelock_core::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new line fault.
    pub fn line_fault(line: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LineFault {
            line: line.into(),
            message: message.into(),
        }
    }

    /// Create a new scan fault.
    pub fn scan_fault(message: impl Into<String>) -> Self {
        Self::ScanFault {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_fault_error() {
        let error = HardwareError::line_fault("D1", "write to input line");
        assert!(matches!(error, HardwareError::LineFault { .. }));
        assert_eq!(error.to_string(), "Line fault on D1: write to input line");
    }

    #[test]
    fn test_disconnected_error() {
        let error = HardwareError::disconnected("gpio17");
        assert_eq!(error.to_string(), "Device disconnected: gpio17");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let error = HardwareError::from(codelock_core::Error::InvalidAddress(9));
        assert_eq!(error.to_string(), "Invalid logical address: 9 (expected 0-7)");
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            HardwareError::scan_fault("row cursor out of range"),
            HardwareError::configuration("duplicate pin"),
            HardwareError::disconnected("keypad"),
        ];

        for error in errors {
            let _ = format!("{}", error);
            let _ = format!("{:?}", error);
        }
    }
}
