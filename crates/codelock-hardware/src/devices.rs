//! Enum wrapper for line backend dispatch.
//!
//! The scanner is generic over [`GpioLine`]. [`AnyLine`] lets the binary pick
//! a backend at runtime (simulated board or sysfs) while the scanner is still
//! monomorphized over a single concrete type.
//!
//! # Examples
//!
//! ```
//! use codelock_hardware::devices::AnyLine;
//! use codelock_hardware::mock::MockBoard;
//!
//! let (bus, _board) = MockBoard::new(false);
//! let bus = bus.map(AnyLine::Mock);
//! # drop(bus);
//! ```

use crate::Result;
use crate::mock::MockLine;
use crate::sysfs::SysfsLine;
use crate::traits::GpioLine;

/// Any supported line backend.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyLine {
    /// Simulated board line for demos and tests.
    Mock(MockLine),

    /// Linux sysfs GPIO line.
    Sysfs(SysfsLine),
}

impl GpioLine for AnyLine {
    fn set_input(&mut self) -> Result<()> {
        match self {
            Self::Mock(line) => line.set_input(),
            Self::Sysfs(line) => line.set_input(),
        }
    }

    fn set_output(&mut self) -> Result<()> {
        match self {
            Self::Mock(line) => line.set_output(),
            Self::Sysfs(line) => line.set_output(),
        }
    }

    fn set_high(&mut self) -> Result<()> {
        match self {
            Self::Mock(line) => line.set_high(),
            Self::Sysfs(line) => line.set_high(),
        }
    }

    fn set_low(&mut self) -> Result<()> {
        match self {
            Self::Mock(line) => line.set_low(),
            Self::Sysfs(line) => line.set_low(),
        }
    }

    fn sample_level(&mut self) -> Result<bool> {
        match self {
            Self::Mock(line) => line.sample_level(),
            Self::Sysfs(line) => line.sample_level(),
        }
    }
}
