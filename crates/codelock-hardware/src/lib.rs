//! Hardware layer of the keypad code lock.
//!
//! This crate turns five physical lines into eight addressable logical lines
//! and uses the same lines, direction-switched, to sense the keypad.
//!
//! # Line abstraction
//!
//! The [`GpioLine`] trait is the only contact with physical pins. Two
//! backends implement it:
//!
//! - [`sysfs::SysfsLine`]: Linux `/sys/class/gpio` lines
//! - [`mock::MockLine`]: lines of a simulated latch and keypad board
//!
//! [`devices::AnyLine`] selects between them at runtime.
//!
//! # Scanner
//!
//! [`IoMultiplexer`] alternates write and read phases over a [`LineBus`]:
//!
//! ```no_run
//! use codelock_core::{Digit, ScannerConfig};
//! use codelock_hardware::{IoMultiplexer, ScannerHandle, mock::MockBoard};
//!
//! # async fn example() -> codelock_hardware::Result<()> {
//! let (bus, board) = MockBoard::new(false);
//! let scanner = IoMultiplexer::new(bus, ScannerConfig::default())?;
//!
//! scanner.digits().subscribe(|digit: &Digit| {
//!     println!("pressed {digit}");
//!     Ok(())
//! });
//! let indicators = scanner.indicator_handle();
//!
//! let handle = ScannerHandle::start(scanner);
//! board.press(0, 0)?;
//! indicators.beep();
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with [`HardwareError`].
//! A line error inside the scan loop ends the loop; it is logged and handed
//! back through [`ScannerHandle`].

pub mod devices;
pub mod error;
pub mod manager;
pub mod mock;
pub mod multiplexer;
pub mod sysfs;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use manager::{ScanTermination, ScannerHandle};
pub use multiplexer::{IndicatorHandle, IoMultiplexer, PendingPulses};
pub use sysfs::GpioConfig;
pub use traits::{GpioLine, LedBar, LineBus, ProgressBar};
pub use types::LineDirection;
