//! Line and indicator capability traits.
//!
//! This module defines the contract between the scanner and the physical
//! pins. A [`GpioLine`] is one pin that can be switched between input and
//! output; a [`LineBus`] groups the five lines the multiplexer needs.
//!
//! Pin access is synchronous: each call completes a single register or file
//! write, and the scan loop inserts its own settle delays between edges.

use crate::error::Result;

/// One direction-switchable general-purpose I/O line.
///
/// # Examples
///
/// ```
/// use codelock_hardware::traits::GpioLine;
/// use codelock_hardware::Result;
///
/// fn pulse<L: GpioLine>(line: &mut L) -> Result<()> {
///     line.set_output()?;
///     line.set_high()?;
///     line.set_low()
/// }
/// ```
pub trait GpioLine: Send {
    /// Switch the line to input (high impedance, sampled with [`sample_level`](Self::sample_level)).
    fn set_input(&mut self) -> Result<()>;

    /// Switch the line to output.
    fn set_output(&mut self) -> Result<()>;

    /// Drive the line high. The line must be an output.
    fn set_high(&mut self) -> Result<()>;

    /// Drive the line low. The line must be an output.
    fn set_low(&mut self) -> Result<()>;

    /// Read the line level. The line must be an input.
    fn sample_level(&mut self) -> Result<bool>;

    /// Drive the line to `high`.
    fn set_level(&mut self, high: bool) -> Result<()> {
        if high { self.set_high() } else { self.set_low() }
    }
}

/// The five physical lines shared by the keypad and the indicators.
///
/// - `data`: address bits during a write phase, keypad columns during a read
///   phase; `data[0]` carries the least significant address bit
/// - `strobe`: latches the address on the data lines when pulsed
/// - `sense`: routes the keypad columns onto the data lines while high
#[derive(Debug)]
pub struct LineBus<L> {
    pub data: [L; 3],
    pub strobe: L,
    pub sense: L,
}

impl<L> LineBus<L> {
    pub fn new(data: [L; 3], strobe: L, sense: L) -> Self {
        Self {
            data,
            strobe,
            sense,
        }
    }

    /// Wrap every line, e.g. into an enum dispatch type.
    pub fn map<M>(self, mut f: impl FnMut(L) -> M) -> LineBus<M> {
        let [d0, d1, d2] = self.data;
        LineBus {
            data: [f(d0), f(d1), f(d2)],
            strobe: f(self.strobe),
            sense: f(self.sense),
        }
    }
}

/// Optional bar of LEDs showing how much of the digit timeout has passed.
pub trait ProgressBar: Send {
    /// Show `fraction` (clamped to 0.0-1.0) of the bar lit.
    fn show(&mut self, fraction: f32) -> Result<()>;

    /// Turn every segment off.
    fn clear(&mut self) -> Result<()> {
        self.show(0.0)
    }
}

/// A progress bar made of individual LED lines.
///
/// `floor(fraction * n)` of the `n` LEDs are lit, starting from the first.
#[derive(Debug)]
pub struct LedBar<L> {
    leds: Vec<L>,
}

impl<L: GpioLine> LedBar<L> {
    /// Configure every LED line as an output and turn it off.
    ///
    /// # Errors
    /// Returns the first line error encountered.
    pub fn new(mut leds: Vec<L>) -> Result<Self> {
        for led in &mut leds {
            led.set_output()?;
            led.set_low()?;
        }
        Ok(Self { leds })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.leds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leds.is_empty()
    }
}

impl<L: GpioLine> ProgressBar for LedBar<L> {
    fn show(&mut self, fraction: f32) -> Result<()> {
        let fraction = fraction.clamp(0.0, 1.0);
        let lit = (fraction * self.leds.len() as f32).floor() as usize;
        for (index, led) in self.leds.iter_mut().enumerate() {
            led.set_level(index < lit)?;
        }
        Ok(())
    }
}
