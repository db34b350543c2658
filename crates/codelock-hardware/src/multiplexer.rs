//! Keypad scanner and indicator multiplexer.
//!
//! Three data lines, a strobe line and a sense line address eight logical
//! lines: four keypad rows, the green and red LEDs, the buzzer and a neutral
//! release address. The [`IoMultiplexer`] alternates two phases over them:
//!
//! ```text
//!   write phase                         read phase
//!   ───────────                         ──────────
//!   drain indicator commands            (skipped after an indicator write)
//!   pick address: green > red >         data lines → input, sense high
//!                 buzzer > row cursor   sample columns, sense low
//!   data lines → output, drive bits     decode (row, column) → Digit
//!   strobe high, settle                 publish once per press
//!   strobe low (latch), settle          advance row cursor
//! ```
//!
//! Indicator flashes are requested through a cloneable [`IndicatorHandle`]
//! and applied in the next write phase.

use crate::{
    HardwareError, Result,
    traits::{GpioLine, LineBus},
};
use codelock_core::{
    Digit, EventBus, Indicator, LogicalAddress, ScanPhase, ScannerConfig,
    constants::{KEYPAD_COLUMNS, KEYPAD_ROWS, PULSE_CYCLES},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

/// Outstanding write cycles per indicator.
///
/// A count of 2 asserts the indicator address, a count of 1 latches the
/// neutral address to release it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingPulses([u8; 3]);

impl PendingPulses {
    fn slot(indicator: Indicator) -> usize {
        match indicator {
            Indicator::GreenLed => 0,
            Indicator::RedLed => 1,
            Indicator::Buzzer => 2,
        }
    }

    /// Request a flash.
    ///
    /// A request while the assert cycle is still pending is absorbed; a
    /// request during the release cycle asserts again.
    pub fn request(&mut self, indicator: Indicator) {
        self.0[Self::slot(indicator)] = PULSE_CYCLES;
    }

    #[must_use]
    pub fn get(&self, indicator: Indicator) -> u8 {
        self.0[Self::slot(indicator)]
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.0.iter().all(|count| *count == 0)
    }

    /// Address to latch for the highest-priority pending indicator, consuming one cycle.
    pub fn take_next(&mut self) -> Option<LogicalAddress> {
        Indicator::BY_PRIORITY.into_iter().find_map(|indicator| {
            let count = &mut self.0[Self::slot(indicator)];
            if *count == 0 {
                return None;
            }
            let address = if *count == PULSE_CYCLES {
                indicator.address()
            } else {
                LogicalAddress::Unused
            };
            *count -= 1;
            Some(address)
        })
    }
}

/// Fire-and-forget indicator commands for a running multiplexer.
///
/// # Examples
///
/// ```
/// use codelock_hardware::IndicatorHandle;
/// use codelock_core::Indicator;
///
/// let (indicators, mut commands) = IndicatorHandle::detached();
/// indicators.flash_green();
/// assert_eq!(commands.try_recv().ok(), Some(Indicator::GreenLed));
/// ```
#[derive(Debug, Clone)]
pub struct IndicatorHandle {
    tx: mpsc::UnboundedSender<Indicator>,
}

impl IndicatorHandle {
    /// A handle connected to a bare receiver instead of a multiplexer.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<Indicator>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn flash_green(&self) {
        self.send(Indicator::GreenLed);
    }

    pub fn flash_red(&self) {
        self.send(Indicator::RedLed);
    }

    pub fn beep(&self) {
        self.send(Indicator::Buzzer);
    }

    pub fn send(&self, indicator: Indicator) {
        if self.tx.send(indicator).is_err() {
            debug!(?indicator, "Scanner stopped, indicator command dropped");
        }
    }
}

/// Scanner driving a [`LineBus`].
///
/// # Examples
///
/// ```
/// use codelock_core::ScannerConfig;
/// use codelock_hardware::{IoMultiplexer, mock::MockBoard};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> codelock_hardware::Result<()> {
/// let (bus, board) = MockBoard::new(false);
/// let config = ScannerConfig { settle_ms: 0, ..ScannerConfig::default() };
/// let mut scanner = IoMultiplexer::new(bus, config)?;
///
/// board.press(1, 1)?;
/// let mut decoded = None;
/// for _ in 0..4 {
///     decoded = decoded.or(scanner.cycle().await?);
/// }
/// assert_eq!(decoded.map(|d| d.as_char()), Some('5'));
/// # Ok(())
/// # }
/// ```
pub struct IoMultiplexer<L> {
    bus: LineBus<L>,
    config: ScannerConfig,
    phase: ScanPhase,
    row_cursor: usize,
    last_written: Option<LogicalAddress>,
    digit_down: bool,
    idle_reads: u8,
    pending: PendingPulses,
    commands_tx: mpsc::UnboundedSender<Indicator>,
    commands: mpsc::UnboundedReceiver<Indicator>,
    digits: Arc<EventBus<Digit>>,
}

impl<L: GpioLine> IoMultiplexer<L> {
    /// Take ownership of the lines and drive strobe and sense low.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid `config`, or the first line error.
    pub fn new(mut bus: LineBus<L>, config: ScannerConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| HardwareError::configuration(e.to_string()))?;

        bus.strobe.set_output()?;
        bus.strobe.set_low()?;
        bus.sense.set_output()?;
        bus.sense.set_low()?;

        let (commands_tx, commands) = mpsc::unbounded_channel();
        Ok(Self {
            bus,
            config,
            phase: ScanPhase::Write,
            row_cursor: 0,
            last_written: None,
            digit_down: false,
            idle_reads: 0,
            pending: PendingPulses::default(),
            commands_tx,
            commands,
            digits: Arc::new(EventBus::new()),
        })
    }

    pub fn indicator_handle(&self) -> IndicatorHandle {
        IndicatorHandle {
            tx: self.commands_tx.clone(),
        }
    }

    /// Channel on which every decoded digit is published.
    pub fn digits(&self) -> Arc<EventBus<Digit>> {
        Arc::clone(&self.digits)
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn row_cursor(&self) -> usize {
        self.row_cursor
    }

    pub fn is_digit_down(&self) -> bool {
        self.digit_down
    }

    pub fn pending(&self) -> PendingPulses {
        self.pending
    }

    /// Run the current phase, returning a digit if the read phase decoded one.
    pub async fn step(&mut self) -> Result<Option<Digit>> {
        match self.phase {
            ScanPhase::Write => self.write_phase().await.map(|_| None),
            ScanPhase::Read => self.read_phase().await,
        }
    }

    /// Run one write phase followed by one read phase.
    pub async fn cycle(&mut self) -> Result<Option<Digit>> {
        if self.phase == ScanPhase::Read {
            self.read_phase().await?;
        }
        self.write_phase().await?;
        self.read_phase().await
    }

    /// Latch the next address and return it.
    pub async fn write_phase(&mut self) -> Result<LogicalAddress> {
        while let Ok(indicator) = self.commands.try_recv() {
            trace!(?indicator, "Indicator flash requested");
            self.pending.request(indicator);
        }

        let address = match self.pending.take_next() {
            Some(address) => address,
            None => LogicalAddress::row(self.row_cursor)?,
        };

        self.bus.sense.set_low()?;
        for (line, bit) in self.bus.data.iter_mut().zip(address.to_bits()) {
            line.set_output()?;
            line.set_level(bit)?;
        }

        self.bus.strobe.set_high()?;
        settle(self.config.settle()).await;
        self.bus.strobe.set_low()?;
        settle(self.config.settle()).await;

        trace!(%address, "Address latched");
        self.last_written = Some(address);
        self.phase = ScanPhase::Read;
        Ok(address)
    }

    /// Sense the keypad row latched by the preceding write.
    pub async fn read_phase(&mut self) -> Result<Option<Digit>> {
        self.phase = ScanPhase::Write;
        let Some(row) = self.last_written.and_then(|address| address.row_index()) else {
            return Ok(None);
        };

        let columns = self.sample_columns().await?;
        let active = columns
            .iter()
            .position(|level| *level != self.config.idle_level);

        if self.digit_down {
            if active.is_some() {
                self.idle_reads = 0;
            } else {
                self.idle_reads = self.idle_reads.saturating_add(1);
                if self.idle_reads >= self.config.release_samples {
                    debug!(row, "Key released");
                    self.digit_down = false;
                    self.idle_reads = 0;
                    self.advance_row();
                }
            }
            return Ok(None);
        }

        match active {
            Some(column) => {
                let digit = Digit::from_position(row, column)?;
                debug!(%digit, row, column, "Key decoded");
                self.digit_down = true;
                self.idle_reads = 0;
                self.digits.publish(&digit)?;
                Ok(Some(digit))
            }
            None => {
                self.advance_row();
                Ok(None)
            }
        }
    }

    /// Scan until cancelled or a line fails.
    ///
    /// Returns `Ok(())` on cancellation. On a fault the error is logged and
    /// returned; the loop does not restart itself.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        info!(settle_ms = self.config.settle_ms, "Keypad scanner started");

        while !cancel.is_cancelled() {
            if let Err(e) = self.cycle().await {
                error!(error = %e, "Keypad scanner terminated");
                return Err(e);
            }
            if self.config.settle_ms == 0 {
                tokio::task::yield_now().await;
            }
        }

        if let Err(e) = self.park().await {
            error!(error = %e, "Keypad scanner failed to park lines");
            return Err(e);
        }
        info!("Keypad scanner stopped");
        Ok(())
    }

    /// Latch the neutral address and release the data lines.
    async fn park(&mut self) -> Result<()> {
        self.pending = PendingPulses::default();
        self.bus.sense.set_low()?;
        for (line, bit) in self.bus.data.iter_mut().zip(LogicalAddress::Unused.to_bits()) {
            line.set_output()?;
            line.set_level(bit)?;
        }
        self.bus.strobe.set_high()?;
        settle(self.config.settle()).await;
        self.bus.strobe.set_low()?;
        for line in &mut self.bus.data {
            line.set_input()?;
        }
        self.last_written = Some(LogicalAddress::Unused);
        Ok(())
    }

    async fn sample_columns(&mut self) -> Result<[bool; KEYPAD_COLUMNS]> {
        for line in &mut self.bus.data {
            line.set_input()?;
        }
        self.bus.sense.set_high()?;
        settle(self.config.settle()).await;

        let mut levels = [self.config.idle_level; KEYPAD_COLUMNS];
        for (level, line) in levels.iter_mut().zip(self.bus.data.iter_mut()) {
            *level = line.sample_level()?;
        }

        self.bus.sense.set_low()?;
        Ok(levels)
    }

    fn advance_row(&mut self) {
        self.row_cursor = (self.row_cursor + 1) % KEYPAD_ROWS;
    }

}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

impl<L> std::fmt::Debug for IoMultiplexer<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoMultiplexer")
            .field("phase", &self.phase)
            .field("row_cursor", &self.row_cursor)
            .field("digit_down", &self.digit_down)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}
