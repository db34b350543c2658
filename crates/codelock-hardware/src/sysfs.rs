//! Linux sysfs GPIO backend.
//!
//! Each line is exported through `<root>/export` and then driven through
//! `<root>/gpio<N>/direction` and `<root>/gpio<N>/value`. The root defaults
//! to `/sys/class/gpio` and is configurable so the backend can be exercised
//! against a plain directory.

use crate::{
    HardwareError, Result,
    traits::{GpioLine, LedBar, LineBus},
    types::LineDirection,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default sysfs GPIO class directory.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Pin assignment of the keypad board and the optional progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    /// Sysfs GPIO class directory.
    pub sysfs_root: PathBuf,

    /// Data lines D0, D1, D2; D0 carries the least significant address bit.
    pub data_pins: [u32; 3],

    pub strobe_pin: u32,

    pub sense_pin: u32,

    /// Progress bar LEDs, first lit first. Empty disables the bar.
    pub progress_pins: Vec<u32>,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from(SYSFS_GPIO_ROOT),
            data_pins: [17, 27, 22],
            strobe_pin: 23,
            sense_pin: 24,
            progress_pins: vec![5, 6, 12, 13, 16, 19, 20, 26],
        }
    }
}

impl GpioConfig {
    /// # Errors
    /// Returns a configuration error if any pin is assigned twice.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let pins = self
            .data_pins
            .iter()
            .chain([&self.strobe_pin, &self.sense_pin])
            .chain(&self.progress_pins);
        for pin in pins {
            if !seen.insert(*pin) {
                return Err(HardwareError::configuration(format!(
                    "GPIO {pin} is assigned more than once"
                )));
            }
        }
        Ok(())
    }

    /// Export and open the five scanner lines.
    pub fn open_bus(&self) -> Result<LineBus<SysfsLine>> {
        self.validate()?;
        let [d0, d1, d2] = self.data_pins;
        Ok(LineBus::new(
            [self.open(d0)?, self.open(d1)?, self.open(d2)?],
            self.open(self.strobe_pin)?,
            self.open(self.sense_pin)?,
        ))
    }

    /// Export and open the progress bar, or `None` if no pins are configured.
    pub fn open_progress_bar(&self) -> Result<Option<LedBar<SysfsLine>>> {
        if self.progress_pins.is_empty() {
            return Ok(None);
        }
        let leds = self
            .progress_pins
            .iter()
            .map(|pin| self.open(*pin))
            .collect::<Result<Vec<_>>>()?;
        LedBar::new(leds).map(Some)
    }

    fn open(&self, pin: u32) -> Result<SysfsLine> {
        SysfsLine::export_at(&self.sysfs_root, pin)
    }
}

/// One exported sysfs GPIO line.
#[derive(Debug)]
pub struct SysfsLine {
    pin: u32,
    root: PathBuf,
    direction: Option<LineDirection>,
}

impl SysfsLine {
    /// Export `pin` under [`SYSFS_GPIO_ROOT`].
    pub fn export(pin: u32) -> Result<Self> {
        Self::export_at(SYSFS_GPIO_ROOT, pin)
    }

    /// Export `pin` under `root`, reusing an existing export.
    ///
    /// # Errors
    /// Returns `Disconnected` if the GPIO class directory is missing, or a
    /// line fault if the export request fails.
    pub fn export_at(root: impl AsRef<Path>, pin: u32) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(HardwareError::disconnected(root.display().to_string()));
        }

        let line = Self {
            pin,
            root,
            direction: None,
        };
        if !line.dir().exists() {
            fs::write(line.root.join("export"), pin.to_string())
                .map_err(|e| line.fault(format!("export failed: {e}")))?;
            debug!(pin, "GPIO exported");
        }
        Ok(line)
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    fn dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    fn fault(&self, message: impl Into<String>) -> HardwareError {
        HardwareError::line_fault(format!("gpio{}", self.pin), message)
    }

    fn write_attr(&self, attr: &str, value: &str) -> Result<()> {
        fs::write(self.dir().join(attr), value)
            .map_err(|e| self.fault(format!("write {attr}={value}: {e}")))
    }

    fn apply_direction(&mut self, direction: LineDirection) -> Result<()> {
        if self.direction == Some(direction) {
            return Ok(());
        }
        self.write_attr("direction", direction.sysfs_value())?;
        self.direction = Some(direction);
        Ok(())
    }
}

impl GpioLine for SysfsLine {
    fn set_input(&mut self) -> Result<()> {
        self.apply_direction(LineDirection::Input)
    }

    fn set_output(&mut self) -> Result<()> {
        self.apply_direction(LineDirection::Output)
    }

    fn set_high(&mut self) -> Result<()> {
        self.write_attr("value", "1")
    }

    fn set_low(&mut self) -> Result<()> {
        self.write_attr("value", "0")
    }

    fn sample_level(&mut self) -> Result<bool> {
        let raw = fs::read_to_string(self.dir().join("value"))
            .map_err(|e| self.fault(format!("read value: {e}")))?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(self.fault(format!("unexpected value {other:?}"))),
        }
    }
}

impl Drop for SysfsLine {
    fn drop(&mut self) {
        match fs::write(self.root.join("unexport"), self.pin.to_string()) {
            Ok(()) => debug!(pin = self.pin, "GPIO unexported"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(pin = self.pin, error = %e, "Failed to unexport GPIO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ProgressBar;
    use tempfile::TempDir;

    fn fake_sysfs(pins: &[u32]) -> TempDir {
        let root = tempfile::tempdir().unwrap();
        for pin in pins {
            let dir = root.path().join(format!("gpio{pin}"));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("direction"), "in").unwrap();
            fs::write(dir.join("value"), "0").unwrap();
        }
        root
    }

    fn read_attr(root: &TempDir, pin: u32, attr: &str) -> String {
        fs::read_to_string(root.path().join(format!("gpio{pin}")).join(attr)).unwrap()
    }

    #[test]
    fn test_missing_root_is_disconnected() {
        let error = SysfsLine::export_at("/nonexistent/gpio/root", 4).unwrap_err();
        assert!(matches!(error, HardwareError::Disconnected { .. }));
    }

    #[test]
    fn test_export_requested_when_absent() {
        let root = fake_sysfs(&[]);
        let line = SysfsLine::export_at(root.path(), 21).unwrap();
        assert_eq!(line.pin(), 21);
        assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "21");
    }

    #[test]
    fn test_drive_and_sample() {
        let root = fake_sysfs(&[7]);
        let mut line = SysfsLine::export_at(root.path(), 7).unwrap();

        line.set_output().unwrap();
        line.set_high().unwrap();
        assert_eq!(read_attr(&root, 7, "direction"), "out");
        assert_eq!(read_attr(&root, 7, "value"), "1");

        line.set_input().unwrap();
        fs::write(root.path().join("gpio7/value"), "0\n").unwrap();
        assert!(!line.sample_level().unwrap());
        assert_eq!(read_attr(&root, 7, "direction"), "in");
    }

    #[test]
    fn test_garbage_value_is_line_fault() {
        let root = fake_sysfs(&[3]);
        let mut line = SysfsLine::export_at(root.path(), 3).unwrap();
        fs::write(root.path().join("gpio3/value"), "x").unwrap();
        assert!(matches!(
            line.sample_level(),
            Err(HardwareError::LineFault { .. })
        ));
    }

    #[test]
    fn test_unexport_on_drop() {
        let root = fake_sysfs(&[9]);
        drop(SysfsLine::export_at(root.path(), 9).unwrap());
        assert_eq!(fs::read_to_string(root.path().join("unexport")).unwrap(), "9");
    }

    #[test]
    fn test_duplicate_pin_rejected() {
        let config = GpioConfig {
            strobe_pin: 17,
            ..GpioConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(HardwareError::ConfigurationError { .. })
        ));
        assert!(GpioConfig::default().validate().is_ok());
    }

    #[test]
    fn test_open_bus_and_progress_bar() {
        let root = fake_sysfs(&[1, 2, 3, 4, 5, 10, 11]);
        let config = GpioConfig {
            sysfs_root: root.path().to_path_buf(),
            data_pins: [1, 2, 3],
            strobe_pin: 4,
            sense_pin: 5,
            progress_pins: vec![10, 11],
        };

        let bus = config.open_bus().unwrap();
        assert_eq!(bus.strobe.pin(), 4);

        let mut bar = config.open_progress_bar().unwrap().unwrap();
        bar.show(0.5).unwrap();
        assert_eq!(read_attr(&root, 10, "value"), "1");
        assert_eq!(read_attr(&root, 11, "value"), "0");
    }

    #[test]
    fn test_no_progress_pins_means_no_bar() {
        let config = GpioConfig {
            progress_pins: Vec::new(),
            ..GpioConfig::default()
        };
        assert!(config.open_progress_bar().unwrap().is_none());
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config: GpioConfig = toml::from_str("strobe_pin = 8\nprogress_pins = []").unwrap();
        assert_eq!(config.strobe_pin, 8);
        assert_eq!(config.data_pins, [17, 27, 22]);
        assert!(config.progress_pins.is_empty());
    }
}
