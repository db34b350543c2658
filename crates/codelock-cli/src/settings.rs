//! Configuration file loading.
//!
//! ```toml
//! [lock]
//! max_attempts = 3
//! access_window = { begin = "07:00:00", end = "19:00:00" }
//!
//! [scanner]
//! settle_ms = 5
//!
//! [gpio]
//! data_pins = [17, 27, 22]
//! progress_pins = []
//! ```
//!
//! Every table and key is optional.

use anyhow::{Context, Result};
use codelock_core::{LockConfig, ScannerConfig};
use codelock_hardware::GpioConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub lock: LockConfig,
    pub scanner: ScannerConfig,
    pub gpio: GpioConfig,
}

impl Settings {
    /// Read and validate `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::parse(&text).with_context(|| format!("in config {}", path.display()))?
            }
            None => Self::default(),
        };
        Ok(settings)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.lock.validate().context("[lock]")?;
        self.scanner.validate().context("[scanner]")?;
        self.gpio.validate().context("[gpio]")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Settings::parse("").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_tables() {
        let settings = Settings::parse(
            r#"
            [lock]
            max_attempts = 3
            immediate_reject = true
            access_window = { begin = "07:00:00", end = "19:00:00" }

            [scanner]
            settle_ms = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.lock.max_attempts, 3);
        assert!(settings.lock.immediate_reject);
        assert_eq!(settings.lock.lockout_secs, 60);
        assert!(settings.lock.access_window.is_some());
        assert_eq!(settings.scanner.settle_ms, 5);
        assert_eq!(settings.gpio, GpioConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Settings::parse("[lock]\nmax_attempts = 0\n").is_err());
        assert!(Settings::parse("[scanner]\nrelease_samples = 0\n").is_err());
        assert!(Settings::parse("[gpio]\nstrobe_pin = 24\nsense_pin = 24\n").is_err());
        assert!(Settings::parse("[door]\nopen = true\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codelock.toml");
        fs::write(&path, "[lock]\ndefault_password = \"9#9\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.lock.default_password, "9#9");
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }
}
