//! Recording progress bar for tests.

use crate::{Result, traits::ProgressBar};
use std::sync::{Arc, Mutex, PoisonError};

/// Progress bar that records every fraction it is asked to show.
#[derive(Debug, Clone, Default)]
pub struct MockProgressBar {
    shown: Arc<Mutex<Vec<f32>>>,
}

impl MockProgressBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fraction shown so far, oldest first.
    pub fn history(&self) -> Vec<f32> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<f32> {
        self.history().last().copied()
    }
}

impl ProgressBar for MockProgressBar {
    fn show(&mut self, fraction: f32) -> Result<()> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(fraction.clamp(0.0, 1.0));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBoard, MockPin};
    use crate::traits::{LedBar, LineBus};

    #[test]
    fn test_records_clamped_values() {
        let mut bar = MockProgressBar::new();
        let observer = bar.clone();

        bar.show(0.25).unwrap();
        bar.show(1.5).unwrap();
        bar.clear().unwrap();

        assert_eq!(observer.history(), vec![0.25, 1.0, 0.0]);
        assert_eq!(observer.last(), Some(0.0));
    }

    #[test]
    fn test_led_bar_lights_floor_of_fraction() {
        let (bus, handle) = MockBoard::new(false);
        let LineBus { data, .. } = bus;
        let mut bar = LedBar::new(data.into_iter().collect()).unwrap();
        assert_eq!(bar.len(), 3);

        bar.show(0.7).unwrap();
        assert!(handle.level(MockPin::Data(0)));
        assert!(handle.level(MockPin::Data(1)));
        assert!(!handle.level(MockPin::Data(2)));

        bar.show(0.0).unwrap();
        assert!(!handle.level(MockPin::Data(0)));
    }
}
