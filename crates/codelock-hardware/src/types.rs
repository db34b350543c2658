//! Common types shared across line implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a general-purpose I/O line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineDirection {
    Input,
    Output,
}

impl LineDirection {
    /// Value written to a sysfs `direction` attribute.
    #[must_use]
    pub fn sysfs_value(&self) -> &'static str {
        match self {
            Self::Input => "in",
            Self::Output => "out",
        }
    }
}

impl fmt::Display for LineDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysfs_values() {
        assert_eq!(LineDirection::Input.sysfs_value(), "in");
        assert_eq!(LineDirection::Output.sysfs_value(), "out");
    }

    #[test]
    fn test_display() {
        assert_eq!(LineDirection::Input.to_string(), "input");
        assert_eq!(LineDirection::Output.to_string(), "output");
    }
}
