use std::fmt;

use serde::{Deserialize, Serialize};

/// Dispatch priority. Higher values are handed to workers first and have
/// their deferred handlers drained first.
///
/// Any `u32` is valid; [`Priority::LOW`], [`Priority::MEDIUM`] and
/// [`Priority::HIGH`] are the named points of the range.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(u32);

impl Priority {
    pub const LOW: Self = Self(0);
    pub const MEDIUM: Self = Self(0x7FFF_FFFF);
    pub const HIGH: Self = Self(u32::MAX);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Priority {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::LOW => f.write_str("low"),
            Self::MEDIUM => f.write_str("medium"),
            Self::HIGH => f.write_str("high"),
            Self(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_levels_are_ordered() {
        assert!(Priority::LOW < Priority::MEDIUM);
        assert!(Priority::MEDIUM < Priority::HIGH);
        assert!(Priority::new(10) > Priority::LOW);
    }

    #[test]
    fn default_is_low() {
        assert_eq!(Priority::default(), Priority::LOW);
    }

    #[test]
    fn display_names_known_levels() {
        assert_eq!(Priority::HIGH.to_string(), "high");
        assert_eq!(Priority::from(42).to_string(), "42");
    }
}
