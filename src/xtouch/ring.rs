//! Encoder LED ring encoding

use serde::{Deserialize, Serialize};

/// How an encoder ring renders its value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// One LED at the value position
    #[default]
    SingleDot,
    /// LEDs from the center towards the value (pan, gain trims)
    BoostOrCut,
    /// LEDs from the left up to the value
    Wrap,
    /// LEDs spreading symmetrically from the center (width, Q)
    Spread,
}

impl DisplayMode {
    pub fn code(self) -> u8 {
        match self {
            Self::SingleDot => 0,
            Self::BoostOrCut => 1,
            Self::Wrap => 2,
            Self::Spread => 3,
        }
    }
}

/// Number of ring LEDs, not counting the center LED
pub const RING_POSITIONS: u8 = 11;

/// Ring payload `(center << 6) | (mode << 4) | position`
///
/// Position 0 turns the ring off, 1..=11 map the normalized value.
pub fn ring_payload(mode: DisplayMode, value: f64, center: bool) -> u8 {
    let position = 1 + (value.clamp(0.0, 1.0) * (RING_POSITIONS - 1) as f64).round() as u8;
    ((center as u8) << 6) | (mode.code() << 4) | position
}

/// Payload for an encoder without assignment
pub const RING_OFF: u8 = 0x00;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_payload() {
        assert_eq!(ring_payload(DisplayMode::SingleDot, 0.0, false), 0x01);
        assert_eq!(ring_payload(DisplayMode::SingleDot, 1.0, false), 0x0B);
        assert_eq!(ring_payload(DisplayMode::BoostOrCut, 0.5, false), 0x16);
        assert_eq!(ring_payload(DisplayMode::Wrap, 1.0, true), 0x40 | 0x20 | 0x0B);
        assert_eq!(ring_payload(DisplayMode::Spread, 0.0, false), 0x31);
    }

    #[test]
    fn test_display_mode_from_yaml() {
        let mode: DisplayMode = serde_yaml::from_str("boost_or_cut").unwrap();
        assert_eq!(mode, DisplayMode::BoostOrCut);
    }
}
