//! Severity color scale
//!
//! Maps a `(value, max)` pair onto an HSL hue running from green (120°, healthy)
//! to red (0°, critical). Ratios outside `[0, 1]` are not clamped: the hue keeps
//! extrapolating linearly, so overshoot renders past red and negative values
//! render past green.

use std::fmt;

/// Full scale for CPU load, in percent
pub const CPU_MAX: f64 = 100.0;
/// Full scale for CPU temperature, in °C
pub const TEMP_MAX_CELSIUS: f64 = 85.0;

pub const SATURATION_PERCENT: u8 = 70;
pub const LIGHTNESS_PERCENT: u8 = 50;

/// HSL color token produced by [`color_for`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeverityColor {
    hue: i64,
}

impl SeverityColor {
    /// Hue in degrees; may fall outside `0..=120` for out-of-range ratios
    pub fn hue(&self) -> i64 {
        self.hue
    }
}

impl fmt::Display for SeverityColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, SATURATION_PERCENT, LIGHTNESS_PERCENT
        )
    }
}

/// Pure and total: never panics, same inputs give the same color.
///
/// A zero `max` or non-finite input still produces a color: the `as` cast
/// saturates infinities to the `i64` bounds and maps NaN to 0.
pub fn color_for(value: f64, max: f64) -> SeverityColor {
    let ratio = value / max;
    let hue = ((1.0 - ratio) * 120.0).round();
    SeverityColor { hue: hue as i64 }
}
