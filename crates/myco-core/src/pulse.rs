//! Pulse-width classification against tolerance windows

use crate::timebase::Duration;

/// Result of comparing a measured pulse against a protocol's two nominal widths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseClass {
    Short,
    Long,
    Invalid,
}

/// Inclusive range of acceptable pulse widths in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    min_us: u32,
    max_us: u32,
}

impl Window {
    /// `nominal ± tolerance`, clamped at zero
    pub const fn around(nominal_us: u32, tolerance_us: u32) -> Self {
        Self {
            min_us: nominal_us.saturating_sub(tolerance_us),
            max_us: nominal_us + tolerance_us,
        }
    }

    /// Anything from zero up to `max_us`
    pub const fn up_to(max_us: u32) -> Self {
        Self { min_us: 0, max_us }
    }

    pub const fn contains(self, width: Duration) -> bool {
        let us = width.as_micros();
        us >= self.min_us && us <= self.max_us
    }

    pub const fn min_us(self) -> u32 {
        self.min_us
    }

    pub const fn max_us(self) -> u32 {
        self.max_us
    }
}

/// Classifies widths as short, long or neither.
///
/// The two windows must not overlap; a width inside both would be ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseClassifier {
    short: Window,
    long: Window,
}

impl PulseClassifier {
    pub const fn new(short: Window, long: Window) -> Self {
        assert!(short.max_us < long.min_us, "short and long windows overlap");
        Self { short, long }
    }

    pub const fn classify(&self, width: Duration) -> PulseClass {
        if self.short.contains(width) {
            PulseClass::Short
        } else if self.long.contains(width) {
            PulseClass::Long
        } else {
            PulseClass::Invalid
        }
    }
}
