//! Hardware abstraction boundary for the timer/capture unit
//!
//! Register access lives in the board support code behind these traits. The
//! decoders only ever see a counter they can read, the compare channel they
//! were leased, and the edge input they listen on. The sensor data line is an
//! [`embedded_hal::digital::OutputPin`] in open-drain mode: `set_low` drives
//! the line, `set_high` releases it to the pull-up.

use serde::{Deserialize, Serialize};

/// Raw value of the free-running counter
pub type Tick = u16;

/// Signal edge that triggers the next capture interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl Edge {
    /// The opposite edge
    pub const fn toggled(self) -> Self {
        match self {
            Self::Rising => Self::Falling,
            Self::Falling => Self::Rising,
        }
    }
}

/// Output polarity of the IR receiver module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Output follows the transmitted signal; a frame starts with a rising edge
    Normal,
    /// Output is active low; a frame starts with a falling edge
    Inverted,
}

impl Polarity {
    /// Edge that marks the start bit of a new frame
    pub const fn start_edge(self) -> Edge {
        match self {
            Self::Normal => Edge::Rising,
            Self::Inverted => Edge::Falling,
        }
    }
}

/// Read access to the free-running counter.
///
/// Implementations only read the counter register. [`crate::timebase::Timebase`]
/// wraps every read in a critical section, so a counter wider than the
/// platform's atomic register width is never observed torn.
pub trait Counter {
    fn read(&self) -> Tick;
}

/// One output-compare channel of the timer unit.
///
/// `arm` programs the compare register and enables its interrupt; the
/// interrupt fires once when the counter reaches `at`.
pub trait CompareChannel {
    fn arm(&mut self, at: Tick);
    fn disarm(&mut self);
}

/// An input that raises an interrupt on a configurable edge.
///
/// Used both for the timer's input-capture pin and for a plain external
/// interrupt line.
pub trait EdgeInput {
    fn set_edge(&mut self, edge: Edge);
    fn listen(&mut self);
    fn unlisten(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_toggle() {
        assert_eq!(Edge::Rising.toggled(), Edge::Falling);
        assert_eq!(Edge::Falling.toggled().toggled(), Edge::Falling);
    }

    #[test]
    fn test_polarity_start_edge() {
        assert_eq!(Polarity::Normal.start_edge(), Edge::Rising);
        assert_eq!(Polarity::Inverted.start_edge(), Edge::Falling);
    }
}
