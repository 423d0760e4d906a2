//! Cell-backed stand-ins for the timer unit and signal lines
//!
//! Each mock writes its effects into a tap that the test (or the simulator)
//! keeps a reference to, so the hardware configuration a decoder leaves behind
//! can be inspected while the decoder still owns the mock.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::hal::{CompareChannel, Counter, Edge, EdgeInput, Tick};
use crate::timebase::Duration;

/// Counter whose value is set by the test
pub struct MockCounter {
    now: Cell<Tick>,
}

impl MockCounter {
    pub const fn new(start: Tick) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Moves the counter forward, wrapping like the hardware does.
    ///
    /// Assumes the default one-tick-per-microsecond clock configuration.
    pub fn advance(&self, by: Duration) -> Tick {
        let next = self.now.get().wrapping_add(by.as_micros() as Tick);
        self.now.set(next);
        next
    }
}

impl Counter for MockCounter {
    fn read(&self) -> Tick {
        self.now.get()
    }
}

/// Records the compare value a channel was last armed with
#[derive(Default)]
pub struct CompareTap {
    armed: Cell<Option<Tick>>,
    arm_count: Cell<u32>,
}

impl CompareTap {
    pub const fn new() -> Self {
        Self {
            armed: Cell::new(None),
            arm_count: Cell::new(0),
        }
    }

    pub fn armed_at(&self) -> Option<Tick> {
        self.armed.get()
    }

    /// Number of times the channel has been armed
    pub fn arm_count(&self) -> u32 {
        self.arm_count.get()
    }
}

pub struct MockCompare<'a> {
    tap: &'a CompareTap,
}

impl<'a> MockCompare<'a> {
    pub const fn new(tap: &'a CompareTap) -> Self {
        Self { tap }
    }
}

impl CompareChannel for MockCompare<'_> {
    fn arm(&mut self, at: Tick) {
        self.tap.armed.set(Some(at));
        self.tap.arm_count.set(self.tap.arm_count.get() + 1);
    }

    fn disarm(&mut self) {
        self.tap.armed.set(None);
    }
}

/// Records the edge configuration of an interrupt input
#[derive(Default)]
pub struct EdgeTap {
    edge: Cell<Option<Edge>>,
    listening: Cell<bool>,
}

impl EdgeTap {
    pub const fn new() -> Self {
        Self {
            edge: Cell::new(None),
            listening: Cell::new(false),
        }
    }

    pub fn edge(&self) -> Option<Edge> {
        self.edge.get()
    }

    pub fn is_listening(&self) -> bool {
        self.listening.get()
    }
}

pub struct MockEdgeInput<'a> {
    tap: &'a EdgeTap,
}

impl<'a> MockEdgeInput<'a> {
    pub const fn new(tap: &'a EdgeTap) -> Self {
        Self { tap }
    }
}

impl EdgeInput for MockEdgeInput<'_> {
    fn set_edge(&mut self, edge: Edge) {
        self.tap.edge.set(Some(edge));
    }

    fn listen(&mut self) {
        self.tap.listening.set(true);
    }

    fn unlisten(&mut self) {
        self.tap.listening.set(false);
    }
}

/// Records whether an open-drain line is being driven low
#[derive(Default)]
pub struct LineTap {
    driven_low: Cell<bool>,
    low_count: Cell<u32>,
}

impl LineTap {
    pub const fn new() -> Self {
        Self {
            driven_low: Cell::new(false),
            low_count: Cell::new(0),
        }
    }

    pub fn is_driven_low(&self) -> bool {
        self.driven_low.get()
    }

    /// Number of request pulses started on this line
    pub fn low_count(&self) -> u32 {
        self.low_count.get()
    }
}

pub struct MockLine<'a> {
    tap: &'a LineTap,
}

impl<'a> MockLine<'a> {
    pub const fn new(tap: &'a LineTap) -> Self {
        Self { tap }
    }
}

impl ErrorType for MockLine<'_> {
    type Error = Infallible;
}

impl OutputPin for MockLine<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.tap.driven_low.set(true);
        self.tap.low_count.set(self.tap.low_count.get() + 1);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.tap.driven_low.set(false);
        Ok(())
    }
}
