//! Biphase (RC-5) infrared remote-control decoding
//!
//! Every bit is two half-bit periods of 889 µs with a transition in the
//! middle: `1` is low→high, `0` is high→low (as transmitted, before any
//! receiver inversion). Equal neighbouring bits add a transition on the bit
//! boundary, so the time between edges is always one half-bit (short) or one
//! full bit (long). Decoding walks a four-state table on those two widths.

mod decoder;
mod message;

use crate::pulse::{PulseClass, PulseClassifier, Window};

pub use decoder::{EDGE_TIMEOUT, RemoteDecoder};
pub use message::{MESSAGE_BITS, RemoteMessage};

pub const HALF_BIT_US: u32 = 889;
pub const FULL_BIT_US: u32 = 2 * HALF_BIT_US;
pub const REMOTE_TOLERANCE_US: u32 = HALF_BIT_US / 4;

pub(crate) const PULSE: PulseClassifier = PulseClassifier::new(
    Window::around(HALF_BIT_US, REMOTE_TOLERANCE_US),
    Window::around(FULL_BIT_US, REMOTE_TOLERANCE_US),
);

/// Position within the bit stream after the last accepted edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    StartZero,
    MidZero,
    StartOne,
    MidOne,
    /// Frame is corrupt; edges are ignored until the line goes quiet
    Error,
}

impl Phase {
    /// Next phase after a pulse of the given class
    pub const fn transition(self, pulse: PulseClass) -> Self {
        match (pulse, self) {
            (PulseClass::Short, Self::StartZero) => Self::MidZero,
            (PulseClass::Short, Self::MidZero) => Self::StartZero,
            (PulseClass::Short, Self::StartOne) => Self::MidOne,
            (PulseClass::Short, Self::MidOne) => Self::StartOne,
            (PulseClass::Long, Self::MidZero) => Self::MidOne,
            (PulseClass::Long, Self::MidOne) => Self::MidZero,
            _ => Self::Error,
        }
    }

    /// Bit completed by entering this phase, if any
    pub const fn bit(self) -> Option<bool> {
        match self {
            Self::MidZero => Some(false),
            Self::MidOne => Some(true),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::StartZero => "start of 0",
            Self::MidZero => "middle of 0",
            Self::StartOne => "start of 1",
            Self::MidOne => "middle of 1",
            Self::Error => "error",
        }
    }
}

/// Receiver of decoded frames. Called from interrupt context, once per frame.
pub trait FrameSink {
    fn on_frame(&mut self, message: RemoteMessage);
}

impl<F: FnMut(RemoteMessage)> FrameSink for F {
    fn on_frame(&mut self, message: RemoteMessage) {
        self(message)
    }
}
