//! Single-wire temperature/humidity sensor (DHT22 family)
//!
//! The host holds the data line low for at least 1 ms, then releases it. The
//! sensor answers with a short delay, an 80 µs low/80 µs high acknowledge,
//! and 40 data bits. Each bit is a ~50 µs low followed by a high pulse whose
//! width carries the value: ~27 µs for `0`, ~70 µs for `1`.
//!
//! ```text
//!  host  |‾‾‾|________ ≥1ms ________|‾‾‾‾
//!  sensor                               |‾20-40µs‾|__80µs__|‾‾80µs‾‾|__50__|‾27/70‾|__50__| ...
//! ```

mod decoder;
pub mod frame;

use serde::{Deserialize, Serialize};

use crate::error::{AcquireError, DecodeFault};
use crate::hal::Edge;

pub use decoder::{FRAME_GUARD, REQUEST_HOLD, SENSOR_TOLERANCE_US, SensorDecoder};

/// Decoder state. Exactly one is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Idle,
    /// Host is holding the line low
    Requesting,
    /// Line released, waiting for the sensor to pull it low
    AwaitAck,
    /// Sensor's 80 µs acknowledge low
    AckPhase,
    /// Sensor's 80 µs high before the first bit
    AwaitBitStart,
    /// 50 µs low that starts every bit
    AwaitBit,
    /// High pulse whose width is the bit value
    BitPhase,
    /// A validated reading is waiting to be consumed
    Ready,
}

impl SensorState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Requesting => "request",
            Self::AwaitAck => "response delay",
            Self::AckPhase => "acknowledge",
            Self::AwaitBitStart => "data start",
            Self::AwaitBit => "bit start",
            Self::BitPhase => "bit value",
            Self::Ready => "ready",
        }
    }

    /// True while capture edges are expected
    pub const fn is_capturing(self) -> bool {
        matches!(
            self,
            Self::AwaitAck | Self::AckPhase | Self::AwaitBitStart | Self::AwaitBit | Self::BitPhase
        )
    }

    /// Edge that ends the pulse measured in this state
    pub const fn capture_edge(self) -> Option<Edge> {
        match self {
            Self::AwaitAck | Self::AwaitBitStart | Self::BitPhase => Some(Edge::Falling),
            Self::AckPhase | Self::AwaitBit => Some(Edge::Rising),
            _ => None,
        }
    }

    /// Coarse view of the state for the foreground loop
    pub const fn status(self) -> SensorStatus {
        match self {
            Self::Idle => SensorStatus::Idle,
            Self::Ready => SensorStatus::Ready,
            _ => SensorStatus::Busy,
        }
    }
}

/// What the foreground loop can observe about an acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    /// No acquisition running. Also the outcome of a failed attempt.
    Idle,
    Busy,
    Ready,
}

/// A validated temperature/humidity pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature_deci_celsius: i16,
    pub humidity_deci_percent: u16,
}

impl SensorReading {
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature_deci_celsius as f32 / 10.0
    }

    pub fn humidity_percent(&self) -> f32 {
        self.humidity_deci_percent as f32 / 10.0
    }
}

/// Trait for sensors that are started by the foreground loop and completed by
/// interrupts.
///
/// Nothing here blocks. The caller starts an acquisition, then polls until the
/// sensor reports `Ready` (take the reading) or falls back to `Idle` (the
/// attempt failed and `last_fault` says why).
pub trait Sensor {
    fn start_acquisition(&mut self) -> Result<(), AcquireError>;

    fn poll_state(&self) -> SensorStatus;

    /// Consumes a ready reading, returning the sensor to idle
    fn take_reading(&mut self) -> Option<SensorReading>;

    fn last_fault(&self) -> Option<DecodeFault>;
}
