//! Synthetic pulse trains for tests and the simulator
//!
//! Durations are the time between consecutive edges, each one the width of
//! the pulse that the edge ends.

use heapless::Vec;

use crate::hal::{Edge, Polarity};
use crate::remote::{HALF_BIT_US, MESSAGE_BITS, RemoteMessage};
use crate::sensor::frame::{FRAME_BITS, checksum};
use crate::timebase::Duration;

/// Edges in one sensor reply: response delay, acknowledge, data start, then
/// a low/high pair per bit
pub const SENSOR_EDGES: usize = 3 + 2 * FRAME_BITS as usize;

/// Upper bound on edges in one remote frame: one per half-bit boundary
pub const REMOTE_EDGES: usize = 2 * MESSAGE_BITS as usize;

/// Nominal sensor widths in microseconds
const RESPONSE_US: u32 = 30;
const ACK_US: u32 = 80;
const BIT_START_US: u32 = 50;
const ZERO_US: u32 = 27;
const ONE_US: u32 = 70;

/// `humidity ‖ temperature ‖ checksum` with a correct checksum
pub fn sensor_frame(humidity: u16, temperature_raw: u16) -> [u8; 5] {
    let [h_hi, h_lo] = humidity.to_be_bytes();
    let [t_hi, t_lo] = temperature_raw.to_be_bytes();
    [h_hi, h_lo, t_hi, t_lo, checksum(humidity, temperature_raw)]
}

/// Sign-magnitude wire encoding of a temperature in tenths of a degree
pub fn temperature_raw(deci_celsius: i16) -> u16 {
    let magnitude = deci_celsius.unsigned_abs() & 0x7FFF;
    if deci_celsius < 0 {
        magnitude | 0x8000
    } else {
        magnitude
    }
}

/// Edge spacing of a sensor reply, measured from the moment the host
/// releases the line
pub fn sensor_edges(frame: &[u8; 5]) -> [Duration; SENSOR_EDGES] {
    let mut edges = [Duration::ZERO; SENSOR_EDGES];
    edges[0] = Duration::from_micros(RESPONSE_US);
    edges[1] = Duration::from_micros(ACK_US);
    edges[2] = Duration::from_micros(ACK_US);

    let bits = frame
        .iter()
        .flat_map(|&byte| (0..8u8).rev().map(move |shift| (byte >> shift) & 1 != 0));
    for (i, bit) in bits.enumerate() {
        edges[3 + 2 * i] = Duration::from_micros(BIT_START_US);
        edges[4 + 2 * i] = Duration::from_micros(if bit { ONE_US } else { ZERO_US });
    }
    edges
}

/// Edges of a biphase frame as seen at the receiver output.
///
/// The first entry has zero spacing and is the mid-bit edge of the start bit.
/// The edge that returns the line to idle after the last bit is not included.
pub fn remote_edges(message: RemoteMessage, polarity: Polarity) -> Vec<(Edge, Duration), REMOTE_EDGES> {
    // Transmitted level for each half-bit, high meaning carrier on
    let mut levels = [false; REMOTE_EDGES];
    for i in 0..MESSAGE_BITS as usize {
        let bit = (message.raw() >> (MESSAGE_BITS as usize - 1 - i)) & 1 != 0;
        levels[2 * i] = !bit;
        levels[2 * i + 1] = bit;
    }

    let mut edges = Vec::new();
    let mut previous: Option<usize> = None;
    for half in 1..REMOTE_EDGES {
        if levels[half] == levels[half - 1] {
            continue;
        }
        let rising = levels[half];
        let edge = match (rising, polarity) {
            (true, Polarity::Normal) | (false, Polarity::Inverted) => Edge::Rising,
            _ => Edge::Falling,
        };
        let spacing = previous.map_or(0, |p| (half - p) as u32 * HALF_BIT_US);
        // At most one edge per half-bit boundary, so capacity is never exceeded
        let _ = edges.push((edge, Duration::from_micros(spacing)));
        previous = Some(half);
    }
    edges
}
