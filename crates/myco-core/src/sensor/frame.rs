//! 40-bit sensor payload: accumulation, splitting and checksum validation

use crate::error::DecodeFault;
use crate::sensor::SensorReading;

/// Number of data bits in one sensor reply
pub const FRAME_BITS: u8 = 40;

const SIGN_BIT: u16 = 0x8000;

/// Bits received so far, most significant first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameAccumulator {
    raw: u64,
    count: u8,
}

impl FrameAccumulator {
    pub const fn new() -> Self {
        Self { raw: 0, count: 0 }
    }

    /// Appends one bit. Bits beyond a full frame are ignored.
    pub fn push(&mut self, bit: bool) {
        if self.is_complete() {
            return;
        }
        self.raw = (self.raw << 1) | bit as u64;
        self.count += 1;
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub const fn count(&self) -> u8 {
        self.count
    }

    pub const fn is_complete(&self) -> bool {
        self.count >= FRAME_BITS
    }

    /// Validates a complete frame and splits it into a reading
    pub fn decode(&self) -> Result<SensorReading, DecodeFault> {
        decode_frame(self.raw)
    }
}

/// Splits `humidity(16) ‖ temperature(16) ‖ checksum(8)` and checks the
/// checksum against the modulo-256 sum of the four data bytes.
pub fn decode_frame(raw: u64) -> Result<SensorReading, DecodeFault> {
    let received = raw as u8;
    let temperature = (raw >> 8) as u16;
    let humidity = (raw >> 24) as u16;

    let computed = checksum(humidity, temperature);
    if computed != received {
        return Err(DecodeFault::ChecksumMismatch { received, computed });
    }

    Ok(SensorReading::from_raw(humidity, temperature))
}

/// Modulo-256 sum of the humidity and temperature bytes
pub const fn checksum(humidity: u16, temperature: u16) -> u8 {
    let [h_hi, h_lo] = humidity.to_be_bytes();
    let [t_hi, t_lo] = temperature.to_be_bytes();
    h_hi.wrapping_add(h_lo)
        .wrapping_add(t_hi)
        .wrapping_add(t_lo)
}

impl SensorReading {
    /// Builds a reading from the raw wire fields.
    ///
    /// Temperature is sign-magnitude: bit 15 is the sign, bits 14..0 the
    /// magnitude in tenths of a degree.
    pub const fn from_raw(humidity: u16, temperature: u16) -> Self {
        let magnitude = (temperature & !SIGN_BIT) as i16;
        let temperature_deci_celsius = if temperature & SIGN_BIT != 0 {
            -magnitude
        } else {
            magnitude
        };
        Self {
            temperature_deci_celsius,
            humidity_deci_percent: humidity,
        }
    }
}
