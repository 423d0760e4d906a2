//! Clock configuration shared by every time measurement
//!
//! The counter runs at `CPU_CLOCK_MHZ / TIMER_PRESCALER` MHz. With the default
//! 8 MHz core clock and a prescaler of 8 one tick is exactly one microsecond,
//! which keeps every protocol window exact after conversion. Changing either
//! constant rescales the tick/µs conversion, and with it every window, since
//! windows are always compared in microseconds.

/// Core clock frequency in MHz
pub const CPU_CLOCK_MHZ: u32 = 8;

/// Divisor between the core clock and the counter increment rate.
/// Must be one of the hardware-supported values (1, 8, 64, 256, 1024).
pub const TIMER_PRESCALER: u32 = 8;

/// Width of the free-running counter in bits
pub const COUNTER_BITS: u32 = 16;

/// Number of distinct counter values before wraparound
pub const COUNTER_MODULUS: u32 = 1 << COUNTER_BITS;

const _: () = assert!(
    matches!(TIMER_PRESCALER, 1 | 8 | 64 | 256 | 1024),
    "TIMER_PRESCALER must be 1, 8, 64, 256 or 1024"
);
const _: () = assert!(COUNTER_BITS == u16::BITS, "Tick is a u16 counter value");
