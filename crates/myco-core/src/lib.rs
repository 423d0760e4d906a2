//! Hardware-independent core library for myco-rs
//!
//! This crate contains the platform-agnostic part of the climate controller:
//! the shared timer time base, the single-wire temperature/humidity sensor
//! decoder and the RC-5 infrared remote decoder. Register access stays behind
//! the traits in [`hal`].
//!
//! It is `#![no_std]` and never allocates, so it compiles on both embedded
//! targets and desktop hosts (for the simulator and tests). The `mock`
//! feature adds cell-backed stand-in hardware and pulse-train synthesis.

#![no_std]

pub mod config;
pub mod error;
pub mod hal;
pub mod pulse;
pub mod remote;
pub mod sensor;
pub mod timebase;

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(any(test, feature = "mock"))]
pub mod synth;

pub use error::{AcquireError, DecodeFault, ScheduleError};
pub use hal::{Edge, Polarity, Tick};
pub use timebase::{CaptureLock, CaptureOwner, Duration, Timebase};

/// Interrupt entry points of a decoder.
///
/// The interrupt shim calls `handle_edge` from the capture (or external)
/// interrupt with the counter value latched for that edge, and
/// `handle_timeout` from the compare interrupt of the decoder's leased
/// channel. Both run to completion and never block.
pub trait SignalDecoder {
    fn handle_edge(&mut self, tick: Tick);
    fn handle_timeout(&mut self);
}
