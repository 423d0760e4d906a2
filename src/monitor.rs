//! Periodic climate acquisition
//!
//! The foreground loop reports elapsed seconds with [`Monitor::tick_second`],
//! which starts an acquisition every `interval` seconds, and calls
//! [`Monitor::service`] on every pass to pick up the result.

use log::{info, warn};
use myco_core::sensor::{Sensor, SensorReading, SensorStatus};

/// Destination for validated readings
pub trait ReadingSink {
    fn publish(&mut self, reading: SensorReading);
}

impl<F: FnMut(SensorReading)> ReadingSink for F {
    fn publish(&mut self, reading: SensorReading) {
        self(reading)
    }
}

pub struct Monitor {
    interval_secs: u16,
    elapsed_secs: u16,
    pending: bool,
    readings: u32,
    failures: u32,
}

impl Monitor {
    /// An interval of zero is treated as one second
    pub const fn new(interval_secs: u16) -> Self {
        Self {
            interval_secs: if interval_secs == 0 { 1 } else { interval_secs },
            elapsed_secs: 0,
            pending: false,
            readings: 0,
            failures: 0,
        }
    }

    /// Counts one second and starts an acquisition when the interval is up.
    /// Returns whether one was started.
    pub fn tick_second<S>(&mut self, sensor: &mut S) -> bool
    where
        S: Sensor,
    {
        self.elapsed_secs += 1;
        if self.elapsed_secs < self.interval_secs {
            return false;
        }
        self.elapsed_secs = 0;
        self.start(sensor)
    }

    /// Starts an acquisition outside the schedule
    pub fn request_now<S>(&mut self, sensor: &mut S) -> bool
    where
        S: Sensor,
    {
        self.start(sensor)
    }

    /// Publishes a finished reading or records a failed attempt
    pub fn service<S, K>(&mut self, sensor: &mut S, sink: &mut K) -> Option<SensorReading>
    where
        S: Sensor,
        K: ReadingSink,
    {
        match sensor.poll_state() {
            SensorStatus::Ready => {
                let reading = sensor.take_reading()?;
                self.pending = false;
                self.readings = self.readings.wrapping_add(1);
                sink.publish(reading);
                Some(reading)
            }
            SensorStatus::Idle if self.pending => {
                self.record_failure(sensor);
                None
            }
            _ => None,
        }
    }

    pub fn readings(&self) -> u32 {
        self.readings
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn start<S>(&mut self, sensor: &mut S) -> bool
    where
        S: Sensor,
    {
        // A failure not yet seen by `service` would be lost to the restart
        if self.pending && sensor.poll_state() == SensorStatus::Idle {
            self.record_failure(sensor);
        }

        match sensor.start_acquisition() {
            Ok(()) => {
                self.pending = true;
                true
            }
            Err(err) => {
                warn!("monitor: acquisition not started: {}", err);
                false
            }
        }
    }

    fn record_failure<S>(&mut self, sensor: &S)
    where
        S: Sensor,
    {
        self.pending = false;
        self.failures = self.failures.wrapping_add(1);
        match sensor.last_fault() {
            Some(fault) => warn!("monitor: acquisition failed: {}", fault),
            None => warn!("monitor: acquisition cancelled"),
        }
        info!("monitor: {} failures so far", self.failures);
    }
}
